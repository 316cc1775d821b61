/// 日志工具模块
///
/// 初始化 tracing 订阅者，并提供会话日志的格式化输出
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志输出
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info 级别。
/// 重复调用是安全的（测试中会多次初始化）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n题目整理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `magazine`: 当前杂志
/// - `list_dir`: 列表目录
pub fn log_startup(magazine: &str, list_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目整理模式");
    info!("📰 当前杂志: {}", magazine);
    info!("📁 列表目录: {}", list_dir);
    info!("{}", "=".repeat(60));
}

/// 会话汇总信息
#[derive(Debug, Default, Clone)]
pub struct SessionSummary {
    pub questions: usize,
    pub chapter_groups: usize,
    pub lists: usize,
    pub tags: usize,
    pub set_groups: usize,
}

/// 打印会话汇总
///
/// # 参数
/// - `summary`: 汇总数据
/// - `log_file_path`: 日志文件路径
pub fn print_summary(summary: &SessionSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话加载完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📝 题目: {}", summary.questions);
    info!("📚 章节分组: {}", summary.chapter_groups);
    info!("🗂️ 自定义列表: {}", summary.lists);
    info!("🏷️ 标签: {}", summary.tags);
    info!("📦 题集分组: {}", summary.set_groups);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}
