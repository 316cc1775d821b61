use anyhow::{Context, Result};
use question_curator::utils::logging;
use question_curator::{App, Config};

fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config)?.run()?;

    Ok(())
}
