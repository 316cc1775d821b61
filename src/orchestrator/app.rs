//! 应用入口 - 编排层
//!
//! 负责日志文件、启动信息、打开会话和载入题目快照，最后输出会话汇总

use crate::config::Config;
use crate::models::FilterState;
use crate::orchestrator::session::CurationSession;
use crate::utils::logging::{init_log_file, log_startup, print_summary};
use crate::utils::text::truncate_text;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    session: CurationSession,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件 {}", config.output_log_file))?;

        log_startup(&config.current_magazine, &config.list_dir);

        let session = CurationSession::open(config.clone()).context("打开整理会话失败")?;

        Ok(Self { config, session })
    }

    pub fn session(&self) -> &CurationSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CurationSession {
        &mut self.session
    }

    /// 运行应用主逻辑
    pub fn run(&mut self) -> Result<()> {
        self.load_snapshot()?;
        self.log_overview();
        print_summary(&self.session.summary(), &self.config.output_log_file);
        Ok(())
    }

    /// 载入题目快照，文件不存在时只提示
    fn load_snapshot(&mut self) -> Result<()> {
        let path = Path::new(&self.config.questions_file);
        if !path.exists() {
            warn!("⚠️ 没有找到题目快照 {}，以空题库启动", path.display());
            return Ok(());
        }

        self.session
            .load_questions_file(path)
            .with_context(|| format!("载入题目快照失败: {}", path.display()))?;
        Ok(())
    }

    fn log_overview(&self) {
        let all = FilterState::default();

        for (group, count) in self
            .session
            .classifier()
            .table()
            .ordered_groups()
            .into_iter()
            .map(|g| {
                let count = self
                    .session
                    .filtered(&FilterState::new().with_chapter(g))
                    .len();
                (g, count)
            })
            .filter(|(_, count)| *count > 0)
        {
            info!("  📚 {}: {} 道题", group, count);
        }

        for (key, sets) in self.session.grouped_question_sets(&all) {
            debug!("  📦 {} ({} 个题集)", key, sets.len());
        }

        for list in self.session.lists().lists().values() {
            let preview = list
                .questions
                .first()
                .map(|q| truncate_text(&q.question_text, 30))
                .unwrap_or_default();
            info!(
                "  🗂️ {}{}: {} 道题 {}",
                list.name,
                if list.metadata.archived { " (已归档)" } else { "" },
                list.len(),
                preview
            );
        }
    }
}
