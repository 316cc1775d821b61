//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `session` - 整理会话
//! - 持有章节归类、列表存储、标签索引、题集分组和题目快照
//! - 组合各能力：筛选后保存为列表、随机抽题、重新归类章节
//!
//! ### `app` - 应用入口
//! - 初始化日志文件、打开会话、载入题目快照
//! - 输出会话汇总
//!
//! ## 层次关系
//!
//! ```text
//! app (生命周期)
//!     ↓
//! session (会话状态 + 组合操作)
//!     ↓
//! services (能力层：classify / group_key / filter / lists / tags)
//!     ↓
//! models (数据 + 原子读写)
//! ```

pub mod app;
pub mod session;

pub use app::App;
pub use session::CurationSession;
