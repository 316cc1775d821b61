//! # Question Curator
//!
//! 题库整理引擎：章节归类、题集聚类、组合筛选，以及自定义题目列表的持久化
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目、列表、筛选条件、章节分组表
//! - `models/loaders` - JSON 读取与原子写入
//!
//! ### ② 业务能力层（Services）
//! - `ChapterClassifier` - 原始章节标签 → 规范分组
//! - `group_key` / `cluster` - 题集名聚类
//! - `FilterEngine` - 章节 × 题集 × 标签 × 杂志组合筛选
//! - `ListStore` - 自定义列表增删改查
//! - `TagIndex` - 题集分组标签与颜色
//! - `QuestionSetGroups` - 题集显示分组
//!
//! ### ③ 编排层（Orchestration）
//! - `CurationSession` - 一次会话的全部状态，替代全局变量
//! - `App` - 程序入口使用的生命周期封装
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, EntityKind, Result};
pub use models::{ChapterGroupTable, FilterState, Question, QuestionList, OTHERS_GROUP};
pub use orchestrator::{App, CurationSession};
pub use services::{
    cluster, group_key, ChapterClassifier, FilterEngine, ListStore, QuestionSetGroups, TagIndex,
};
pub use utils::normalize;
