//! 整理会话 - 编排层
//!
//! 持有一次会话需要的全部状态：章节归类、列表存储、标签索引、题集分组和题目快照。
//! 所有调用方通过同一个 `CurationSession` 访问这些能力，没有全局状态。
//!
//! 题目快照分两份：导入时的原始记录和派生视图。派生视图 = 原始记录 + 章节分组 + 分组标签，
//! 章节表或标签变化后通过 [`CurationSession::refresh`] 重新计算

use crate::config::Config;
use crate::error::AppResult;
use crate::models::loaders::read_json;
use crate::models::{FilterState, Question, QuestionList};
use crate::services::{
    cluster, ChapterClassifier, FilterEngine, ListStore, MoveOutcome, QuestionSetGroups, TagIndex,
};
use crate::utils::logging::SessionSummary;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct CurationSession {
    config: Config,
    magazine: String,
    classifier: ChapterClassifier,
    lists: ListStore,
    tags: TagIndex,
    set_groups: QuestionSetGroups,
    engine: FilterEngine,
    raw_questions: Vec<Question>,
    questions: Vec<Question>,
}

impl CurationSession {
    /// 按配置打开会话：加载当前杂志的章节分组、全部列表、标签和题集分组
    pub fn open(config: Config) -> AppResult<Self> {
        let magazine = config.current_magazine.clone();
        let classifier = ChapterClassifier::for_magazine(&config, &magazine)?;
        let lists = ListStore::open(&config.list_dir)?;
        let tags = TagIndex::open(&config.tags_file, config.tag_palette.clone())?;
        let set_groups = QuestionSetGroups::open(&config.set_groups_file)?;

        Ok(Self {
            config,
            magazine,
            classifier,
            lists,
            tags,
            set_groups,
            engine: FilterEngine::new(),
            raw_questions: Vec::new(),
            questions: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn magazine(&self) -> &str {
        &self.magazine
    }

    pub fn classifier(&self) -> &ChapterClassifier {
        &self.classifier
    }

    pub fn lists(&self) -> &ListStore {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListStore {
        &mut self.lists
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn set_groups(&self) -> &QuestionSetGroups {
        &self.set_groups
    }

    pub fn set_groups_mut(&mut self) -> &mut QuestionSetGroups {
        &mut self.set_groups
    }

    /// 当前题目视图（已归类、已合并标签）
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// 载入题目快照
    ///
    /// 开启 `auto_assign_chapters` 时，新章节标签先写回分组文件；重复的 `row_number` 只保留第一条
    pub fn load_questions(&mut self, questions: Vec<Question>) -> AppResult<usize> {
        let total = questions.len();
        let mut seen = HashSet::new();
        let questions: Vec<Question> = questions
            .into_iter()
            .filter(|q| seen.insert(q.row_number))
            .collect();
        if questions.len() != total {
            warn!(
                "⚠️ 题目快照中有 {} 条重复的 row_number，已忽略",
                total - questions.len()
            );
        }

        if self.config.auto_assign_chapters {
            self.classifier
                .auto_assign(questions.iter().map(|q| q.question_set.as_str()))?;
        }

        self.raw_questions = questions;
        self.refresh();
        info!("📝 已载入 {} 道题目", self.questions.len());
        Ok(self.questions.len())
    }

    /// 从 JSON 数组文件载入题目快照
    pub fn load_questions_file(&mut self, path: &Path) -> AppResult<usize> {
        let questions: Vec<Question> = read_json(path)?;
        debug!("读取题目快照 {}", path.display());
        self.load_questions(questions)
    }

    /// 切换杂志：重新加载对应的章节分组并重新归类
    pub fn switch_magazine(&mut self, magazine: &str) -> AppResult<()> {
        let mut classifier = ChapterClassifier::for_magazine(&self.config, magazine)?;
        if self.config.auto_assign_chapters {
            classifier.auto_assign(self.raw_questions.iter().map(|q| q.question_set.as_str()))?;
        }

        self.classifier = classifier;
        self.magazine = magazine.to_string();
        self.refresh();
        info!("📰 已切换到杂志: {}", magazine);
        Ok(())
    }

    /// 根据原始记录重新计算章节分组和标签
    pub fn refresh(&mut self) {
        let mut questions = self.raw_questions.clone();
        for q in questions.iter_mut() {
            // 没有章节标签时保留导入时的分组
            if !q.question_set.trim().is_empty() || q.group.trim().is_empty() {
                q.group = self.classifier.classify(&q.question_set);
            }
        }
        self.tags.tag_questions(&mut questions);
        self.questions = questions;
    }

    pub fn filtered(&self, filters: &FilterState) -> Vec<&Question> {
        self.engine.apply(&self.questions, filters)
    }

    /// 把筛选结果中的题集名按分组键聚类
    pub fn grouped_question_sets(&self, filters: &FilterState) -> BTreeMap<String, Vec<String>> {
        cluster(
            self.filtered(filters)
                .into_iter()
                .map(|q| q.question_set_name.as_str())
                .filter(|name| !name.trim().is_empty()),
        )
    }

    /// 把筛选结果追加到列表（不存在则创建），并记录筛选条件；返回新增数量
    pub fn save_filtered_as_list(&mut self, name: &str, filters: &FilterState) -> AppResult<usize> {
        if !self.lists.contains(name) {
            self.lists.create(name)?;
        }
        let matched = self.engine.apply(&self.questions, filters);
        let added = self.lists.add_questions(name, matched)?;
        self.lists
            .set_metadata(name, &filters.selected_magazine, Some(filters.clone()))?;

        info!(
            "✓ 列表 '{}' 新增 {} 道题 ({})",
            name,
            added,
            filters.describe()
        );
        Ok(added)
    }

    /// 从筛选结果中随机抽题生成列表
    pub fn sample_filtered(
        &mut self,
        name: &str,
        count: usize,
        filters: &FilterState,
        overwrite: bool,
    ) -> AppResult<&QuestionList> {
        let mut rng = rand::thread_rng();
        self.sample_filtered_with_rng(&mut rng, name, count, filters, overwrite)
    }

    pub fn sample_filtered_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        name: &str,
        count: usize,
        filters: &FilterState,
        overwrite: bool,
    ) -> AppResult<&QuestionList> {
        let source: Vec<Question> = self
            .engine
            .apply(&self.questions, filters)
            .into_iter()
            .cloned()
            .collect();
        self.lists
            .create_random_sample_with_rng(rng, &source, count, name, filters, overwrite)
    }

    /// 把章节标签移到另一个分组并重新归类题目
    pub fn reassign_chapter(
        &mut self,
        chapter_label: &str,
        from_group: &str,
        to_group: &str,
    ) -> AppResult<MoveOutcome> {
        let outcome = self
            .classifier
            .move_label(chapter_label, from_group, to_group)?;
        if outcome == MoveOutcome::Moved {
            self.refresh();
        }
        Ok(outcome)
    }

    /// 给题集分组打标签，并同步到题目视图
    pub fn tag_question_set_group(&mut self, group_key: &str, tag: &str) -> AppResult<bool> {
        let added = self.tags.add_tag(group_key, tag)?;
        if added {
            self.refresh();
        }
        Ok(added)
    }

    pub fn untag_question_set_group(&mut self, group_key: &str, tag: &str) -> AppResult<bool> {
        let removed = self.tags.remove_tag(group_key, tag)?;
        if removed {
            self.refresh();
        }
        Ok(removed)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            questions: self.questions.len(),
            chapter_groups: self.classifier.table().group_count(),
            lists: self.lists.len(),
            tags: self.tags.all_tags().len(),
            set_groups: self.set_groups.len(),
        }
    }
}
