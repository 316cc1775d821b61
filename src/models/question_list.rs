use crate::models::filter_state::FilterState;
use crate::models::question::Question;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 列表元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListMetadata {
    /// 创建列表时的杂志（仅供展示）
    pub magazine: String,
    /// 创建或最近一次按筛选追加时的筛选条件
    pub filters: Option<FilterState>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub archived: bool,
    /// 附在列表上的理论笔记（LaTeX 文本）
    #[serde(rename = "theory_latex", skip_serializing_if = "String::is_empty")]
    pub theory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// 用户整理的题目列表
///
/// 题目保持插入顺序，按 `row_number` 去重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionList {
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub metadata: ListMetadata,
}

impl QuestionList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            questions: Vec::new(),
            metadata: ListMetadata::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn contains(&self, row_number: i64) -> bool {
        self.questions.iter().any(|q| q.row_number == row_number)
    }

    pub fn row_numbers(&self) -> Vec<i64> {
        self.questions.iter().map(|q| q.row_number).collect()
    }

    /// 按给定顺序追加题目，跳过已存在的 `row_number`，返回实际追加数量
    pub fn append_unique<'a, I>(&mut self, questions: I) -> usize
    where
        I: IntoIterator<Item = &'a Question>,
    {
        let mut seen: HashSet<i64> = self.questions.iter().map(|q| q.row_number).collect();
        let mut added = 0;
        for question in questions {
            if seen.insert(question.row_number) {
                self.questions.push(question.clone());
                added += 1;
            }
        }
        added
    }

    /// 删除所有匹配的题目，返回删除数量
    pub fn remove_rows(&mut self, row_numbers: &HashSet<i64>) -> usize {
        let before = self.questions.len();
        self.questions
            .retain(|q| !row_numbers.contains(&q.row_number));
        before - self.questions.len()
    }

    /// 去掉重复的 `row_number`（保留第一次出现），返回去掉的数量
    pub fn dedupe(&mut self) -> usize {
        let mut seen = HashSet::new();
        let before = self.questions.len();
        self.questions.retain(|q| seen.insert(q.row_number));
        before - self.questions.len()
    }
}
