//! 组合筛选
//!
//! 章节 × 题集搜索词 × 标签 × 杂志，各条件取交集，结果保持原顺序

use crate::models::{FilterState, Question};
use crate::utils::text::normalize;
use std::collections::{BTreeMap, BTreeSet};

/// 预先规范化后的筛选条件
#[derive(Debug, Clone)]
pub struct CompiledFilter<'f> {
    chapter: Option<&'f str>,
    search: Option<String>,
    tags: &'f BTreeSet<String>,
    magazine: Option<String>,
}

impl<'f> CompiledFilter<'f> {
    pub fn new(filters: &'f FilterState) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            chapter: filters
                .selected_chapter
                .as_deref()
                .filter(|c| !c.trim().is_empty()),
            search: non_empty(normalize(&filters.question_set_search)),
            tags: &filters.selected_tags,
            magazine: non_empty(normalize(&filters.selected_magazine)),
        }
    }

    pub fn needs_chapter(&self) -> bool {
        self.chapter.is_some()
    }

    /// 判断题目是否满足全部条件；`chapter` 是该题的规范章节分组
    pub fn matches(&self, question: &Question, chapter: Option<&str>) -> bool {
        if let Some(selected) = self.chapter {
            if chapter != Some(selected) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !normalize(&question.question_set_name).contains(search.as_str()) {
                return false;
            }
        }
        if !self.tags.iter().all(|tag| question.has_tag(tag)) {
            return false;
        }
        if let Some(magazine) = &self.magazine {
            if !normalize(&question.magazine).contains(magazine.as_str()) {
                return false;
            }
        }
        true
    }
}

/// 筛选引擎
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// 以题目自身的 `group` 作为章节进行筛选
    pub fn apply<'q>(&self, questions: &'q [Question], filters: &FilterState) -> Vec<&'q Question> {
        self.apply_with(questions, filters, |q| q.group.clone())
    }

    /// 使用外部提供的章节查找函数筛选，仅在设置了章节条件时调用它
    pub fn apply_with<'q, F>(
        &self,
        questions: &'q [Question],
        filters: &FilterState,
        chapter_lookup: F,
    ) -> Vec<&'q Question>
    where
        F: Fn(&Question) -> String,
    {
        let compiled = CompiledFilter::new(filters);
        questions
            .iter()
            .filter(|q| {
                let q: &Question = q;
                if compiled.needs_chapter() {
                    let chapter = chapter_lookup(q);
                    compiled.matches(q, Some(chapter.as_str()))
                } else {
                    compiled.matches(q, None)
                }
            })
            .collect()
    }

    /// 所有出现过的杂志名（去重、排序），用于填充筛选选项
    pub fn distinct_magazines(&self, questions: &[Question]) -> Vec<String> {
        distinct(questions.iter().map(|q| q.magazine.as_str()))
    }

    pub fn distinct_question_sets(&self, questions: &[Question]) -> Vec<String> {
        distinct(questions.iter().map(|q| q.question_set_name.as_str()))
    }

    /// 各章节分组的题目数量
    pub fn count_by_group(&self, questions: &[Question]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for q in questions {
            *counts.entry(q.group.clone()).or_insert(0) += 1;
        }
        counts
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
