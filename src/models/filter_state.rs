use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 当前生效的筛选条件快照
///
/// 空字段表示该维度不做限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// 规范章节分组名
    pub selected_chapter: Option<String>,
    /// 题集名搜索词
    pub question_set_search: String,
    /// 题目必须同时带有的标签
    pub selected_tags: BTreeSet<String>,
    /// 杂志搜索词
    pub selected_magazine: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.selected_chapter = Some(chapter.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.question_set_search = search.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_magazine(mut self, magazine: impl Into<String>) -> Self {
        self.selected_magazine = magazine.into();
        self
    }

    /// 所有维度都无限制
    pub fn is_empty(&self) -> bool {
        self.selected_chapter.as_deref().map_or(true, |c| c.trim().is_empty())
            && self.question_set_search.trim().is_empty()
            && self.selected_tags.is_empty()
            && self.selected_magazine.trim().is_empty()
    }

    /// 简短描述，用于日志
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "无筛选".to_string();
        }

        let mut parts = Vec::new();
        if let Some(chapter) = self.selected_chapter.as_deref().filter(|c| !c.trim().is_empty()) {
            parts.push(format!("章节={}", chapter));
        }
        if !self.question_set_search.trim().is_empty() {
            parts.push(format!("题集~{}", self.question_set_search.trim()));
        }
        if !self.selected_tags.is_empty() {
            let tags: Vec<&str> = self.selected_tags.iter().map(String::as_str).collect();
            parts.push(format!("标签=[{}]", tags.join(", ")));
        }
        if !self.selected_magazine.trim().is_empty() {
            parts.push(format!("杂志~{}", self.selected_magazine.trim()));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(FilterState::default().is_empty());
        assert!(FilterState::new().with_search("   ").is_empty());
        assert!(!FilterState::new().with_tags(["hard"]).is_empty());
    }

    #[test]
    fn test_missing_fields_default_on_load() {
        let state: FilterState =
            serde_json::from_str(r#"{"selected_chapter": null, "selected_tags": ["a", "b", "a"]}"#)
                .unwrap();
        assert_eq!(state.selected_chapter, None);
        assert_eq!(state.selected_tags.len(), 2);
        assert_eq!(state.selected_magazine, "");
    }

    #[test]
    fn test_describe() {
        let state = FilterState::new()
            .with_chapter("Mechanics")
            .with_tags(["hard", "important"]);
        assert_eq!(state.describe(), "章节=Mechanics | 标签=[hard, important]");
        assert_eq!(FilterState::new().describe(), "无筛选");
    }
}
