use serde::{Deserialize, Serialize};

/// 一道题目
///
/// `row_number` 是唯一身份键，所有去重都只看它
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub row_number: i64,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub qno: String,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub page: String,
    /// 原始章节标签
    #[serde(default)]
    pub question_set: String,
    /// 题集（试卷）显示名
    #[serde(default)]
    pub question_set_name: String,
    #[serde(default)]
    pub magazine: String,
    /// 规范章节分组
    #[serde(default)]
    pub group: String,
    #[serde(default, alias = "text")]
    pub question_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Question {
    pub fn new(row_number: i64) -> Self {
        Self {
            row_number,
            qno: String::new(),
            page: String::new(),
            question_set: String::new(),
            question_set_name: String::new(),
            magazine: String::new(),
            group: String::new(),
            question_text: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// 添加标签（已存在时不变，保持原有顺序）
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}

// 题号、页码在工作簿中可能是数字也可能是字符串
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.fract() == 0.0 {
                Ok(format!("{}", value as i64))
            } else {
                Ok(value.to_string())
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_numeric_page_and_legacy_text_key() {
        let json = r#"{
            "row_number": 12,
            "qno": 7,
            "page": 45,
            "question_set": "Laws of Motion",
            "question_set_name": "JEE Main 2023 Paper 1",
            "magazine": "Physics For You | March 2024",
            "text": "A block slides down an incline..."
        }"#;

        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.row_number, 12);
        assert_eq!(q.qno, "7");
        assert_eq!(q.page, "45");
        assert_eq!(q.question_text, "A block slides down an incline...");
        assert!(q.tags.is_empty());
        assert_eq!(q.group, "");
    }

    #[test]
    fn test_null_page_becomes_empty() {
        let q: Question = serde_json::from_str(r#"{"row_number": 1, "page": null}"#).unwrap();
        assert_eq!(q.page, "");
    }

    #[test]
    fn test_tag_helpers_are_idempotent() {
        let mut q = Question::new(1);
        assert!(q.add_tag("important"));
        assert!(!q.add_tag("important"));
        assert!(q.add_tag("hard"));
        assert_eq!(q.tags, vec!["important", "hard"]);
        assert!(q.remove_tag("important"));
        assert!(!q.remove_tag("important"));
        assert_eq!(q.tags, vec!["hard"]);
    }
}
