use crate::utils::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// 兜底分组名
pub const OTHERS_GROUP: &str = "Others";

/// 章节分组文件的磁盘格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterGroupingFile {
    pub canonical_order: Vec<String>,
    pub groups: BTreeMap<String, Vec<String>>,
}

/// 规范章节分组表
///
/// - `canonical_order` 中名称唯一，"Others" 永远在最后
/// - 每个规范化后的章节标签最多属于一个分组
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterGroupTable {
    canonical_order: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
}

impl Default for ChapterGroupTable {
    fn default() -> Self {
        Self::from_file(ChapterGroupingFile::default())
    }
}

impl ChapterGroupTable {
    /// 由分组名和成员标签构建，顺序即规范顺序
    pub fn new<G, L>(groups: G) -> Self
    where
        G: IntoIterator<Item = (String, L)>,
        L: IntoIterator<Item = String>,
    {
        let mut file = ChapterGroupingFile::default();
        for (name, labels) in groups {
            file.canonical_order.push(name.clone());
            file.groups
                .entry(name)
                .or_default()
                .extend(labels);
        }
        Self::from_file(file)
    }

    /// 从磁盘格式构建并修正不变量
    pub fn from_file(file: ChapterGroupingFile) -> Self {
        let mut canonical_order = Vec::new();
        let mut seen_names = HashSet::new();
        for name in file.canonical_order {
            if name != OTHERS_GROUP && seen_names.insert(name.clone()) {
                canonical_order.push(name);
            }
        }
        canonical_order.push(OTHERS_GROUP.to_string());

        let mut groups: BTreeMap<String, Vec<String>> = file
            .groups
            .into_iter()
            .map(|(name, labels)| (name, labels.iter().map(|l| normalize(l)).collect()))
            .collect();
        for name in &canonical_order {
            groups.entry(name.clone()).or_default();
        }

        let mut table = Self {
            canonical_order,
            groups,
        };
        table.dedupe_labels();
        table
    }

    /// 转换为磁盘格式，"Others" 的成员不持久化
    pub fn to_file(&self) -> ChapterGroupingFile {
        let groups = self
            .groups
            .iter()
            .map(|(name, labels)| {
                if name == OTHERS_GROUP {
                    (name.clone(), Vec::new())
                } else {
                    (name.clone(), labels.clone())
                }
            })
            .collect();

        ChapterGroupingFile {
            canonical_order: self.canonical_order.clone(),
            groups,
        }
    }

    pub fn canonical_order(&self) -> &[String] {
        &self.canonical_order
    }

    /// 分组顺序：规范分组 → "Others" → 其余分组（按名称排序）
    pub fn ordered_groups(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = self
            .canonical_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.groups.contains_key(*name))
            .collect();
        for name in self.groups.keys() {
            if !self.canonical_order.contains(name) {
                ordered.push(name);
            }
        }
        ordered
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn labels(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// 向分组加入已规范化的标签；已存在时返回 false
    pub(crate) fn insert_label(&mut self, group: &str, label: String) -> bool {
        let labels = self.groups.entry(group.to_string()).or_default();
        if labels.contains(&label) {
            return false;
        }
        labels.push(label);
        true
    }

    /// 从分组移除标签；不存在时返回 false
    pub(crate) fn remove_label(&mut self, group: &str, label: &str) -> bool {
        match self.groups.get_mut(group) {
            Some(labels) => {
                let before = labels.len();
                labels.retain(|l| l != label);
                labels.len() != before
            }
            None => false,
        }
    }

    /// 组内去重；同一标签出现在多个分组时按分组顺序保留第一个
    fn dedupe_labels(&mut self) {
        let order: Vec<String> = self.ordered_groups().iter().map(|s| s.to_string()).collect();
        let mut owner: BTreeMap<String, String> = BTreeMap::new();

        for group in order {
            let Some(labels) = self.groups.get_mut(&group) else {
                continue;
            };
            let mut kept = Vec::with_capacity(labels.len());
            for label in labels.drain(..) {
                if label.is_empty() {
                    continue;
                }
                match owner.get(&label) {
                    Some(existing) if *existing == group => {}
                    Some(existing) => {
                        warn!(
                            "⚠️ 章节标签 '{}' 同时出现在 '{}' 和 '{}'，保留前者",
                            label, existing, group
                        );
                    }
                    None => {
                        owner.insert(label.clone(), group.clone());
                        kept.push(label);
                    }
                }
            }
            *labels = kept;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(order: &[&str], groups: &[(&str, &[&str])]) -> ChapterGroupingFile {
        ChapterGroupingFile {
            canonical_order: order.iter().map(|s| s.to_string()).collect(),
            groups: groups
                .iter()
                .map(|(g, ls)| (g.to_string(), ls.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }

    #[test]
    fn test_others_is_forced_last() {
        let table = ChapterGroupTable::from_file(file(
            &["Others", "Mechanics", "Optics", "Mechanics"],
            &[("Mechanics", &["Laws of Motion"])],
        ));
        assert_eq!(table.canonical_order(), ["Mechanics", "Optics", "Others"]);
        assert_eq!(table.labels("Mechanics").unwrap(), ["laws of motion"]);
        assert_eq!(table.labels("Optics").unwrap().len(), 0);
    }

    #[test]
    fn test_ordered_groups_appends_extra_groups_sorted() {
        let table = ChapterGroupTable::from_file(file(
            &["Optics", "Mechanics"],
            &[("Zeta", &[]), ("Alpha", &["x"])],
        ));
        assert_eq!(
            table.ordered_groups(),
            vec!["Optics", "Mechanics", "Others", "Alpha", "Zeta"]
        );
    }

    #[test]
    fn test_label_in_two_groups_keeps_first_in_order() {
        let table = ChapterGroupTable::from_file(file(
            &["Optics", "Mechanics"],
            &[
                ("Mechanics", &["Work Energy", "work  energy"]),
                ("Optics", &["WORK ENERGY", "Lenses"]),
            ],
        ));
        assert_eq!(table.labels("Optics").unwrap(), ["work energy", "lenses"]);
        assert!(table.labels("Mechanics").unwrap().is_empty());
    }

    #[test]
    fn test_others_members_not_persisted() {
        let mut table = ChapterGroupTable::default();
        assert!(table.insert_label(OTHERS_GROUP, "misc".to_string()));
        assert!(!table.insert_label(OTHERS_GROUP, "misc".to_string()));
        let out = table.to_file();
        assert!(out.groups[OTHERS_GROUP].is_empty());
        assert_eq!(out.canonical_order, vec![OTHERS_GROUP]);
    }
}
