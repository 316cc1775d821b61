//! 章节归类服务 - 业务能力层
//!
//! 把原始章节标签归入规范分组：精确匹配 → 子串包含 → 前缀匹配 → "Others"

use crate::config::Config;
use crate::error::{AppError, AppResult, EntityKind};
use crate::models::chapter_grouping::{ChapterGroupTable, ChapterGroupingFile, OTHERS_GROUP};
use crate::models::loaders::{read_json_if_exists, write_json_atomically};
use crate::utils::text::normalize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 命中的匹配规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    Substring,
    Prefix,
    Fallback,
}

/// 归类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub group: String,
    pub rule: MatchRule,
    /// 规范化后的标签
    pub label: String,
}

/// 移动章节标签的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// 源分组与目标分组相同
    Unchanged,
}

/// 章节归类服务
///
/// 持有分组表和反向索引（规范化标签 → 分组名），分组表每次变更后重建索引并写回来源文件
pub struct ChapterClassifier {
    table: ChapterGroupTable,
    lookup: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl ChapterClassifier {
    /// 使用内存中的分组表，不持久化
    pub fn new(table: ChapterGroupTable) -> Self {
        let mut classifier = Self {
            table,
            lookup: HashMap::new(),
            source: None,
        };
        classifier.rebuild_lookup();
        classifier
    }

    /// 从分组文件加载；文件不存在时得到只有 "Others" 的空表
    pub fn load(path: &Path) -> AppResult<Self> {
        let file: ChapterGroupingFile = read_json_if_exists(path)?.unwrap_or_default();
        let mut classifier = Self::new(ChapterGroupTable::from_file(file));
        classifier.source = Some(path.to_path_buf());

        info!(
            "📚 已加载章节分组: {} ({} 个分组)",
            path.display(),
            classifier.table.group_count()
        );
        Ok(classifier)
    }

    /// 按杂志解析分组文件并加载
    pub fn for_magazine(config: &Config, magazine: &str) -> AppResult<Self> {
        Self::load(&config.grouping_file_for(magazine))
    }

    pub fn table(&self) -> &ChapterGroupTable {
        &self.table
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 归类原始章节标签，返回规范分组名
    pub fn classify(&self, raw_label: &str) -> String {
        self.classify_detailed(raw_label).group
    }

    pub fn classify_detailed(&self, raw_label: &str) -> Classification {
        let label = normalize(raw_label);
        let (group, rule) = self.resolve(&label);
        Classification {
            group: group.to_string(),
            rule,
            label,
        }
    }

    fn resolve(&self, label: &str) -> (&str, MatchRule) {
        if label.is_empty() {
            return (OTHERS_GROUP, MatchRule::Fallback);
        }

        // "Others" 中的精确命中不作数，继续尝试其他分组
        if let Some(group) = self.lookup.get(label) {
            if group != OTHERS_GROUP {
                return (group.as_str(), MatchRule::Exact);
            }
        }

        let ordered = self.table.ordered_groups();
        let candidates = || {
            ordered
                .iter()
                .copied()
                .filter(|g| *g != OTHERS_GROUP)
                .flat_map(|g| {
                    self.table
                        .labels(g)
                        .unwrap_or_default()
                        .iter()
                        .map(move |member| (g, member.as_str()))
                })
                .filter(|(_, member)| !member.is_empty())
        };

        if let Some((group, _)) = candidates().find(|(_, member)| label.contains(member)) {
            return (group, MatchRule::Substring);
        }

        if let Some((group, _)) =
            candidates().find(|(_, member)| member.starts_with(label) || label.starts_with(member))
        {
            return (group, MatchRule::Prefix);
        }

        (OTHERS_GROUP, MatchRule::Fallback)
    }

    /// 把未精确收录的章节标签写回到其归类结果所在分组，使后续查找命中精确匹配
    ///
    /// 幂等；返回新增的标签数量，有变化时写回来源文件
    pub fn auto_assign<I, S>(&mut self, raw_labels: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.table.clone();
        let mut added = 0;
        for raw in raw_labels {
            let classification = self.classify_detailed(raw.as_ref());
            if classification.label.is_empty() || self.lookup.contains_key(&classification.label) {
                continue;
            }

            debug!(
                "自动归类章节 '{}' → {} ({:?})",
                classification.label, classification.group, classification.rule
            );
            if next.insert_label(&classification.group, classification.label) {
                added += 1;
            }
        }

        if added > 0 {
            self.commit(next)?;
            info!("✓ 自动归类了 {} 个新章节标签", added);
        }
        Ok(added)
    }

    /// 把章节标签从一个分组移到另一个分组
    pub fn move_label(
        &mut self,
        chapter_label: &str,
        from_group: &str,
        to_group: &str,
    ) -> AppResult<MoveOutcome> {
        if from_group == to_group {
            debug!("章节 '{}' 已在分组 {} 中，无需移动", chapter_label, to_group);
            return Ok(MoveOutcome::Unchanged);
        }
        if !self.table.contains_group(from_group) {
            return Err(AppError::not_found(EntityKind::ChapterGroup, from_group));
        }
        if !self.table.contains_group(to_group) {
            return Err(AppError::not_found(EntityKind::ChapterGroup, to_group));
        }

        let label = normalize(chapter_label);
        let mut next = self.table.clone();
        if !next.remove_label(from_group, &label) {
            return Err(AppError::not_found(EntityKind::ChapterLabel, chapter_label));
        }
        next.insert_label(to_group, label.clone());
        self.commit(next)?;

        info!("🔀 章节 '{}' 已从 {} 移到 {}", label, from_group, to_group);
        Ok(MoveOutcome::Moved)
    }

    /// 分组及其成员，按分组顺序
    pub fn groups(&self) -> Vec<(&str, &[String])> {
        self.table
            .ordered_groups()
            .into_iter()
            .map(|g| (g, self.table.labels(g).unwrap_or_default()))
            .collect()
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .groups()
            .into_iter()
            .flat_map(|(group, labels)| {
                labels
                    .iter()
                    .map(move |label| (label.clone(), group.to_string()))
            })
            .collect();
    }

    /// 先写回来源文件，成功后才替换内存中的分组表
    fn commit(&mut self, next: ChapterGroupTable) -> AppResult<()> {
        if let Some(path) = &self.source {
            write_json_atomically(path, &next.to_file())?;
        }
        self.table = next;
        self.rebuild_lookup();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(groups: &[(&str, &[&str])]) -> ChapterGroupTable {
        ChapterGroupTable::new(groups.iter().map(|(g, ls)| {
            (
                g.to_string(),
                ls.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
        }))
    }

    fn physics() -> ChapterClassifier {
        ChapterClassifier::new(table(&[
            ("Mechanics", &["laws of motion", "work energy power"]),
            ("Electrostatics", &["electric charges", "coulomb's law"]),
            ("Optics", &["ray optics"]),
        ]))
    }

    #[test]
    fn test_exact_match() {
        let c = physics();
        let r = c.classify_detailed("  Ray   Optics ");
        assert_eq!(r.group, "Optics");
        assert_eq!(r.rule, MatchRule::Exact);
    }

    #[test]
    fn test_substring_match() {
        let c = ChapterClassifier::new(table(&[("Mechanics", &["laws of motion"])]));
        let r = c.classify_detailed("Laws Of Motion - Newton");
        assert_eq!(r.group, "Mechanics");
        assert_eq!(r.rule, MatchRule::Substring);
    }

    #[test]
    fn test_prefix_match() {
        let c = physics();
        let r = c.classify_detailed("Electric");
        assert_eq!(r.group, "Electrostatics");
        assert_eq!(r.rule, MatchRule::Prefix);
    }

    #[test]
    fn test_fallback_to_others() {
        let c = physics();
        let r = c.classify_detailed("Thermodynamics");
        assert_eq!(r.group, OTHERS_GROUP);
        assert_eq!(r.rule, MatchRule::Fallback);
        assert_eq!(c.classify(""), OTHERS_GROUP);
    }

    #[test]
    fn test_substring_tie_break_uses_canonical_order() {
        let c = ChapterClassifier::new(table(&[
            ("Optics", &["waves"]),
            ("Mechanics", &["motion"]),
        ]));
        assert_eq!(c.classify("motion of waves"), "Optics");
    }

    #[test]
    fn test_exact_hit_in_others_is_not_authoritative() {
        let mut t = table(&[("Mechanics", &["laws of motion"])]);
        t.insert_label(OTHERS_GROUP, "laws of motion revision".to_string());
        let c = ChapterClassifier::new(t);
        assert_eq!(c.classify("Laws of Motion Revision"), "Mechanics");
    }

    #[test]
    fn test_auto_assign_is_idempotent() {
        let mut c = physics();
        let added = c
            .auto_assign(["Laws of Motion - Newton", "Thermodynamics", "ray optics"])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(
            c.classify_detailed("laws of motion - newton").rule,
            MatchRule::Exact
        );
        assert!(c
            .table()
            .labels(OTHERS_GROUP)
            .unwrap()
            .contains(&"thermodynamics".to_string()));

        let again = c.auto_assign(["Laws of Motion - Newton", "Thermodynamics"]).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn test_move_label() {
        let mut c = physics();
        let outcome = c.move_label("Ray Optics", "Optics", "Mechanics").unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(c.classify("ray optics"), "Mechanics");
        assert!(c.table().labels("Optics").unwrap().is_empty());
    }

    #[test]
    fn test_move_label_same_group_is_noop() {
        let mut c = physics();
        let outcome = c.move_label("ray optics", "Optics", "Optics").unwrap();
        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert_eq!(c.classify("ray optics"), "Optics");
    }

    #[test]
    fn test_move_label_missing_label_fails() {
        let mut c = physics();
        let err = c.move_label("ray optics", "Mechanics", "Optics").unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFound {
                kind: EntityKind::ChapterLabel,
                ..
            }
        ));
        let err = c.move_label("ray optics", "Nope", "Optics").unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFound {
                kind: EntityKind::ChapterGroup,
                ..
            }
        ));
    }

    #[test]
    fn test_load_and_persist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PhysicsChapterGrouping.json");
        std::fs::write(
            &path,
            r#"{"canonical_order": ["Mechanics", "Others"],
                "groups": {"Mechanics": ["Laws of Motion"], "Others": ["stale"]}}"#,
        )
        .unwrap();

        let mut c = ChapterClassifier::load(&path).unwrap();
        assert_eq!(c.classify("LAWS OF MOTION"), "Mechanics");
        c.auto_assign(["Friction"]).unwrap();

        let reloaded = ChapterClassifier::load(&path).unwrap();
        assert!(reloaded.table().labels(OTHERS_GROUP).unwrap().is_empty());
        assert_eq!(
            reloaded.table().labels("Mechanics").unwrap(),
            ["laws of motion"]
        );
    }

    #[test]
    fn test_load_missing_file_gives_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let c = ChapterClassifier::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(c.table().ordered_groups(), vec![OTHERS_GROUP]);
        assert_eq!(c.classify("anything"), OTHERS_GROUP);
    }

    /// 来源文件的父目录是普通文件，写回必然失败
    fn unwritable_classifier(dir: &Path) -> ChapterClassifier {
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut c = ChapterClassifier::load(&blocker.join("PhysicsChapterGrouping.json")).unwrap();
        c.table = table(&[("Optics", &["ray optics"]), ("Mechanics", &[])]);
        c.rebuild_lookup();
        c
    }

    #[test]
    fn test_auto_assign_write_failure_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = unwritable_classifier(dir.path());
        let before = c.table().clone();

        assert!(c.auto_assign(["Thermodynamics"]).is_err());
        assert_eq!(c.table(), &before);
        assert_eq!(
            c.classify_detailed("thermodynamics").rule,
            MatchRule::Fallback
        );

        // 标签没有被记成已收录，重试仍会尝试写回
        assert!(c.auto_assign(["Thermodynamics"]).is_err());
    }

    #[test]
    fn test_move_label_write_failure_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = unwritable_classifier(dir.path());
        let before = c.table().clone();

        assert!(c.move_label("ray optics", "Optics", "Mechanics").is_err());
        assert_eq!(c.table(), &before);
        assert_eq!(c.classify("ray optics"), "Optics");
    }
}
