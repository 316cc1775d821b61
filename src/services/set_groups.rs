//! 题集显示分组
//!
//! 用户自定义的题集分组（例如 "JEE Main Practice"），"Others" 由未分组的题集动态计算，
//! 不能被创建、重命名或删除

use crate::error::{AppError, AppResult, EntityKind};
use crate::models::loaders::{read_json_if_exists, write_json_atomically};
use crate::models::OTHERS_GROUP;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 首次使用时创建的分组
pub const DEFAULT_SET_GROUPS: [&str; 3] = [
    "JEE Main Practice",
    "JEE Advanced Practice",
    "Monthly Test Drives",
];

/// 分组颜色，按创建顺序循环使用
pub const GROUP_COLORS: [&str; 8] = [
    "#3b82f6", "#8b5cf6", "#ec4899", "#f59e0b", "#10b981", "#06b6d4", "#6366f1", "#ef4444",
];

pub const OTHERS_COLOR: &str = "#94a3b8";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetGroup {
    pub display_name: String,
    #[serde(default)]
    pub question_sets: Vec<String>,
    #[serde(default)]
    pub color: String,
}

impl SetGroup {
    fn new(name: &str, color: &str) -> Self {
        Self {
            display_name: name.to_string(),
            question_sets: Vec::new(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SetGroupsFile {
    #[serde(default)]
    groups: BTreeMap<String, SetGroup>,
}

pub struct QuestionSetGroups {
    groups: BTreeMap<String, SetGroup>,
    /// 题集名 → 所属分组名
    reverse: HashMap<String, String>,
    path: Option<PathBuf>,
}

impl Default for QuestionSetGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSetGroups {
    /// 只含默认分组的内存实例
    pub fn new() -> Self {
        let mut groups = Self {
            groups: default_groups(),
            reverse: HashMap::new(),
            path: None,
        };
        groups.rebuild_reverse();
        groups
    }

    /// 从文件加载；文件不存在时写入默认分组
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let mut groups = Self::new();
        match read_json_if_exists::<SetGroupsFile>(&path)? {
            Some(file) => {
                groups.groups = file.groups;
                groups.groups.remove(OTHERS_GROUP);
                groups.rebuild_reverse();
            }
            None => {
                write_json_atomically(&path, &groups.to_file())?;
                info!("📦 已创建默认题集分组文件 {}", path.display());
            }
        }
        info!("📦 已加载 {} 个题集分组", groups.groups.len());
        groups.path = Some(path);
        Ok(groups)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn groups(&self) -> &BTreeMap<String, SetGroup> {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&SetGroup> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn question_sets_in(&self, name: &str) -> &[String] {
        self.groups
            .get(name)
            .map(|g| g.question_sets.as_slice())
            .unwrap_or(&[])
    }

    /// 题集所在分组的显示名
    pub fn group_for_question_set(&self, question_set: &str) -> Option<&str> {
        self.reverse.get(question_set).map(String::as_str)
    }

    /// 动态计算 "Others"：不属于任何分组的题集，保持输入顺序
    pub fn others<'a, I>(&self, all_question_sets: I) -> SetGroup
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut others = SetGroup::new(OTHERS_GROUP, OTHERS_COLOR);
        others.question_sets = all_question_sets
            .into_iter()
            .filter(|qs| !self.reverse.contains_key(*qs) && seen.insert(*qs))
            .map(str::to_string)
            .collect();
        others
    }

    pub fn create_group(&mut self, name: &str) -> AppResult<&SetGroup> {
        check_group_name(name)?;
        if self.groups.contains_key(name) {
            return Err(AppError::duplicate_name(name));
        }
        let color = GROUP_COLORS[self.groups.len() % GROUP_COLORS.len()];
        self.update(|groups| {
            groups.insert(name.to_string(), SetGroup::new(name, color));
            ((), true)
        })?;
        info!("✓ 创建题集分组 '{}'", name);
        self.groups
            .get(name)
            .ok_or_else(|| AppError::not_found(EntityKind::SetGroup, name))
    }

    pub fn rename_group(&mut self, old_name: &str, new_name: &str) -> AppResult<()> {
        if old_name == OTHERS_GROUP {
            return Err(AppError::invalid_name(old_name, "Others 分组不能重命名"));
        }
        if !self.groups.contains_key(old_name) {
            return Err(AppError::not_found(EntityKind::SetGroup, old_name));
        }
        if old_name == new_name {
            return Ok(());
        }
        check_group_name(new_name)?;
        if self.groups.contains_key(new_name) {
            return Err(AppError::duplicate_name(new_name));
        }

        self.update(|groups| {
            if let Some(mut group) = groups.remove(old_name) {
                group.display_name = new_name.to_string();
                groups.insert(new_name.to_string(), group);
            }
            ((), true)
        })?;
        info!("✓ 题集分组 '{}' 重命名为 '{}'", old_name, new_name);
        Ok(())
    }

    /// 删除分组，其题集回到 "Others"
    pub fn delete_group(&mut self, name: &str) -> AppResult<()> {
        if name == OTHERS_GROUP {
            return Err(AppError::invalid_name(name, "Others 分组不能删除"));
        }
        if !self.groups.contains_key(name) {
            return Err(AppError::not_found(EntityKind::SetGroup, name));
        }
        self.update(|groups| {
            groups.remove(name);
            ((), true)
        })?;
        info!("🗑️ 已删除题集分组 '{}'", name);
        Ok(())
    }

    /// 把题集加入分组（幂等），返回是否有变化
    pub fn add_question_set(&mut self, group: &str, question_set: &str) -> AppResult<bool> {
        self.require_real_group(group)?;
        self.update(|groups| {
            let Some(target) = groups.get_mut(group) else {
                return (false, false);
            };
            if target.question_sets.iter().any(|qs| qs == question_set) {
                return (false, false);
            }
            target.question_sets.push(question_set.to_string());
            (true, true)
        })
    }

    pub fn remove_question_set(&mut self, group: &str, question_set: &str) -> AppResult<bool> {
        self.require_real_group(group)?;
        self.update(|groups| {
            let Some(target) = groups.get_mut(group) else {
                return (false, false);
            };
            let before = target.question_sets.len();
            target.question_sets.retain(|qs| qs != question_set);
            let removed = target.question_sets.len() != before;
            (removed, removed)
        })
    }

    /// 批量移动题集，只写一次文件，返回实际移动的题集
    ///
    /// 移到 "Others" 只是从来源分组移除；从 "Others" 移出只是加入目标分组
    pub fn move_question_sets(
        &mut self,
        question_sets: &[&str],
        from: &str,
        to: &str,
    ) -> AppResult<Vec<String>> {
        if question_sets.is_empty() || from == to {
            return Ok(Vec::new());
        }
        if from != OTHERS_GROUP {
            self.require_real_group(from)?;
        }
        if to != OTHERS_GROUP {
            self.require_real_group(to)?;
        }

        let moved = self.update(|groups| {
            let mut moved = Vec::new();
            for &qs in question_sets {
                let mut changed = false;
                if let Some(source) = groups.get_mut(from) {
                    let before = source.question_sets.len();
                    source.question_sets.retain(|s| s != qs);
                    changed |= source.question_sets.len() != before;
                }
                if let Some(target) = groups.get_mut(to) {
                    if !target.question_sets.iter().any(|s| s == qs) {
                        target.question_sets.push(qs.to_string());
                        changed = true;
                    }
                }
                if changed {
                    moved.push(qs.to_string());
                }
            }
            let changed = !moved.is_empty();
            (moved, changed)
        })?;

        debug!("从 '{}' 移动 {} 个题集到 '{}'", from, moved.len(), to);
        Ok(moved)
    }

    fn require_real_group(&self, group: &str) -> AppResult<()> {
        if group == OTHERS_GROUP {
            return Err(AppError::invalid_name(group, "Others 分组由系统计算"));
        }
        if !self.groups.contains_key(group) {
            return Err(AppError::not_found(EntityKind::SetGroup, group));
        }
        Ok(())
    }

    fn to_file(&self) -> SetGroupsFile {
        SetGroupsFile {
            groups: self.groups.clone(),
        }
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        for (name, group) in &self.groups {
            for qs in &group.question_sets {
                self.reverse
                    .entry(qs.clone())
                    .or_insert_with(|| name.clone());
            }
        }
    }

    fn update<T, F>(&mut self, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut BTreeMap<String, SetGroup>) -> (T, bool),
    {
        let mut next = self.groups.clone();
        let (result, changed) = apply(&mut next);
        if changed {
            if let Some(path) = &self.path {
                write_json_atomically(path, &SetGroupsFile { groups: next.clone() })?;
            }
            self.groups = next;
            self.rebuild_reverse();
        }
        Ok(result)
    }
}

fn default_groups() -> BTreeMap<String, SetGroup> {
    DEFAULT_SET_GROUPS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            (
                name.to_string(),
                SetGroup::new(name, GROUP_COLORS[i % GROUP_COLORS.len()]),
            )
        })
        .collect()
}

fn check_group_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_name(name, "名称不能为空"));
    }
    if name == OTHERS_GROUP {
        return Err(AppError::invalid_name(name, "Others 是保留分组名"));
    }
    Ok(())
}
