//! 题集分组标签与标签颜色
//!
//! 标签挂在题集分组键（见 [`group_key`](crate::services::set_grouper::group_key)）上，
//! 颜色按首次出现顺序对调色板取模分配，分配后持久化保持不变

use crate::config::TAG_COLORS;
use crate::error::AppResult;
use crate::models::loaders::{read_json_if_exists, write_json_atomically};
use crate::models::Question;
use crate::services::set_grouper::group_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// tags 文件内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFile {
    #[serde(default)]
    pub group_tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub tag_colors: BTreeMap<String, String>,
}

impl TagFile {
    /// 优先取调色板中第一个未被使用的颜色，全部用完后按标签数量循环
    fn ensure_color(&mut self, tag: &str, palette: &[String]) -> bool {
        if self.tag_colors.contains_key(tag) {
            return false;
        }
        let color = palette
            .iter()
            .find(|c| !self.tag_colors.values().any(|used| used == *c))
            .cloned()
            .unwrap_or_else(|| palette[self.tag_colors.len() % palette.len()].clone());
        self.tag_colors.insert(tag.to_string(), color);
        true
    }
}

/// 标签索引
#[derive(Debug, Clone)]
pub struct TagIndex {
    state: TagFile,
    palette: Vec<String>,
    path: Option<PathBuf>,
}

impl TagIndex {
    /// 仅在内存中使用的索引；调色板为空时使用默认调色板
    pub fn new(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            TAG_COLORS.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            state: TagFile::default(),
            palette,
            path: None,
        }
    }

    /// 从文件加载，文件不存在时为空索引（首次修改时创建）
    pub fn open(path: impl Into<PathBuf>, palette: Vec<String>) -> AppResult<Self> {
        let path = path.into();
        let mut index = Self::new(palette);
        if let Some(state) = read_json_if_exists::<TagFile>(&path)? {
            index.state = state;
        }
        info!(
            "🏷️ 已加载 {} 个标签 ({} 个分组)",
            index.state.tag_colors.len(),
            index.state.group_tags.len()
        );
        index.path = Some(path);
        Ok(index)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// 取得标签颜色，首次出现时分配并持久化
    pub fn assign_color(&mut self, tag: &str) -> AppResult<String> {
        if let Some(color) = self.state.tag_colors.get(tag) {
            return Ok(color.clone());
        }
        let palette = self.palette.clone();
        self.update(|state| {
            state.ensure_color(tag, &palette);
            let color = state.tag_colors.get(tag).cloned().unwrap_or_default();
            (color, true)
        })
    }

    pub fn color_of(&self, tag: &str) -> Option<&str> {
        self.state.tag_colors.get(tag).map(String::as_str)
    }

    pub fn tags_of(&self, group: &str) -> &[String] {
        self.state
            .group_tags
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 为分组添加标签（幂等），返回是否有变化
    pub fn add_tag(&mut self, group: &str, tag: &str) -> AppResult<bool> {
        let palette = self.palette.clone();
        let added = self.update(|state| {
            let tags = state.group_tags.entry(group.to_string()).or_default();
            if tags.iter().any(|t| t == tag) {
                return (false, false);
            }
            tags.push(tag.to_string());
            state.ensure_color(tag, &palette);
            (true, true)
        })?;
        if added {
            debug!("分组 '{}' 添加标签 '{}'", group, tag);
        }
        Ok(added)
    }

    /// 移除分组标签（幂等），分组没有标签后被丢弃
    pub fn remove_tag(&mut self, group: &str, tag: &str) -> AppResult<bool> {
        let removed = self.update(|state| {
            let Some(tags) = state.group_tags.get_mut(group) else {
                return (false, false);
            };
            let before = tags.len();
            tags.retain(|t| t != tag);
            let removed = tags.len() != before;
            if tags.is_empty() {
                state.group_tags.remove(group);
            }
            (removed, removed)
        })?;
        if removed {
            debug!("分组 '{}' 移除标签 '{}'", group, tag);
        }
        Ok(removed)
    }

    /// 整体替换分组的标签（去重并保持顺序），空集合即删除该分组
    pub fn set_tags<I, S>(&mut self, group: &str, tags: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let tags: Vec<String> = tags
            .into_iter()
            .map(Into::into)
            .filter(|t| seen.insert(t.clone()))
            .collect();
        let palette = self.palette.clone();

        self.update(|state| {
            if tags.is_empty() {
                let changed = state.group_tags.remove(group).is_some();
                return ((), changed);
            }
            for tag in &tags {
                state.ensure_color(tag, &palette);
            }
            let changed = state.group_tags.get(group) != Some(&tags);
            state.group_tags.insert(group.to_string(), tags);
            ((), changed)
        })
    }

    /// 所有标签（排序去重）
    pub fn all_tags(&self) -> Vec<&str> {
        self.state
            .group_tags
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.state.group_tags.keys().map(String::as_str)
    }

    pub fn groups_with_tag(&self, tag: &str) -> Vec<&str> {
        self.groups_matching(|tags| tags.iter().any(|t| t == tag))
    }

    /// 拥有任一标签的分组；标签为空时返回空
    pub fn groups_with_any_tag(&self, tags: &[&str]) -> Vec<&str> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.groups_matching(|group_tags| group_tags.iter().any(|t| tags.contains(&t.as_str())))
    }

    /// 拥有全部标签的分组；标签为空时返回空
    pub fn groups_with_all_tags(&self, tags: &[&str]) -> Vec<&str> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.groups_matching(|group_tags| {
            tags.iter()
                .all(|tag| group_tags.iter().any(|t| t == tag))
        })
    }

    /// 在所有分组中重命名标签，颜色随之迁移；返回受影响的分组数
    pub fn rename_tag(&mut self, old: &str, new: &str) -> AppResult<usize> {
        if old == new {
            return Ok(0);
        }
        let affected = self.update(|state| {
            let mut affected = 0;
            for tags in state.group_tags.values_mut() {
                let Some(pos) = tags.iter().position(|t| t == old) else {
                    continue;
                };
                if tags.iter().any(|t| t == new) {
                    tags.remove(pos);
                } else {
                    tags[pos] = new.to_string();
                }
                affected += 1;
            }
            let mut changed = affected > 0;
            if let Some(color) = state.tag_colors.remove(old) {
                state.tag_colors.entry(new.to_string()).or_insert(color);
                changed = true;
            }
            (affected, changed)
        })?;
        info!("🏷️ 标签 '{}' 重命名为 '{}' ({} 个分组)", old, new, affected);
        Ok(affected)
    }

    /// 从所有分组删除标签并移除其颜色；返回受影响的分组数
    pub fn delete_tag(&mut self, tag: &str) -> AppResult<usize> {
        let affected = self.update(|state| {
            let mut affected = 0;
            state.group_tags.retain(|_, tags| {
                let before = tags.len();
                tags.retain(|t| t != tag);
                if tags.len() != before {
                    affected += 1;
                }
                !tags.is_empty()
            });
            let had_color = state.tag_colors.remove(tag).is_some();
            (affected, affected > 0 || had_color)
        })?;
        info!("🗑️ 已删除标签 '{}' ({} 个分组)", tag, affected);
        Ok(affected)
    }

    pub fn clear(&mut self) -> AppResult<()> {
        self.update(|state| {
            let changed = *state != TagFile::default();
            *state = TagFile::default();
            ((), changed)
        })
    }

    /// 把题集分组上的标签合并进每道题的 `tags`，返回新增标签的次数
    pub fn tag_questions(&self, questions: &mut [Question]) -> usize {
        let mut added = 0;
        for question in questions.iter_mut() {
            let key = group_key(&question.question_set_name);
            for tag in self.tags_of(&key) {
                if question.add_tag(tag.as_str()) {
                    added += 1;
                }
            }
        }
        added
    }

    fn groups_matching<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&[String]) -> bool,
    {
        self.state
            .group_tags
            .iter()
            .filter(|(_, tags)| predicate(tags))
            .map(|(group, _)| group.as_str())
            .collect()
    }

    /// 在副本上修改，写入成功后才替换内存状态
    fn update<T, F>(&mut self, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut TagFile) -> (T, bool),
    {
        let mut next = self.state.clone();
        let (result, changed) = apply(&mut next);
        if changed {
            if let Some(path) = &self.path {
                write_json_atomically(path, &next)?;
            }
            self.state = next;
        }
        Ok(result)
    }
}
