//! 自定义题目列表存储 - 业务能力层
//!
//! 每个列表一个 JSON 文件。所有修改先在副本上完成，原子写入成功后才替换内存中的列表，
//! 因此任何失败都不会留下半写入的文件或不一致的内存状态

use crate::error::{AppError, AppResult};
use crate::models::loaders::{
    ensure_dir, list_json_files, read_json, remove_file_if_exists, write_json_atomically,
};
use crate::models::{FilterState, Question, QuestionList};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 由列表名得到文件名主干：保留字母数字、空格、下划线和连字符，其余替换为下划线
pub fn storage_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// 校验列表名是否可用作存储键
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_name(name, "名称不能为空"));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::invalid_name(name, "名称包含控制字符"));
    }
    if !storage_stem(name).chars().any(char::is_alphanumeric) {
        return Err(AppError::invalid_name(name, "名称中没有可用于文件名的字符"));
    }
    Ok(())
}

/// 文件名冲突比较键（大小写不敏感，兼容不区分大小写的文件系统）
fn collision_key(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// 题目列表存储
pub struct ListStore {
    dir: PathBuf,
    lists: BTreeMap<String, QuestionList>,
    /// 列表名 → 实际文件路径（文件内的 name 才是身份，文件名可能与之不同）
    paths: HashMap<String, PathBuf>,
}

impl ListStore {
    /// 打开列表目录（不存在则创建）并加载全部列表
    pub fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let mut store = Self {
            dir: dir.into(),
            lists: BTreeMap::new(),
            paths: HashMap::new(),
        };
        ensure_dir(&store.dir)?;
        store.load_all()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 重新扫描目录并解析所有列表文件
    ///
    /// 解析失败的文件记录日志后跳过；同名列表按文件名顺序保留第一个
    pub fn load_all(&mut self) -> AppResult<&BTreeMap<String, QuestionList>> {
        let mut lists = BTreeMap::new();
        let mut paths = HashMap::new();

        for path in list_json_files(&self.dir)? {
            let mut list: QuestionList = match read_json(&path) {
                Ok(list) => list,
                Err(e) => {
                    warn!("⚠️ 跳过无法解析的列表文件 {}: {}", path.display(), e);
                    continue;
                }
            };

            if list.name.trim().is_empty() {
                warn!("⚠️ 跳过缺少名称的列表文件 {}", path.display());
                continue;
            }
            if lists.contains_key(&list.name) {
                warn!(
                    "⚠️ 列表 '{}' 在多个文件中出现，忽略 {}",
                    list.name,
                    path.display()
                );
                continue;
            }

            let removed = list.dedupe();
            if removed > 0 {
                warn!("列表 '{}' 中有 {} 道重复题目，已去重", list.name, removed);
            }

            debug!("加载列表 '{}' ({} 道题)", list.name, list.len());
            paths.insert(list.name.clone(), path);
            lists.insert(list.name.clone(), list);
        }

        info!("🗂️ 已加载 {} 个自定义列表", lists.len());
        self.lists = lists;
        self.paths = paths;
        Ok(&self.lists)
    }

    pub fn get(&self, name: &str) -> Option<&QuestionList> {
        self.lists.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.lists.keys().map(String::as_str).collect()
    }

    pub fn lists(&self) -> &BTreeMap<String, QuestionList> {
        &self.lists
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// 创建空列表并立即持久化
    pub fn create(&mut self, name: &str) -> AppResult<&QuestionList> {
        if self.lists.contains_key(name) {
            return Err(AppError::duplicate_name(name));
        }
        let path = self.claim_path(name, None)?;

        let mut list = QuestionList::new(name);
        list.metadata.created_at = Some(chrono::Local::now().to_rfc3339());
        write_json_atomically(&path, &list)?;

        info!("✓ 创建列表 '{}'", name);
        Ok(self.commit(list, path))
    }

    /// 重命名列表：先写新文件，再删旧文件，最后更新内存索引
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> AppResult<()> {
        let current = self
            .lists
            .get(old_name)
            .ok_or_else(|| AppError::list_not_found(old_name))?;
        if old_name == new_name {
            return Ok(());
        }
        if self.lists.contains_key(new_name) {
            return Err(AppError::duplicate_name(new_name));
        }

        let old_path = self.path_for(old_name);
        let new_path = self.claim_path(new_name, Some(old_name))?;

        let mut renamed = current.clone();
        renamed.name = new_name.to_string();
        write_json_atomically(&new_path, &renamed)?;

        if new_path != old_path {
            if let Err(e) = remove_file_if_exists(&old_path) {
                // 回滚：旧列表仍然有效
                if let Err(cleanup) = remove_file_if_exists(&new_path) {
                    warn!("⚠️ 回滚重命名时无法删除 {}: {}", new_path.display(), cleanup);
                }
                return Err(e);
            }
        }

        self.lists.remove(old_name);
        self.paths.remove(old_name);
        self.commit(renamed, new_path);

        info!("✓ 列表 '{}' 已重命名为 '{}'", old_name, new_name);
        Ok(())
    }

    /// 删除列表（不可恢复，确认由调用方负责）
    pub fn delete(&mut self, name: &str) -> AppResult<()> {
        if !self.lists.contains_key(name) {
            return Err(AppError::list_not_found(name));
        }
        remove_file_if_exists(&self.path_for(name))?;
        self.lists.remove(name);
        self.paths.remove(name);

        info!("🗑️ 已删除列表 '{}'", name);
        Ok(())
    }

    /// 按顺序追加题目，已存在的 `row_number` 静默跳过，返回实际追加数量
    pub fn add_questions<'a, I>(&mut self, name: &str, questions: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = &'a Question>,
    {
        let added = self.update(name, |list| {
            let added = list.append_unique(questions);
            (added, added > 0)
        })?;
        debug!("列表 '{}' 追加了 {} 道题", name, added);
        Ok(added)
    }

    /// 删除匹配的题目，未匹配的编号忽略，返回删除数量
    pub fn remove_questions(&mut self, name: &str, row_numbers: &HashSet<i64>) -> AppResult<usize> {
        let removed = self.update(name, |list| {
            let removed = list.remove_rows(row_numbers);
            (removed, removed > 0)
        })?;
        debug!("列表 '{}' 删除了 {} 道题", name, removed);
        Ok(removed)
    }

    /// 覆盖列表元数据中的杂志和筛选条件，不改动题目
    pub fn set_metadata(
        &mut self,
        name: &str,
        magazine: &str,
        filters: Option<FilterState>,
    ) -> AppResult<()> {
        self.update(name, |list| {
            list.metadata.magazine = magazine.to_string();
            list.metadata.filters = filters;
            ((), true)
        })
    }

    pub fn set_archived(&mut self, name: &str, archived: bool) -> AppResult<()> {
        self.update(name, |list| {
            let changed = list.metadata.archived != archived;
            list.metadata.archived = archived;
            ((), changed)
        })?;
        info!(
            "列表 '{}' {}",
            name,
            if archived { "已归档" } else { "已取消归档" }
        );
        Ok(())
    }

    /// 设置列表附带的理论笔记
    pub fn set_theory(&mut self, name: &str, theory: &str) -> AppResult<()> {
        self.update(name, |list| {
            let changed = list.metadata.theory != theory;
            list.metadata.theory = theory.to_string();
            ((), changed)
        })
    }

    /// 从来源中不放回地随机抽取题目生成列表
    pub fn create_random_sample(
        &mut self,
        source: &[Question],
        count: usize,
        name: &str,
        filters: &FilterState,
        overwrite: bool,
    ) -> AppResult<&QuestionList> {
        let mut rng = rand::thread_rng();
        self.create_random_sample_with_rng(&mut rng, source, count, name, filters, overwrite)
    }

    /// 同 [`ListStore::create_random_sample`]，随机源由调用方提供
    ///
    /// - 来源为空 → `InsufficientQuestions`
    /// - 同名列表已存在且未确认覆盖 → `DuplicateName`
    /// - 来源先按 `row_number` 去重，抽取数量截断为去重后的数量
    pub fn create_random_sample_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        source: &[Question],
        count: usize,
        name: &str,
        filters: &FilterState,
        overwrite: bool,
    ) -> AppResult<&QuestionList> {
        if source.is_empty() {
            return Err(AppError::InsufficientQuestions);
        }

        let existing = self.lists.get(name);
        if existing.is_some() && !overwrite {
            return Err(AppError::duplicate_name(name));
        }

        let mut seen = HashSet::new();
        let mut pool: Vec<&Question> = source
            .iter()
            .filter(|q| seen.insert(q.row_number))
            .collect();
        let count = count.min(pool.len());
        pool.shuffle(rng);
        pool.truncate(count);

        let mut list = match existing {
            Some(list) => list.clone(),
            None => {
                let mut list = QuestionList::new(name);
                list.metadata.created_at = Some(chrono::Local::now().to_rfc3339());
                list
            }
        };
        list.questions = pool.into_iter().cloned().collect();
        list.metadata.magazine = filters.selected_magazine.clone();
        list.metadata.filters = Some(filters.clone());

        let path = match self.paths.get(name) {
            Some(path) => path.clone(),
            None => self.claim_path(name, None)?,
        };
        write_json_atomically(&path, &list)?;

        info!(
            "🎲 随机抽取 {} 道题生成列表 '{}' (来源 {} 道, {})",
            count,
            name,
            source.len(),
            filters.describe()
        );
        Ok(self.commit(list, path))
    }

    // ========== 内部辅助 ==========

    /// 在副本上执行修改，需要时原子写入，成功后替换内存中的列表
    fn update<T, F>(&mut self, name: &str, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut QuestionList) -> (T, bool),
    {
        let current = self
            .lists
            .get(name)
            .ok_or_else(|| AppError::list_not_found(name))?;

        let mut updated = current.clone();
        let (result, changed) = apply(&mut updated);
        if changed {
            let path = self.path_for(name);
            write_json_atomically(&path, &updated)?;
            self.lists.insert(name.to_string(), updated);
        }
        Ok(result)
    }

    fn commit(&mut self, list: QuestionList, path: PathBuf) -> &QuestionList {
        self.paths.insert(list.name.clone(), path);
        match self.lists.entry(list.name.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(list);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(list),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.paths
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_path(name))
    }

    fn default_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", storage_stem(name)))
    }

    /// 为新名称确定文件路径，并拒绝与其他列表（或未被加载的文件）冲突的名称
    ///
    /// `renaming` 为正在重命名的列表；若新旧名称落到同一个文件，沿用旧文件
    fn claim_path(&self, name: &str, renaming: Option<&str>) -> AppResult<PathBuf> {
        validate_name(name)?;
        let path = self.default_path(name);
        let key = collision_key(&path);

        if let Some(old_name) = renaming {
            let old_path = self.path_for(old_name);
            if collision_key(&old_path) == key {
                return Ok(old_path);
            }
        }

        if let Some((owner, _)) = self
            .paths
            .iter()
            .find(|(owner, p)| Some(owner.as_str()) != renaming && collision_key(p) == key)
        {
            return Err(AppError::invalid_name(
                name,
                format!("存储文件名与列表 '{}' 冲突", owner),
            ));
        }

        let on_disk = list_json_files(&self.dir)?
            .into_iter()
            .any(|p| collision_key(&p) == key);
        if on_disk {
            return Err(AppError::invalid_name(
                name,
                format!("存储文件 {} 已被占用", path.display()),
            ));
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn q(row: i64) -> Question {
        let mut q = Question::new(row);
        q.question_set_name = format!("Set {}", row);
        q
    }

    #[test]
    fn test_storage_stem_sanitizes() {
        assert_eq!(storage_stem("Mock Test #1: Optics"), "Mock Test _1_ Optics");
        assert_eq!(storage_stem("  a/b\\c  "), "a_b_c");
        assert_eq!(storage_stem("力学-复习_1"), "力学-复习_1");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Revision 1").is_ok());
        assert!(matches!(
            validate_name("   "),
            Err(AppError::InvalidName { .. })
        ));
        assert!(matches!(
            validate_name("../.."),
            Err(AppError::InvalidName { .. })
        ));
        assert!(matches!(
            validate_name("a\nb"),
            Err(AppError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_sanitized_collision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        store.create("Mock/Test").unwrap();

        let err = store.create("Mock:Test").unwrap_err();
        assert!(matches!(err, AppError::InvalidName { .. }));
        let err = store.create("mock_test").unwrap_err();
        assert!(matches!(err, AppError::InvalidName { .. }));
        assert_eq!(store.names(), vec!["Mock/Test"]);
    }

    #[test]
    fn test_rename_to_case_variant_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        store.create("Optics").unwrap();
        store.add_questions("Optics", [&q(1)]).unwrap();

        store.rename("Optics", "optics").unwrap();
        assert!(store.get("Optics").is_none());
        assert_eq!(store.get("optics").unwrap().row_numbers(), vec![1]);

        let files = list_json_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        let mut reopened = ListStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 1);
        assert!(reopened.contains("optics"));
    }

    #[test]
    fn test_random_sample_is_reproducible_with_seed() {
        let dir = tempfile::tempdir().unwrap();
        let source: Vec<Question> = (1..=10).map(q).collect();

        let mut a = ListStore::open(dir.path().join("a")).unwrap();
        let mut b = ListStore::open(dir.path().join("b")).unwrap();
        let filters = FilterState::default();

        let mut rng = StdRng::seed_from_u64(7);
        let first = a
            .create_random_sample_with_rng(&mut rng, &source, 4, "S", &filters, false)
            .unwrap()
            .row_numbers();
        let mut rng = StdRng::seed_from_u64(7);
        let second = b
            .create_random_sample_with_rng(&mut rng, &source, 4, "S", &filters, false)
            .unwrap()
            .row_numbers();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_random_sample_dedupes_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        let source = vec![q(1), q(1), q(2), q(2), q(2)];

        let list = store
            .create_random_sample_with_rng(
                &mut StdRng::seed_from_u64(1),
                &source,
                10,
                "Sample",
                &FilterState::default(),
                false,
            )
            .unwrap();
        let mut rows = list.row_numbers();
        rows.sort();
        assert_eq!(rows, vec![1, 2]);
    }
}
