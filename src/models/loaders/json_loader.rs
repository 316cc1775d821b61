use crate::error::{AppError, AppResult, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 读取并解析 JSON 文件
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::storage_read_failed(path.display().to_string(), e))?;

    serde_json::from_str(&content)
        .map_err(|e| AppError::json_parse_failed(path.display().to_string(), e))
}

/// 读取 JSON 文件，文件不存在时返回 `None`
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// 原子写入 JSON：先写同目录临时文件，再替换目标文件
///
/// 中途失败时目标文件保持原样
pub fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let display = path.display().to_string();
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::json_parse_failed(display.clone(), e))?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    ensure_dir(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)
        .map_err(|e| AppError::storage_write_failed(display.clone(), e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| AppError::storage_write_failed(display.clone(), e))?;
    tmp.flush()
        .map_err(|e| AppError::storage_write_failed(display.clone(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| AppError::storage_write_failed(display.clone(), e))?;
    tmp.persist(path)
        .map_err(|e| AppError::storage_write_failed(display, e.error))?;

    Ok(())
}

/// 删除文件，文件本就不存在时视为成功
pub fn remove_file_if_exists(path: &Path) -> AppResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::storage_delete_failed(path.display().to_string(), e)),
    }
}

/// 确保目录存在
pub fn ensure_dir(dir: &Path) -> AppResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|_| {
        AppError::Storage(StorageError::DirectoryNotFound {
            path: dir.display().to_string(),
        })
    })
}

/// 列出目录下所有 .json 文件，按文件名排序
pub fn list_json_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::storage_read_failed(dir.display().to_string(), e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.json");

        write_json_atomically(&path, &json!({"name": "A", "questions": []})).unwrap();
        let value: Value = read_json(&path).unwrap();
        assert_eq!(value["name"], "A");

        // 覆盖写入后不留下临时文件
        write_json_atomically(&path, &json!({"name": "B"})).unwrap();
        let files = list_json_files(path.parent().unwrap()).unwrap();
        assert_eq!(files, vec![path.clone()]);
        let value: Value = read_json(&path).unwrap();
        assert_eq!(value["name"], "B");
    }

    #[test]
    fn test_read_json_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json::<Value>(&path).unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage(StorageError::JsonParseFailed { .. })
        ));
    }

    #[test]
    fn test_missing_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(read_json_if_exists::<Value>(&path).unwrap().is_none());
        remove_file_if_exists(&path).unwrap();
    }
}
