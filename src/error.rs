use std::fmt;
use thiserror::Error;

/// 找不到的对象类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// 题目列表
    List,
    /// 章节分组
    ChapterGroup,
    /// 章节标签
    ChapterLabel,
    /// 题集展示分组
    SetGroup,
    /// 题集
    QuestionSet,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::List => "题目列表",
            EntityKind::ChapterGroup => "章节分组",
            EntityKind::ChapterLabel => "章节标签",
            EntityKind::SetGroup => "题集分组",
            EntityKind::QuestionSet => "题集",
        };
        f.write_str(name)
    }
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 引用的列表 / 分组 / 标签不存在
    #[error("{kind}不存在: {name}")]
    NotFound { kind: EntityKind, name: String },

    /// 创建或重命名时名称冲突
    #[error("名称已存在: {name}")]
    DuplicateName { name: String },

    /// 名称为空或无法作为存储键
    #[error("无效的名称 '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// 随机抽题时题目来源为空
    #[error("题目来源为空，无法随机抽题")]
    InsufficientQuestions,

    /// 持久化错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 文件存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxedSource },

    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed { path: String, source: BoxedSource },

    /// 删除文件失败
    #[error("删除文件失败 ({path}): {source}")]
    DeleteFailed { path: String, source: BoxedSource },

    /// JSON 解析或序列化失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed { path: String, source: BoxedSource },

    /// 目录不存在且无法创建
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxedSource },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed { path: String, source: BoxedSource },
}

// ========== 便捷构造函数 ==========

impl AppError {
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        AppError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// 创建列表不存在错误
    pub fn list_not_found(name: impl Into<String>) -> Self {
        Self::not_found(EntityKind::List, name)
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        AppError::DuplicateName { name: name.into() }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 创建文件读取错误
    pub fn storage_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn storage_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    pub fn storage_delete_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::DeleteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    pub fn json_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Storage(StorageError::JsonParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为"不存在"类错误，调用方据此决定是否提示用户
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：anyhow 已经为所有实现了 std::error::Error 的类型提供了自动转换

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::json_parse_failed(String::new(), err)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;

pub type Result<T> = AppResult<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind() {
        let err = AppError::list_not_found("期中复习");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "题目列表不存在: 期中复习");
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::storage_write_failed("lists/a.json", io);
        assert!(matches!(
            err,
            AppError::Storage(StorageError::WriteFailed { .. })
        ));
        assert!(err.to_string().contains("lists/a.json"));
    }
}
