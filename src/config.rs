use crate::error::{AppResult, ConfigError};
use crate::utils::text::normalize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 默认的杂志 → 章节分组文件映射
static MAGAZINE_GROUPING_FILES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "chemistry today" => "ChemistryChapterGrouping.json",
    "physics for you" => "PhysicsChapterGrouping.json",
    "mathematics today" => "MathematicsChapterGrouping.json",
};

/// 未知杂志时使用的分组文件
const FALLBACK_GROUPING_FILE: &str = "PhysicsChapterGrouping.json";

/// 标签调色板（20 色）
pub const TAG_COLORS: [&str; 20] = [
    "#2563eb", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#ec4899", "#14b8a6",
    "#f97316", "#6366f1", "#84cc16", "#f43f5e", "#0ea5e9", "#a855f7", "#22c55e", "#eab308",
    "#d946ef", "#3b82f6", "#fb923c", "#38bdf8",
];

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 自定义列表存放目录（每个列表一个 JSON 文件）
    pub list_dir: String,
    /// 章节分组文件所在目录
    pub grouping_dir: String,
    /// 标签配置文件
    pub tags_file: String,
    /// 题集展示分组文件
    pub set_groups_file: String,
    /// 题目快照（由外部导入流程生成的 JSON 数组）
    pub questions_file: String,
    /// 当前杂志，决定加载哪个章节分组文件
    pub current_magazine: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 导入题目时是否把新章节标签写回分组文件
    pub auto_assign_chapters: bool,
    /// 标签颜色
    pub tag_palette: Vec<String>,
    /// 覆盖默认映射：杂志名 → 分组文件名
    pub magazine_groupings: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            list_dir: "QuestionList".to_string(),
            grouping_dir: ".".to_string(),
            tags_file: "tags.cfg".to_string(),
            set_groups_file: "QuestionSetGroup.json".to_string(),
            questions_file: "questions.json".to_string(),
            current_magazine: "physics for you".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            auto_assign_chapters: true,
            tag_palette: TAG_COLORS.iter().map(|c| c.to_string()).collect(),
            magazine_groupings: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖当前值，无法解析的值保持原样
    pub fn with_env_overrides(self) -> Self {
        Self {
            list_dir: std::env::var("LIST_DIR").unwrap_or(self.list_dir),
            grouping_dir: std::env::var("GROUPING_DIR").unwrap_or(self.grouping_dir),
            tags_file: std::env::var("TAGS_FILE").unwrap_or(self.tags_file),
            set_groups_file: std::env::var("SET_GROUPS_FILE").unwrap_or(self.set_groups_file),
            questions_file: std::env::var("QUESTIONS_FILE").unwrap_or(self.questions_file),
            current_magazine: std::env::var("CURRENT_MAGAZINE").unwrap_or(self.current_magazine),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            auto_assign_chapters: env_parse("AUTO_ASSIGN_CHAPTERS")
                .unwrap_or(self.auto_assign_chapters),
            tag_palette: self.tag_palette,
            magazine_groupings: self.magazine_groupings,
        }
    }

    /// 从 TOML 文件加载配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        if config.tag_palette.is_empty() {
            config.tag_palette = Self::default().tag_palette;
        }
        Ok(config)
    }

    /// 加载配置：`CURATOR_CONFIG` 指定的文件或当前目录下的 curator.toml，再叠加环境变量
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("CURATOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("curator.toml"));

        let base = if path.exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 根据杂志名解析章节分组文件路径
    pub fn grouping_file_for(&self, magazine: &str) -> PathBuf {
        let key = normalize(magazine);
        let file_name = self
            .magazine_groupings
            .iter()
            .find(|(name, _)| normalize(name) == key)
            .map(|(_, file)| file.as_str())
            .or_else(|| MAGAZINE_GROUPING_FILES.get(key.as_str()).copied())
            .unwrap_or(FALLBACK_GROUPING_FILE);

        Path::new(&self.grouping_dir).join(file_name)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
