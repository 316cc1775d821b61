//! 文本规范化工具
//!
//! 所有比较（章节匹配、题集搜索、杂志过滤）都先经过 [`normalize`]

/// 小写、去除首尾空白，并把内部连续空白折叠为单个空格
///
/// 纯函数，空输入返回空字符串
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Laws  Of\tMotion \n"), "laws of motion");
        assert_eq!(normalize("Physics For You"), "physics for you");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("牛顿运动定律", 10), "牛顿运动定律");
    }
}
