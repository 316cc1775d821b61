//! 题集名聚类
//!
//! 从题集名推导粗粒度的分组键，仅用于展示时把相似题集放在一起，不参与身份判断

use crate::utils::text::normalize;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// 分组键最多保留的有效词数
const MAX_KEY_TOKENS: usize = 3;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(19|20)\d{2}$").unwrap());
static SUFFIX_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(paper|part|set|section|vol|volume|shift)$").unwrap());
static SUFFIX_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+|i|ii|iii|iv|v|vi|vii|viii|ix|x)$").unwrap());
static FUSED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(paper|part|set|section|shift)\d+$").unwrap());

/// 由题集名得到分组键
///
/// 1. 规范化并按非字母数字字符切词
/// 2. 反复去掉结尾的年份、"paper N" / "part N" 之类的后缀
/// 3. 取前 2~3 个有效词（非纯数字且长度大于 1）
/// 4. 没有有效词时退回剩余的词，仍为空则返回规范化全名
pub fn group_key(question_set_name: &str) -> String {
    let normalized = normalize(question_set_name);
    let mut tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    strip_trailing_suffixes(&mut tokens);

    let significant: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| is_significant(t))
        .take(MAX_KEY_TOKENS)
        .collect();

    if !significant.is_empty() {
        return significant.join(" ");
    }
    if let Some(first) = tokens.first() {
        return first.to_string();
    }
    normalized
}

fn strip_trailing_suffixes(tokens: &mut Vec<&str>) {
    loop {
        match tokens.as_slice() {
            [.., last] if YEAR.is_match(last) || FUSED_SUFFIX.is_match(last) => {
                tokens.pop();
            }
            [.., word, number] if SUFFIX_WORD.is_match(word) && SUFFIX_NUMBER.is_match(number) => {
                tokens.truncate(tokens.len() - 2);
            }
            _ => break,
        }
    }
}

fn is_significant(token: &str) -> bool {
    token.chars().count() > 1 && !token.chars().all(|c| c.is_ascii_digit())
}

/// 按分组键聚合题集名，组内去重并保持首次出现顺序
pub fn cluster<'a, I>(question_set_names: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in question_set_names {
        let members = clusters.entry(group_key(name)).or_default();
        if !members.iter().any(|m| m == name) {
            members.push(name.to_string());
        }
    }
    clusters
}
