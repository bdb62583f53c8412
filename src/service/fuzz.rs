//! 近似字符串打分 (0-100)
//!
//! 所有打分函数先做同样的预处理: 转小写, 非字母数字字符替换为空格, 去首尾空白.
//! 因此标点与大小写差异不影响得分.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 姓名匹配使用的打分函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameScorer {
    /// 词集合比较, 不受 "Last, First" / "First Last" 顺序影响
    #[default]
    TokenSet,
    Partial,
}

impl NameScorer {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            NameScorer::TokenSet => token_set_ratio(a, b),
            NameScorer::Partial => partial_ratio(a, b),
        }
    }
}

/// 小写 + 非字母数字转空格 + trim
pub fn process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.trim().to_lowercase()
}

/// 归一化 InDel 相似度
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = process(a).chars().collect();
    let b: Vec<char> = process(b).chars().collect();
    ratio_chars(&a, &b)
}

/// 较短串与较长串每个等长窗口 (以及两端更短的前缀/后缀) 的最佳 ratio
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = process(a).chars().collect();
    let b: Vec<char> = process(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let (m, n) = (short.len(), long.len());

    let mut best = 0.0_f64;
    // 两端的不完整窗口
    for len in 1..m {
        best = best.max(ratio_chars(short, &long[..len]));
        best = best.max(ratio_chars(short, &long[n - len..]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    for start in 0..=(n - m) {
        best = best.max(ratio_chars(short, &long[start..start + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    best
}

/// 词集合相似度: 交集 / 差集分别比较, 取最大
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let pa = process(a);
    let pb = process(b);
    let tokens_a: BTreeSet<&str> = pa.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = pb.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // 一方是另一方的子集
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab: Vec<char> = diff_ab.join(" ").chars().collect();
    let diff_ba: Vec<char> = diff_ba.join(" ").chars().collect();
    let sect_len = if sect.is_empty() {
        0
    } else {
        sect.join(" ").chars().count()
    };
    let sep = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + sep + diff_ab.len();
    let sect_ba_len = sect_len + sep + diff_ba.len();

    // "sect diff_ab" 对 "sect diff_ba": 公共前缀不改变编辑距离
    let dist = indel_distance(&diff_ab, &diff_ba);
    let result = normalized_similarity(dist, sect_ab_len + sect_ba_len);
    if sect_len == 0 {
        return result;
    }

    let sect_ab = normalized_similarity(sep + diff_ab.len(), sect_len + sect_ab_len);
    let sect_ba = normalized_similarity(sep + diff_ba.len(), sect_len + sect_ba_len);
    result.max(sect_ab).max(sect_ba)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_similarity(indel_distance(a, b), a.len() + b.len())
}

fn normalized_similarity(dist: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * (1.0 - dist as f64 / total as f64)
}

/// 仅插入/删除的编辑距离 = |a| + |b| - 2 * LCS
fn indel_distance(a: &[char], b: &[char]) -> usize {
    a.len() + b.len() - 2 * lcs_len(a, b)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected:.2}, got {actual:.2}"
        );
    }

    #[test]
    fn test_process_strips_punctuation_and_case() {
        assert_eq!(process("  Time Sheet: Owner Name "), "time sheet  owner name");
        assert_eq!(process("Smith, John"), "smith  john");
    }

    #[test]
    fn test_ratio() {
        approx(ratio("John Smith", "john smith"), 100.0);
        // LCS("jon smith", "john smith") = 9
        approx(ratio("Jon Smith", "John Smith"), 100.0 * 18.0 / 19.0);
        approx(ratio("", "John"), 0.0);
    }

    #[test]
    fn test_partial_ratio_substring_is_perfect() {
        approx(
            partial_ratio("Sum of Hours", "Super Office Division Sum of Hours Total"),
            100.0,
        );
        // 参数顺序无关
        approx(
            partial_ratio("Super Office Division Sum of Hours Total", "Sum of Hours"),
            100.0,
        );
    }

    #[test]
    fn test_partial_ratio_single_substitution() {
        // 全窗口 LCS 9/10 -> 90, 优于 9 字符前缀/后缀的 84.2
        approx(partial_ratio("owner name", "owner nxme"), 90.0);
        approx(partial_ratio("owner name", "1234"), 0.0);
    }

    #[test]
    fn test_token_set_ignores_order_and_commas() {
        approx(token_set_ratio("Smith, John", "John Smith"), 100.0);
        approx(token_set_ratio("John A Smith", "Smith, John"), 100.0);
    }

    #[test]
    fn test_token_set_one_character_typo() {
        // sect="smith", diff "jon" vs "john": 1 - 1/19
        approx(token_set_ratio("Smith, Jon", "John Smith"), 100.0 * 18.0 / 19.0);
    }

    #[test]
    fn test_token_set_disjoint() {
        approx(token_set_ratio("abc", "xyz"), 0.0);
        approx(token_set_ratio("", "John Smith"), 0.0);
    }
}
