use serde::Serialize;
use std::fmt;

use super::table::{CellValue, Row};

/// 未匹配时写入标识列的占位值
pub const NOT_FOUND: &str = "NOT FOUND";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchStatus {
    /// 标识取自得分最高的候选
    Matched { candidate: String, score: f64 },
    /// 标识为 [`NOT_FOUND`], 姓名已记入不匹配日志
    Unresolved,
}

/// 合并后的一行
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub values: Row,
    pub status: MatchStatus,
}

impl MergedRow {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    pub fn is_matched(&self) -> bool {
        matches!(self.status, MatchStatus::Matched { .. })
    }
}

/// 不匹配日志中的一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub name: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No matching Employee ID found for: '{}'", self.name)
    }
}

/// 一次合并的完整输出
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    /// 输出列 (按白名单顺序, 或主表列 + 标识列)
    pub columns: Vec<String>,
    pub rows: Vec<MergedRow>,
    pub mismatches: Vec<Mismatch>,
}

impl MergeOutcome {
    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_matched()).count()
    }
}
