use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::PeriodId;

/// 排班表加载失败 (致命: 在任何解析之前中止整个运行)
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Pay period schedule not found at: {0}")]
    Missing(PathBuf),

    #[error("failed to read pay period schedule: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: cannot parse '{column}' value '{value}' as a date")]
    InvalidDate {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: '{column}' is empty")]
    MissingValue { row: usize, column: &'static str },

    #[error("row {row}: start date {start} is not after the previous period's start")]
    Unsorted { row: usize, start: NaiveDate },

    #[error("pay period schedule contains no periods")]
    Empty,
}

/// 单条邮件的周期解析失败 (可恢复: 跳过该邮件)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No active pay period found for this date.")]
    NoActivePeriod { date: NaiveDate },

    #[error("Pay period is already marked as complete.")]
    AlreadyComplete { id: PeriodId },
}

/// 表头定位失败 (可恢复: 跳过该文件的合并)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderError {
    #[error("no row in the first {scanned} rows scored above {threshold}")]
    NotFound { scanned: usize, threshold: f64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{table} report is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: String },
}

/// 外部协作方 (文件系统 / 工作簿 / 收件箱) 错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open workbook {path}: {message}")]
    WorkbookRead { path: PathBuf, message: String },

    #[error("workbook {0} contains no sheets")]
    EmptyWorkbook(PathBuf),

    #[error("failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid inbox manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// 单个周期合并过程中的错误, 在周期边界被捕获
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not find header row in {file}")]
    Header { file: String, source: HeaderError },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("[{section}] {key} must be between 0 and 100, got {value}")]
    ThresholdOutOfRange {
        section: &'static str,
        key: &'static str,
        value: u8,
    },

    #[error("[{section}] {key} must be between 0 and {max}, got {value}")]
    BufferOutOfRange {
        section: &'static str,
        key: &'static str,
        max: i64,
        value: i64,
    },
}
