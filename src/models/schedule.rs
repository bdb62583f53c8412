use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScheduleError;

/// 财年起始月份 (10 月)
const FISCAL_YEAR_START_MONTH: u32 = 10;

/// 薪资周期编号 (排班表中可能是整数, 也可能是字符串)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodId(String);

impl PeriodId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 排班表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriodRecord {
    pub id: PeriodId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_pull: NaiveDate,
    pub final_pull: NaiveDate,
    pub complete: bool,
}

impl PayPeriodRecord {
    /// 财年 (10 月起算, 10 月及以后归入下一年)
    pub fn fiscal_year(&self) -> i32 {
        let year = self.start.year();
        if self.start.month() >= FISCAL_YEAR_START_MONTH {
            year + 1
        } else {
            year
        }
    }

    /// `FY<yy> PP<id> - <Month> <Day> - <Month> <Day>`
    pub fn folder_name(&self) -> String {
        format!(
            "FY{:02} PP{} - {} - {}",
            self.fiscal_year().rem_euclid(100),
            self.id,
            self.start.format("%B %-d"),
            self.end.format("%B %-d"),
        )
    }
}

/// 归档子目录: 取决于收件日期是否在 final pull 之后
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingBucket {
    InitialPull,
    FinalPull,
}

impl FilingBucket {
    pub fn folder_name(self) -> &'static str {
        match self {
            FilingBucket::InitialPull => "Initial Pull (Wed)",
            FilingBucket::FinalPull => "Final Pull & Email (Mon)",
        }
    }
}

impl fmt::Display for FilingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// 落地目录模式下的拉取日标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullDay {
    Monday,
    Wednesday,
    Other,
}

impl PullDay {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => PullDay::Monday,
            Weekday::Wed => PullDay::Wednesday,
            _ => PullDay::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PullDay::Monday => "MON",
            PullDay::Wednesday => "WED",
            PullDay::Other => "PULL",
        }
    }
}

/// 已校验的排班表: 按开始日期严格升序, 加载后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    records: Vec<PayPeriodRecord>,
}

impl Schedule {
    pub fn new(records: Vec<PayPeriodRecord>) -> Result<Self, ScheduleError> {
        if records.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for (idx, pair) in records.windows(2).enumerate() {
            if pair[1].start <= pair[0].start {
                return Err(ScheduleError::Unsorted {
                    row: idx + 1,
                    start: pair[1].start,
                });
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[PayPeriodRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 下一周期的开始日期; 最后一个周期没有
    pub fn next_start(&self, idx: usize) -> Option<NaiveDate> {
        self.records.get(idx + 1).map(|r| r.start)
    }
}
