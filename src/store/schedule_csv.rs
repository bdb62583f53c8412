use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::error::ScheduleError;
use crate::models::{PayPeriodRecord, PeriodId, Schedule};

const COL_START: &str = "PP Start Date";
const COL_END: &str = "PP End Date";
const COL_INITIAL: &str = "Initial Pull (Wed)";
const COL_FINAL: &str = "Final Pull & Email (Mon)";

/// 排班表 CSV 的一行 (列名即表头文字)
#[derive(Debug, Deserialize)]
struct ScheduleRow {
    #[serde(rename = "Pay Period")]
    pay_period: String,
    #[serde(rename = "PP Start Date")]
    start: String,
    #[serde(rename = "PP End Date")]
    end: String,
    #[serde(rename = "Initial Pull (Wed)")]
    initial_pull: String,
    #[serde(rename = "Final Pull & Email (Mon)")]
    final_pull: String,
    #[serde(rename = "Is the Pay Period Complete?")]
    complete: String,
}

/// 从文件加载排班表
pub fn load_schedule(path: &Path) -> Result<Schedule, ScheduleError> {
    if !path.exists() {
        return Err(ScheduleError::Missing(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let schedule = read_schedule(file)?;
    tracing::info!("Loaded {} pay periods from {}", schedule.len(), path.display());
    Ok(schedule)
}

/// 从任意 CSV 源读取并校验
pub fn read_schedule<R: Read>(source: R) -> Result<Schedule, ScheduleError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<ScheduleRow>().enumerate() {
        let row = row?;
        let line = idx + 1;
        if row.pay_period.is_empty() {
            return Err(ScheduleError::MissingValue {
                row: line,
                column: "Pay Period",
            });
        }
        records.push(PayPeriodRecord {
            id: PeriodId::new(row.pay_period),
            start: date_field(line, COL_START, &row.start)?,
            end: date_field(line, COL_END, &row.end)?,
            initial_pull: date_field(line, COL_INITIAL, &row.initial_pull)?,
            final_pull: date_field(line, COL_FINAL, &row.final_pull)?,
            complete: row.complete.trim().eq_ignore_ascii_case("yes"),
        });
    }

    Schedule::new(records)
}

fn date_field(row: usize, column: &'static str, value: &str) -> Result<NaiveDate, ScheduleError> {
    parse_date(value).ok_or_else(|| ScheduleError::InvalidDate {
        row,
        column,
        value: value.to_string(),
    })
}

/// 排班表里常见的几种日期写法; 带时刻的只取日期部分
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 6] = [
        "%Y-%m-%d",
        "%m/%d/%y",
        "%m/%d/%Y",
        "%Y/%m/%d",
        "%d-%b-%Y",
        "%B %d, %Y",
    ];
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];

    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Pay Period,PP Start Date,PP End Date,Initial Pull (Wed),Final Pull & Email (Mon),Is the Pay Period Complete?\n";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_reads_mixed_date_formats() {
        let csv = format!(
            "{HEADER}1,2024-01-01,2024-01-14,2024-01-17,2024-01-22,No\n\
             2,1/15/2024,1/28/2024,01/31/24,2024-02-05 00:00:00, YES \n"
        );
        let schedule = read_schedule(csv.as_bytes()).unwrap();
        assert_eq!(schedule.len(), 2);

        let second = &schedule.records()[1];
        assert_eq!(second.id.as_str(), "2");
        assert_eq!(second.start, d(2024, 1, 15));
        assert_eq!(second.initial_pull, d(2024, 1, 31));
        assert_eq!(second.final_pull, d(2024, 2, 5));
        assert!(second.complete);
        assert!(!schedule.records()[0].complete);
    }

    #[test]
    fn test_rejects_bad_date() {
        let csv = format!("{HEADER}1,not a date,2024-01-14,2024-01-17,2024-01-22,No\n");
        let err = read_schedule(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDate {
                row: 1,
                column: COL_START,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unsorted_schedule() {
        let csv = format!(
            "{HEADER}2,2024-01-15,2024-01-28,2024-01-31,2024-02-05,No\n\
             1,2024-01-01,2024-01-14,2024-01-17,2024-01-22,No\n"
        );
        assert!(matches!(
            read_schedule(csv.as_bytes()),
            Err(ScheduleError::Unsorted { row: 1, .. })
        ));
    }

    #[test]
    fn test_missing_column_is_a_load_error() {
        let csv = "Pay Period,PP Start Date\n1,2024-01-01\n";
        assert!(matches!(read_schedule(csv.as_bytes()), Err(ScheduleError::Csv(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pay_periods.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{HEADER}7,2024-03-24,2024-04-06,2024-04-10,2024-04-15,no\n").unwrap();

        let schedule = load_schedule(&path).unwrap();
        assert_eq!(schedule.records()[0].id.as_str(), "7");

        let missing = dir.path().join("nope.csv");
        assert!(matches!(load_schedule(&missing), Err(ScheduleError::Missing(_))));
    }
}
