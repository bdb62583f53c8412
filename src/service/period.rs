use chrono::{DateTime, Duration, NaiveDate, TimeZone};

use crate::error::ResolveError;
use crate::models::{FilingBucket, PayPeriodRecord, PullDay, Schedule};

/// 最后一个周期的窗口在 final pull 之后额外延长的天数
pub const DEFAULT_FINAL_PULL_BUFFER_DAYS: i64 = 7;

/// 周期解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub record: &'a PayPeriodRecord,
    pub bucket: FilingBucket,
}

impl Resolution<'_> {
    pub fn folder_name(&self) -> String {
        self.record.folder_name()
    }
}

/// 日期 -> 薪资周期 + 归档子目录
///
/// 周期窗口为半开区间 `[start, 下一周期 start)`; 最后一个周期的窗口到
/// `final_pull + buffer` 为止. 排班表加载后只读, 可跨线程共享.
#[derive(Debug, Clone)]
pub struct PeriodResolver {
    schedule: Schedule,
    final_pull_buffer: Duration,
}

impl PeriodResolver {
    pub fn new(schedule: Schedule) -> Self {
        Self::with_buffer_days(schedule, DEFAULT_FINAL_PULL_BUFFER_DAYS)
    }

    /// 负数按 0 处理; 超出 `Duration` 表示范围的值视为无限延长
    pub fn with_buffer_days(schedule: Schedule, days: i64) -> Self {
        Self {
            schedule,
            final_pull_buffer: Duration::try_days(days.max(0)).unwrap_or(Duration::MAX),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// 丢弃时刻与时区, 只按日期比较
    pub fn resolve_timestamp<Tz: TimeZone>(
        &self,
        timestamp: &DateTime<Tz>,
    ) -> Result<Resolution<'_>, ResolveError> {
        self.resolve(timestamp.date_naive())
    }

    pub fn resolve(&self, date: NaiveDate) -> Result<Resolution<'_>, ResolveError> {
        let (idx, record) = self
            .schedule
            .records()
            .iter()
            .enumerate()
            .find(|(idx, record)| record.start <= date && date < self.window_end(*idx, record))
            .ok_or(ResolveError::NoActivePeriod { date })?;

        if record.complete {
            return Err(ResolveError::AlreadyComplete {
                id: record.id.clone(),
            });
        }

        // final pull 之后但仍在窗口内的日期归入 InitialPull
        let bucket = if date <= record.final_pull {
            FilingBucket::FinalPull
        } else {
            FilingBucket::InitialPull
        };
        tracing::debug!(
            "date {} -> PP{} (window #{}), bucket {:?}",
            date,
            record.id,
            idx,
            bucket
        );

        Ok(Resolution { record, bucket })
    }

    /// 落地目录模式: 第一个满足 `start <= date <= initial_pull` 的周期.
    /// 不检查完成标记.
    pub fn resolve_pull(
        &self,
        date: NaiveDate,
    ) -> Result<(&PayPeriodRecord, PullDay), ResolveError> {
        self.schedule
            .records()
            .iter()
            .find(|r| r.start <= date && date <= r.initial_pull)
            .map(|r| (r, PullDay::from_date(date)))
            .ok_or(ResolveError::NoActivePeriod { date })
    }

    fn window_end(&self, idx: usize, record: &PayPeriodRecord) -> NaiveDate {
        self.schedule
            .next_start(idx)
            .unwrap_or_else(|| {
                record
                    .final_pull
                    .checked_add_signed(self.final_pull_buffer)
                    .unwrap_or(NaiveDate::MAX)
            })
    }
}
