pub mod inbox;
pub mod result;
pub mod schedule;
pub mod table;

pub use inbox::{Attachment, IncomingItem, ReportType};
pub use result::{MatchStatus, MergeOutcome, MergedRow, Mismatch, NOT_FOUND};
pub use schedule::{FilingBucket, PayPeriodRecord, PeriodId, PullDay, Schedule};
pub use table::{CellValue, RawGrid, ReportTable, Row};
