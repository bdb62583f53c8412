use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 邮件附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// `.xlsx` / `.xls` (不区分大小写)
    pub fn is_spreadsheet(&self) -> bool {
        let lower = self.name.to_lowercase();
        lower.ends_with(".xlsx") || lower.ends_with(".xls")
    }
}

/// 收件箱中的一封邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingItem {
    pub subject: String,
    pub received: DateTime<FixedOffset>,
    pub attachments: Vec<Attachment>,
}

/// 两种报表类型: 工时报表 (无员工编号) 与员工编号报表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportType {
    Hours,
    EmployeeIds,
}

impl ReportType {
    pub const ALL: [ReportType; 2] = [ReportType::Hours, ReportType::EmployeeIds];

    pub fn number(self) -> u8 {
        match self {
            ReportType::Hours => 1,
            ReportType::EmployeeIds => 2,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "report {}", self.number())
    }
}
