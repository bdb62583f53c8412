use super::fuzz;
use crate::models::ReportType;

/// 主题分类结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectMatch {
    pub report_type: ReportType,
    pub score: f64,
}

/// 按邮件主题与目标主题的 partial 相似度判断报表类型
#[derive(Debug, Clone)]
pub struct SubjectClassifier {
    targets: Vec<(ReportType, String)>,
    threshold: f64,
}

impl SubjectClassifier {
    pub fn new(hours_subject: &str, employee_ids_subject: &str, threshold: f64) -> Self {
        Self {
            targets: vec![
                (ReportType::Hours, hours_subject.to_string()),
                (ReportType::EmployeeIds, employee_ids_subject.to_string()),
            ],
            threshold,
        }
    }

    /// 按报表类型顺序, 第一个得分 >= 阈值者胜出
    pub fn classify(&self, subject: &str) -> Option<SubjectMatch> {
        self.targets.iter().find_map(|(report_type, target)| {
            let score = fuzz::partial_ratio(target, subject);
            (score >= self.threshold).then_some(SubjectMatch {
                report_type: *report_type,
                score,
            })
        })
    }
}
