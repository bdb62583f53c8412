use chrono::Local;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::classify::SubjectClassifier;
use super::events::EventSink;
use super::header::HeaderLocator;
use super::period::PeriodResolver;
use super::reconciler::ReportReconciler;
use crate::config::AppConfig;
use crate::error::{IngestError, StoreError};
use crate::models::{IncomingItem, PeriodId, ReportTable, ReportType};
use crate::store::{self, MessageSource};

/// 已下载到本地的一份报表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundReport {
    pub report_type: ReportType,
    pub path: PathBuf,
}

/// 一次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped_items: usize,
    pub merged_periods: Vec<PeriodId>,
    pub failed_periods: Vec<PeriodId>,
}

/// 收件箱 -> 周期目录 -> 合并报表
pub struct IngestionOrchestrator {
    resolver: PeriodResolver,
    classifier: SubjectClassifier,
    locator: HeaderLocator,
    reconciler: ReportReconciler,
    root: PathBuf,
    fetch_limit: usize,
    report1_headers: Vec<String>,
    report2_headers: Vec<String>,
}

impl IngestionOrchestrator {
    pub fn new(config: &AppConfig, resolver: PeriodResolver) -> Self {
        let fuzzy = &config.fuzzylogic;
        Self {
            resolver,
            classifier: SubjectClassifier::new(
                &config.reports.report1_subject,
                &config.reports.report2_subject,
                f64::from(fuzzy.subject_match_threshold),
            ),
            locator: HeaderLocator::new(f64::from(fuzzy.header_match_threshold), fuzzy.header_fallback()),
            reconciler: ReportReconciler::new(config.merge_spec()),
            root: config.folders.root_path.clone(),
            fetch_limit: config.inbox.limit,
            report1_headers: config.reports.report1_headers.clone(),
            report2_headers: config.reports.report2_headers.clone(),
        }
    }

    /// 完整运行; 只有连接 / 拉取失败会提前结束, 并以错误消息告知.
    /// 单封邮件或单个周期的失败只影响其自身.
    pub fn run(&self, source: &mut dyn MessageSource, sink: &mut dyn EventSink) -> RunSummary {
        let mut summary = RunSummary::default();
        if let Err(e) = self.run_inner(source, sink, &mut summary) {
            sink.error(format!("An unexpected error occurred: {e}"));
        }
        summary
    }

    fn run_inner(
        &self,
        source: &mut dyn MessageSource,
        sink: &mut dyn EventSink,
        summary: &mut RunSummary,
    ) -> Result<(), StoreError> {
        let account = source.connect()?;
        sink.info(format!("Successfully connected to {account}."));

        sink.info("Searching inbox for report emails...".to_string());
        let items = source.recent(self.fetch_limit)?;

        let mut found: IndexMap<PeriodId, Vec<FoundReport>> = IndexMap::new();
        for item in &items {
            if let Err(e) = self.ingest_item(item, sink, &mut found, summary) {
                sink.error(format!("Failed to save attachment from '{}': {e}", item.subject));
                summary.skipped_items += 1;
            }
        }

        if found.is_empty() {
            sink.info("No new reports found in recent emails.".to_string());
        } else {
            self.process_found(&found, sink, summary);
        }
        sink.info("Automation run complete.".to_string());
        Ok(())
    }

    fn ingest_item(
        &self,
        item: &IncomingItem,
        sink: &mut dyn EventSink,
        found: &mut IndexMap<PeriodId, Vec<FoundReport>>,
        summary: &mut RunSummary,
    ) -> Result<(), StoreError> {
        let Some(matched) = self.classifier.classify(&item.subject) else {
            return Ok(());
        };
        sink.info(format!(
            "Found potential match (Score: {:.0}%): '{}'",
            matched.score, item.subject
        ));

        let received = item.received.with_timezone(&Local);
        let resolution = match self.resolver.resolve_timestamp(&received) {
            Ok(resolution) => resolution,
            Err(e) => {
                sink.warn(format!("Skipping email '{}': {e}", item.subject));
                summary.skipped_items += 1;
                return Ok(());
            }
        };
        let record = resolution.record;
        sink.info(format!(
            "Matched '{}' to pay period {} ({}).",
            item.subject,
            record.id,
            resolution.bucket
        ));

        let Some(attachment) = item.attachments.iter().find(|a| a.is_spreadsheet()) else {
            return Ok(());
        };

        let save_dir = self
            .root
            .join(resolution.folder_name())
            .join(resolution.bucket.folder_name());
        fs::create_dir_all(&save_dir)?;
        let path = save_dir.join(&attachment.name);
        fs::write(&path, &attachment.content)?;
        summary.downloaded += 1;
        sink.info(format!(
            "Downloaded '{}' to '{}'.",
            attachment.name,
            resolution.bucket.folder_name()
        ));

        let reports = found.entry(record.id.clone()).or_default();
        if !reports.iter().any(|r| r.report_type == matched.report_type) {
            reports.push(FoundReport {
                report_type: matched.report_type,
                path,
            });
        }
        Ok(())
    }

    fn process_found(
        &self,
        found: &IndexMap<PeriodId, Vec<FoundReport>>,
        sink: &mut dyn EventSink,
        summary: &mut RunSummary,
    ) {
        sink.info("Starting file processing and merging...".to_string());
        for (pp_id, reports) in found {
            let hours = reports.iter().find(|r| r.report_type == ReportType::Hours);
            let ids = reports.iter().find(|r| r.report_type == ReportType::EmployeeIds);
            let (Some(hours), Some(ids)) = (hours, ids) else {
                sink.warn(format!(
                    "Skipping merge for PP {pp_id}: did not find both reports."
                ));
                continue;
            };

            sink.info(format!(
                "Found both reports for Pay Period {pp_id}. Starting merge."
            ));
            match self.merge_period(pp_id, &hours.path, &ids.path, sink) {
                Ok(true) => summary.merged_periods.push(pp_id.clone()),
                Ok(false) => summary.failed_periods.push(pp_id.clone()),
                Err(e) => {
                    sink.error(format!("ERROR merging reports for PP {pp_id}: {e}"));
                    summary.failed_periods.push(pp_id.clone());
                }
            }
        }
    }

    /// 返回 false 表示因找不到表头而跳过
    fn merge_period(
        &self,
        pp_id: &PeriodId,
        hours_path: &Path,
        ids_path: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<bool, IngestError> {
        // 周期目录 = 附件所在子目录的上一级
        let pp_folder = hours_path
            .parent()
            .and_then(Path::parent)
            .unwrap_or(self.root.as_path())
            .to_path_buf();

        let primary = match self.load_table(hours_path, &self.report1_headers, sink) {
            Err(IngestError::Header { file, .. }) => {
                sink.error(format!("Could not find header row in {file}"));
                return Ok(false);
            }
            other => other?,
        };
        let reference = match self.load_table(ids_path, &self.report2_headers, sink) {
            Err(IngestError::Header { file, .. }) => {
                sink.error(format!("Could not find header row in {file}"));
                return Ok(false);
            }
            other => other?,
        };

        let outcome = self.reconciler.merge(&primary, &reference)?;

        let output = pp_folder.join(format!("PP{pp_id} - Combined Report.xlsx"));
        store::write_merged(&output, &outcome)?;
        sink.info(format!(
            "Successfully created combined report: {}",
            output.display()
        ));

        if !outcome.mismatches.is_empty() {
            let log_path = pp_folder.join(format!("PP{pp_id} - Mismatch_Log.txt"));
            store::write_mismatch_log(&log_path, &outcome.mismatches)?;
            sink.info(format!("Mismatch log created: {}", log_path.display()));
        }
        Ok(true)
    }

    fn load_table(
        &self,
        path: &Path,
        expected: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<ReportTable, IngestError> {
        let grid = store::read_grid(path)?;
        let file = file_name(path);
        let header = self
            .locator
            .locate(&grid, expected)
            .map_err(|source| IngestError::Header {
                file: file.clone(),
                source,
            })?;
        if header.is_fallback() {
            sink.warn(format!(
                "No header row matched in {file}; using default row {}.",
                header.row
            ));
        }
        Ok(grid.with_header(header.row))
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
