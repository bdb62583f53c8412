use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use super::events::EventSink;
use super::header::{HeaderFallback, HeaderLocator, DEFAULT_FALLBACK_ROW};
use super::ingest::file_name;
use super::period::PeriodResolver;
use super::reconciler::ReportReconciler;
use crate::config::AppConfig;
use crate::error::{IngestError, StoreError};
use crate::models::{PeriodId, ReportTable};
use crate::store;

/// 一次扫描的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Merged { pp_id: PeriodId, output: PathBuf },
    MissingReports,
    NoPeriod(String),
    Failed,
}

/// 落地目录扫描: 按文件名日期归档到周期目录, 合并后删除源文件
pub struct LandingSweep {
    resolver: PeriodResolver,
    locator: HeaderLocator,
    reconciler: ReportReconciler,
    landing_zone: PathBuf,
    final_reports_root: PathBuf,
    report1_pattern: String,
    report2_pattern: String,
    report1_headers: Vec<String>,
    report2_headers: Vec<String>,
}

impl LandingSweep {
    pub fn new(config: &AppConfig, resolver: PeriodResolver) -> Self {
        let landing = &config.landing;
        Self {
            resolver,
            locator: HeaderLocator::new(
                f64::from(config.fuzzylogic.header_match_threshold),
                HeaderFallback::DefaultRow(DEFAULT_FALLBACK_ROW),
            ),
            reconciler: ReportReconciler::new(config.landing_merge_spec()),
            landing_zone: landing.landing_zone.clone(),
            final_reports_root: landing.final_reports_root.clone(),
            report1_pattern: landing.report1_pattern.clone(),
            report2_pattern: landing.report2_pattern.clone(),
            report1_headers: landing.report1_headers.clone(),
            report2_headers: landing.report2_headers.clone(),
        }
    }

    pub fn run(&self, sink: &mut dyn EventSink) -> SweepOutcome {
        sink.info(format!("Scanning landing zone: {}", self.landing_zone.display()));

        let (report1, report2) = match self.find_reports() {
            Ok((Some(r1), Some(r2))) => (r1, r2),
            Ok(_) => {
                sink.warn("Did not find both required report files in landing zone.".to_string());
                return SweepOutcome::MissingReports;
            }
            Err(e) => {
                sink.error(format!("ERROR scanning landing zone: {e}"));
                return SweepOutcome::Failed;
            }
        };

        let name = file_name(&report1);
        let Some(date) = report_date(&name) else {
            sink.error(format!("Could not read a report date from '{name}'."));
            return SweepOutcome::Failed;
        };
        let (record, day) = match self.resolver.resolve_pull(date) {
            Ok(found) => found,
            Err(_) => {
                let date = date.format("%Y-%m-%d").to_string();
                sink.error(format!("No Pay Period found for date {date}."));
                return SweepOutcome::NoPeriod(date);
            }
        };

        let destination = self.final_reports_root.join(record.folder_name());
        let output = destination.join(format!(
            "PP{} {} - Participation Data Combined.xlsx",
            record.id,
            day.label()
        ));
        let log_path = destination.join(format!("PP{}_Mismatch_Log.txt", record.id));

        if let Err(e) = self.merge(&report1, &report2, &destination, &output, &log_path, sink) {
            sink.error(format!("ERROR during merge: {e}"));
            return SweepOutcome::Failed;
        }

        for source in [&report1, &report2] {
            if let Err(e) = fs::remove_file(source) {
                sink.warn(format!("Could not remove '{}': {e}", source.display()));
            }
        }
        sink.info("Process complete.".to_string());
        SweepOutcome::Merged {
            pp_id: record.id.clone(),
            output,
        }
    }

    fn find_reports(&self) -> Result<(Option<PathBuf>, Option<PathBuf>), StoreError> {
        Ok((
            self.first_match(&self.report1_pattern)?,
            self.first_match(&self.report2_pattern)?,
        ))
    }

    fn first_match(&self, pattern: &str) -> Result<Option<PathBuf>, StoreError> {
        let full = self.landing_zone.join(pattern);
        let mut paths = glob::glob(&full.to_string_lossy())?;
        Ok(paths.find_map(Result::ok))
    }

    fn merge(
        &self,
        report1: &Path,
        report2: &Path,
        destination: &Path,
        output: &Path,
        log_path: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<(), IngestError> {
        let primary = self.load_table(report1, &self.report1_headers, sink)?;
        let reference = self.load_table(report2, &self.report2_headers, sink)?;
        let outcome = self.reconciler.merge(&primary, &reference)?;

        fs::create_dir_all(destination).map_err(StoreError::from)?;
        store::write_merged(output, &outcome)?;
        sink.info(format!("Successfully created: {}", output.display()));

        if !outcome.mismatches.is_empty() {
            store::write_mismatch_log(log_path, &outcome.mismatches)?;
            sink.info(format!("Mismatch log created: {}", log_path.display()));
        }
        Ok(())
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

/// `2024-01-17_Proxy_Part_Report_Hist_1of2.xlsx` -> 2024-01-17
fn report_date(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.split('_').next()?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
