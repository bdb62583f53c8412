use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::service::fuzz::NameScorer;
use crate::service::header::{HeaderFallback, DEFAULT_FALLBACK_ROW};
use crate::service::reconciler::MergeSpec;

/// 最后一个周期 final pull 之后最多再延长的天数
pub const MAX_FINAL_PULL_BUFFER_DAYS: i64 = 366;

/// 应用配置 (INI 各节; 节名与键名用小写)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub inbox: InboxConfig,
    pub folders: FoldersConfig,
    pub reports: ReportsConfig,
    pub fuzzylogic: FuzzyLogicConfig,
    pub landing: LandingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    pub path: PathBuf,
    pub account: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldersConfig {
    pub root_path: PathBuf,
    pub pay_period_schedule_csv: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    pub report1_subject: String,
    pub report2_subject: String,
    #[serde(deserialize_with = "comma_list")]
    pub report1_headers: Vec<String>,
    #[serde(deserialize_with = "comma_list")]
    pub report2_headers: Vec<String>,
    pub name_column: String,
    pub id_column: String,
    #[serde(deserialize_with = "comma_list")]
    pub output_columns: Vec<String>,
}

/// 表头定位失败时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFallbackMode {
    Error,
    DefaultRow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyLogicConfig {
    pub subject_match_threshold: u8,
    pub name_match_threshold: u8,
    pub header_match_threshold: u8,
    pub header_fallback: HeaderFallbackMode,
    pub header_default_row: usize,
    pub name_scorer: NameScorer,
    pub final_pull_buffer_days: i64,
}

impl FuzzyLogicConfig {
    pub fn header_fallback(&self) -> HeaderFallback {
        match self.header_fallback {
            HeaderFallbackMode::Error => HeaderFallback::Fail,
            HeaderFallbackMode::DefaultRow => HeaderFallback::DefaultRow(self.header_default_row),
        }
    }
}

/// 落地目录模式 (`ppr sweep`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingConfig {
    pub landing_zone: PathBuf,
    pub final_reports_root: PathBuf,
    pub pay_period_schedule: PathBuf,
    pub report1_pattern: String,
    pub report2_pattern: String,
    #[serde(deserialize_with = "comma_list")]
    pub report1_headers: Vec<String>,
    #[serde(deserialize_with = "comma_list")]
    pub report2_headers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").map(PathBuf::from).unwrap_or_default();
        Self {
            inbox: InboxConfig {
                path: PathBuf::from("inbox"),
                account: "reports@localhost".to_string(),
                limit: 200,
            },
            folders: FoldersConfig {
                root_path: PathBuf::from("Pay Periods"),
                pay_period_schedule_csv: PathBuf::from("pay_periods.csv"),
                log_file: PathBuf::from("automation.log"),
            },
            reports: ReportsConfig {
                report1_subject: "Proxy Part Report Hist 1of2".to_string(),
                report2_subject: "Prev Part Report EmpID 2of2".to_string(),
                report1_headers: strings(&[
                    "Super Office",
                    "Division",
                    "Time Sheet: Owner Name",
                    "Sum of Pay Period Number",
                    "Sum of Hours",
                ]),
                report2_headers: strings(&[
                    "Super Office",
                    "Time Sheet: Owner Name",
                    "FDA Employee Number",
                    "Sum of Pay Period Number",
                    "Sum of Hours",
                ]),
                name_column: "Time Sheet: Owner Name".to_string(),
                id_column: "FDA Employee Number".to_string(),
                output_columns: strings(&[
                    "Super Office",
                    "Division",
                    "Time Sheet: Owner Name",
                    "FDA Employee Number",
                    "Sum of Pay Period Number",
                    "Sum of Hours",
                    "Sum of Tour of Duty Hours",
                    "Compliance % by User/ Div/SuperOffice",
                ]),
            },
            fuzzylogic: FuzzyLogicConfig {
                subject_match_threshold: 80,
                name_match_threshold: 85,
                header_match_threshold: 80,
                header_fallback: HeaderFallbackMode::Error,
                header_default_row: DEFAULT_FALLBACK_ROW,
                name_scorer: NameScorer::TokenSet,
                final_pull_buffer_days: 7,
            },
            landing: LandingConfig {
                landing_zone: home.join("Desktop/PayPeriodAttachments"),
                final_reports_root: home.join("Desktop/CBER ITR Participation Clean Up"),
                pay_period_schedule: home.join("PayPeriodAutomation/pay_periods.csv"),
                report1_pattern: "*Proxy_Part_Report_Hist_1of2.xlsx".to_string(),
                report2_pattern: "*Prev_Part_Report_EmpID_2of2.xlsx".to_string(),
                report1_headers: strings(&["Super Office", "Time Sheet: Owner Name", "Sum of Hours"]),
                report2_headers: strings(&[
                    "Time Sheet: Owner Name",
                    "FDA Employee Number",
                    "Sum of Hours",
                ]),
            },
        }
    }
}

impl AppConfig {
    /// 默认值 -> INI 文件 (可缺省) -> `PPR__SECTION__KEY` 环境变量
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini).required(false))
            .add_source(Environment::with_prefix("PPR").prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.fuzzylogic;
        for (key, value) in [
            ("subject_match_threshold", f.subject_match_threshold),
            ("name_match_threshold", f.name_match_threshold),
            ("header_match_threshold", f.header_match_threshold),
        ] {
            if value > 100 {
                return Err(ConfigError::ThresholdOutOfRange {
                    section: "fuzzylogic",
                    key,
                    value,
                });
            }
        }
        if !(0..=MAX_FINAL_PULL_BUFFER_DAYS).contains(&f.final_pull_buffer_days) {
            return Err(ConfigError::BufferOutOfRange {
                section: "fuzzylogic",
                key: "final_pull_buffer_days",
                max: MAX_FINAL_PULL_BUFFER_DAYS,
                value: f.final_pull_buffer_days,
            });
        }
        Ok(())
    }

    /// 收件箱模式的合并参数 (可配置阈值为准)
    pub fn merge_spec(&self) -> MergeSpec {
        MergeSpec {
            name_column: self.reports.name_column.clone(),
            id_column: self.reports.id_column.clone(),
            output_columns: Some(self.reports.output_columns.clone()),
            scorer: self.fuzzylogic.name_scorer,
            threshold: f64::from(self.fuzzylogic.name_match_threshold),
        }
    }

    /// 落地目录模式: 保留主表全部列
    pub fn landing_merge_spec(&self) -> MergeSpec {
        MergeSpec {
            output_columns: None,
            ..self.merge_spec()
        }
    }
}

/// INI 中以逗号分隔的列表; 默认值层传入的是序列
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        Text(String),
    }

    Ok(match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => items,
        ListOrString::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config.fuzzylogic.name_match_threshold, 85);
        assert_eq!(config.fuzzylogic.header_fallback(), HeaderFallback::Fail);
        assert_eq!(config.reports.output_columns.len(), 8);
    }

    #[test]
    fn test_ini_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[fuzzylogic]\n\
             name_match_threshold = 90\n\
             header_fallback = default_row\n\
             name_scorer = partial\n\
             [reports]\n\
             report1_headers = Owner, Hours\n\
             report1_subject = Weekly hours"
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.fuzzylogic.name_match_threshold, 90);
        assert_eq!(config.fuzzylogic.header_fallback(), HeaderFallback::DefaultRow(14));
        assert_eq!(config.fuzzylogic.name_scorer, NameScorer::Partial);
        assert_eq!(config.reports.report1_headers, vec!["Owner", "Hours"]);
        assert_eq!(config.reports.report1_subject, "Weekly hours");
        assert_eq!(config.merge_spec().threshold, 90.0);
        assert!(config.landing_merge_spec().output_columns.is_none());
    }

    #[test]
    fn test_threshold_above_100_is_rejected() {
        let mut config = AppConfig::default();
        config.fuzzylogic.header_match_threshold = 150;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange {
                key: "header_match_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_buffer_days_must_be_in_range() {
        let mut config = AppConfig::default();
        config.fuzzylogic.final_pull_buffer_days = 366;
        assert!(config.validate().is_ok());

        for bad in [-1, 367, 200_000_000] {
            config.fuzzylogic.final_pull_buffer_days = bad;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::BufferOutOfRange { value, .. }) if value == bad
            ));
        }
    }

    #[test]
    fn test_negative_buffer_in_ini_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[fuzzylogic]\nfinal_pull_buffer_days = -30\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::BufferOutOfRange { value: -30, .. })
        ));
    }
}
