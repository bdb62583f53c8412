use serde::{Deserialize, Serialize};

use super::fuzz;
use crate::error::HeaderError;
use crate::models::RawGrid;

pub const DEFAULT_HEADER_THRESHOLD: f64 = 80.0;
pub const DEFAULT_SCAN_ROWS: usize = 20;
pub const DEFAULT_FALLBACK_ROW: usize = 14;

/// 扫描范围内没有任何行超过阈值时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderFallback {
    /// 返回 `HeaderError::NotFound`, 调用方放弃该文件
    Fail,
    /// 使用固定行号, 调用方输出警告
    DefaultRow(usize),
}

/// 定位结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderMatch {
    pub row: usize,
    /// 该行的平均得分; 回退时为 None
    pub score: Option<f64>,
}

impl HeaderMatch {
    pub fn is_fallback(&self) -> bool {
        self.score.is_none()
    }
}

/// 在版式不固定的工作表中找表头行
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    threshold: f64,
    scan_rows: usize,
    fallback: HeaderFallback,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HEADER_THRESHOLD,
            scan_rows: DEFAULT_SCAN_ROWS,
            fallback: HeaderFallback::Fail,
        }
    }
}

impl HeaderLocator {
    pub fn new(threshold: f64, fallback: HeaderFallback) -> Self {
        Self {
            threshold,
            fallback,
            ..Self::default()
        }
    }

    pub fn fallback(&self) -> HeaderFallback {
        self.fallback
    }

    /// 第一个平均得分严格大于阈值的行即返回, 不再继续扫描
    pub fn locate(&self, grid: &RawGrid, expected: &[String]) -> Result<HeaderMatch, HeaderError> {
        let scanned = grid.len().min(self.scan_rows);
        if !expected.is_empty() {
            for row in 0..scanned {
                let text = grid.row_text(row);
                if text.is_empty() {
                    continue;
                }
                let total: f64 = expected
                    .iter()
                    .map(|h| fuzz::partial_ratio(h, &text))
                    .sum();
                let avg = total / expected.len() as f64;
                tracing::trace!("header candidate row {}: avg score {:.1}", row, avg);
                if avg > self.threshold {
                    return Ok(HeaderMatch {
                        row,
                        score: Some(avg),
                    });
                }
            }
        }

        match self.fallback {
            HeaderFallback::Fail => Err(HeaderError::NotFound {
                scanned,
                threshold: self.threshold,
            }),
            HeaderFallback::DefaultRow(row) => Ok(HeaderMatch { row, score: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        RawGrid::new(
            rows.iter()
                .map(|r| r.iter().map(|s| CellValue::from(*s)).collect())
                .collect(),
        )
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_finds_header_below_title_rows() {
        let g = grid(&[
            &["Participation Report"],
            &[],
            &["Super Office", "Division", "Time Sheet: Owner Name", "Sum of Hours"],
            &["OBRR", "DBSQC", "Smith, John", "80"],
        ]);
        let m = HeaderLocator::default()
            .locate(&g, &headers(&["Super Office", "Time Sheet: Owner Name", "Sum of Hours"]))
            .unwrap();
        assert_eq!(m.row, 2);
        assert!(!m.is_fallback());
    }

    #[test]
    fn test_first_row_over_threshold_wins() {
        // 第 3 行得分 90, 第 5 行得分 100: 应返回第 3 行
        let g = grid(&[
            &["1234"],
            &["1234"],
            &["1234"],
            &["owner nxme"],
            &["1234"],
            &["owner name"],
        ]);
        let m = HeaderLocator::default()
            .locate(&g, &headers(&["owner name"]))
            .unwrap();
        assert_eq!(m.row, 3);
        assert!((m.score.unwrap() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_threshold_is_strict() {
        let g = grid(&[&["owner nxme"]]);
        let locator = HeaderLocator::new(90.0, HeaderFallback::Fail);
        assert!(locator.locate(&g, &headers(&["owner name"])).is_err());
    }

    #[test]
    fn test_not_found_vs_default_row() {
        let g = grid(&[&["1234"], &["5678"]]);
        let expected = headers(&["Time Sheet: Owner Name"]);

        let err = HeaderLocator::new(80.0, HeaderFallback::Fail)
            .locate(&g, &expected)
            .unwrap_err();
        assert_eq!(
            err,
            HeaderError::NotFound {
                scanned: 2,
                threshold: 80.0
            }
        );

        let m = HeaderLocator::new(80.0, HeaderFallback::DefaultRow(DEFAULT_FALLBACK_ROW))
            .locate(&g, &expected)
            .unwrap();
        assert_eq!(m.row, 14);
        assert!(m.is_fallback());
    }

    #[test]
    fn test_only_first_twenty_rows_are_scanned() {
        let filler: &[&str] = &["1234"];
        let mut rows = vec![filler; 25];
        rows[22] = &["Time Sheet: Owner Name"];
        let g = grid(&rows);
        let err = HeaderLocator::default()
            .locate(&g, &headers(&["Time Sheet: Owner Name"]))
            .unwrap_err();
        assert_eq!(
            err,
            HeaderError::NotFound {
                scanned: 20,
                threshold: 80.0
            }
        );
    }
}
