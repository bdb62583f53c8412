use crate::error::ReconcileError;
use crate::models::{CellValue, MatchStatus, MergeOutcome, MergedRow, Mismatch, ReportTable, Row, NOT_FOUND};

use super::fuzz::NameScorer;

/// 合并参数: 姓名列 / 标识列 / 输出列白名单 / 打分函数 / 阈值
#[derive(Debug, Clone)]
pub struct MergeSpec {
    pub name_column: String,
    pub id_column: String,
    /// None: 输出主表全部列 + 标识列
    pub output_columns: Option<Vec<String>>,
    pub scorer: NameScorer,
    /// 0-100, 候选得分需 >= 该值
    pub threshold: f64,
}

/// 参考表中的一个候选
#[derive(Debug, Clone)]
struct NameMatchCandidate<'a> {
    name: String,
    row: &'a Row,
}

/// 按姓名模糊匹配, 把参考表的标识列并入主表
#[derive(Debug, Clone)]
pub struct ReportReconciler {
    spec: MergeSpec,
}

impl ReportReconciler {
    pub fn new(spec: MergeSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &MergeSpec {
        &self.spec
    }

    /// 主表按原顺序遍历; 姓名为空的行直接跳过 (不合并也不记日志).
    /// 输入表不会被修改.
    pub fn merge(
        &self,
        primary: &ReportTable,
        reference: &ReportTable,
    ) -> Result<MergeOutcome, ReconcileError> {
        let spec = &self.spec;
        require_column(primary, "primary", &spec.name_column)?;
        require_column(reference, "reference", &spec.name_column)?;
        require_column(reference, "reference", &spec.id_column)?;

        let candidates: Vec<NameMatchCandidate<'_>> = reference
            .rows()
            .iter()
            .filter_map(|row| {
                let name = row.get(&spec.name_column)?;
                (!name.is_blank()).then(|| NameMatchCandidate {
                    name: name.to_string(),
                    row,
                })
            })
            .collect();

        let mut rows = Vec::with_capacity(primary.len());
        let mut mismatches = Vec::new();

        for row in primary.rows() {
            let Some(name) = row.get(&spec.name_column).filter(|v| !v.is_blank()) else {
                continue;
            };
            let name = name.to_string();

            let mut values = row.clone();
            let status = match self.best_match(&name, &candidates) {
                Some((candidate, score)) => {
                    let id = candidate
                        .row
                        .get(&spec.id_column)
                        .cloned()
                        .unwrap_or_default();
                    values.insert(spec.id_column.clone(), id);
                    MatchStatus::Matched {
                        candidate: candidate.name.clone(),
                        score,
                    }
                }
                None => {
                    values.insert(spec.id_column.clone(), CellValue::from(NOT_FOUND));
                    mismatches.push(Mismatch { name: name.clone() });
                    MatchStatus::Unresolved
                }
            };
            rows.push(MergedRow { values, status });
        }

        let columns = self.output_columns(primary);
        for row in &mut rows {
            row.values.retain(|k, _| columns.contains(k));
        }

        tracing::debug!(
            "merged {} rows ({} unresolved) against {} candidates",
            rows.len(),
            mismatches.len(),
            candidates.len()
        );

        Ok(MergeOutcome {
            columns,
            rows,
            mismatches,
        })
    }

    /// 单个得分最高者; 同分时参考表中靠前者胜出
    fn best_match<'c, 'a>(
        &self,
        name: &str,
        candidates: &'c [NameMatchCandidate<'a>],
    ) -> Option<(&'c NameMatchCandidate<'a>, f64)> {
        let mut best: Option<(&NameMatchCandidate<'a>, f64)> = None;
        for candidate in candidates {
            let score = self.spec.scorer.score(name, &candidate.name);
            if score < self.spec.threshold {
                continue;
            }
            let is_better = match best {
                None => true,
                Some((_, best_score)) => score > best_score,
            };
            if is_better {
                best = Some((candidate, score));
            }
        }
        best
    }

    /// 白名单 ∩ 合并后实际存在的列 (白名单顺序); 无白名单时为主表列 + 标识列
    fn output_columns(&self, primary: &ReportTable) -> Vec<String> {
        let spec = &self.spec;
        let present = |col: &str| col == spec.id_column || primary.has_column(col);
        match &spec.output_columns {
            Some(allow) => allow.iter().filter(|c| present(c)).cloned().collect(),
            None => {
                let mut cols: Vec<String> = primary.columns().to_vec();
                if !cols.contains(&spec.id_column) {
                    cols.push(spec.id_column.clone());
                }
                cols
            }
        }
    }
}

fn require_column(
    table: &ReportTable,
    label: &'static str,
    column: &str,
) -> Result<(), ReconcileError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(ReconcileError::MissingColumn {
            table: label,
            column: column.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "Time Sheet: Owner Name";
    const ID: &str = "FDA Employee Number";

    fn table(columns: &[&str], rows: &[&[CellValue]]) -> ReportTable {
        let cols: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| cols.iter().cloned().zip(cells.iter().cloned()).collect())
            .collect();
        ReportTable::new(cols, rows)
    }

    fn t(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn spec(threshold: f64) -> MergeSpec {
        MergeSpec {
            name_column: NAME.to_string(),
            id_column: ID.to_string(),
            output_columns: Some(
                ["Super Office", NAME, ID, "Sum of Hours"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            scorer: NameScorer::TokenSet,
            threshold,
        }
    }

    fn reference() -> ReportTable {
        table(
            &[NAME, ID, "Sum of Hours"],
            &[
                &[t("John Smith"), t("1001"), CellValue::Number(80.0)],
                &[t("Jane Doe"), t("1002"), CellValue::Number(72.0)],
            ],
        )
    }

    #[test]
    fn test_last_first_matches_first_last() {
        let primary = table(
            &["Super Office", NAME, "Sum of Hours"],
            &[&[t("OBRR"), t("Smith, John"), CellValue::Number(80.0)]],
        );
        let out = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap();

        assert!(out.mismatches.is_empty());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].get(ID), Some(&t("1001")));
        assert!(out.rows[0].is_matched());
    }

    #[test]
    fn test_partial_scorer_misses_reordered_names() {
        let primary = table(&[NAME], &[&[t("Smith, John")], &[t("Jane Doe")]]);

        let mut partial = spec(85.0);
        partial.scorer = NameScorer::Partial;
        let out = ReportReconciler::new(partial)
            .merge(&primary, &reference())
            .unwrap();
        // "smith john" 对 "john smith" 的 partial 得分约 67
        assert_eq!(out.rows[0].get(ID), Some(&t(NOT_FOUND)));
        assert_eq!(out.rows[1].get(ID), Some(&t("1002")));
        assert_eq!(
            out.mismatches,
            vec![Mismatch {
                name: "Smith, John".to_string()
            }]
        );

        let token_set = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap();
        assert_eq!(token_set.rows[0].get(ID), Some(&t("1001")));
        assert!(token_set.mismatches.is_empty());
    }

    #[test]
    fn test_typo_respects_threshold() {
        let primary = table(&[NAME], &[&[t("Smith, Jon")]]);

        let lenient = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap();
        assert_eq!(lenient.rows[0].get(ID), Some(&t("1001")));

        let strict = ReportReconciler::new(spec(99.0))
            .merge(&primary, &reference())
            .unwrap();
        assert_eq!(strict.rows[0].get(ID), Some(&t(NOT_FOUND)));
        assert_eq!(strict.rows[0].status, MatchStatus::Unresolved);
        assert_eq!(
            strict.mismatches,
            vec![Mismatch {
                name: "Smith, Jon".to_string()
            }]
        );
        assert_eq!(
            strict.mismatches[0].to_string(),
            "No matching Employee ID found for: 'Smith, Jon'"
        );
    }

    #[test]
    fn test_blank_names_are_skipped_silently() {
        let primary = table(
            &[NAME, "Sum of Hours"],
            &[
                &[t("Doe, Jane"), CellValue::Number(1.0)],
                &[CellValue::Empty, CellValue::Number(2.0)],
                &[t("   "), CellValue::Number(3.0)],
                &[t("Nobody, Known"), CellValue::Number(4.0)],
            ],
        );
        let out = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap();

        let names: Vec<String> = out.rows.iter().map(|r| r.values[NAME].to_string()).collect();
        assert_eq!(names, vec!["Doe, Jane", "Nobody, Known"]);
        assert_eq!(out.mismatches.len(), 1);
        assert_eq!(out.matched_count(), 1);
    }

    #[test]
    fn test_tie_goes_to_first_reference_row() {
        let reference = table(
            &[NAME, ID],
            &[
                &[t("John Smith"), t("first")],
                &[t("Smith John"), t("second")],
            ],
        );
        let primary = table(&[NAME], &[&[t("Smith, John")]]);
        let out = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference)
            .unwrap();
        assert_eq!(out.rows[0].get(ID), Some(&t("first")));
    }

    #[test]
    fn test_output_columns_follow_allow_list() {
        let primary = table(
            &["Extra", "Sum of Hours", NAME, "Super Office"],
            &[&[t("x"), CellValue::Number(8.0), t("Jane Doe"), t("OBRR")]],
        );
        let out = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap();

        assert_eq!(out.columns, vec!["Super Office", NAME, ID, "Sum of Hours"]);
        assert!(out.rows[0].get("Extra").is_none());
        let keys: Vec<&String> = out.rows[0].values.keys().collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_without_allow_list_keeps_primary_columns() {
        let mut s = spec(85.0);
        s.output_columns = None;
        let primary = table(&["Extra", NAME], &[&[t("x"), t("Jane Doe")]]);
        let out = ReportReconciler::new(s).merge(&primary, &reference()).unwrap();
        assert_eq!(out.columns, vec!["Extra", NAME, ID]);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let primary = table(
            &[NAME],
            &[&[t("Smith, John")], &[t("Doe, J")], &[t("Unknown Person")]],
        );
        let reconciler = ReportReconciler::new(spec(85.0));
        let first = reconciler.merge(&primary, &reference()).unwrap();
        let second = reconciler.merge(&primary, &reference()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_name_column_is_an_error() {
        let primary = table(&["Owner"], &[&[t("Smith, John")]]);
        let err = ReportReconciler::new(spec(85.0))
            .merge(&primary, &reference())
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MissingColumn {
                table: "primary",
                column: NAME.to_string()
            }
        );
    }
}
