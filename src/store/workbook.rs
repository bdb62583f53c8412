use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::models::{CellValue, MergeOutcome, Mismatch, RawGrid};

/// 读取第一个工作表为无表头网格; 行列从 A1 起算 (前导空行 / 空列保留)
pub fn read_grid(path: &Path) -> Result<RawGrid, StoreError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| StoreError::WorkbookRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::EmptyWorkbook(path.to_path_buf()))?
        .map_err(|e| StoreError::WorkbookRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(data_row.iter().map(to_cell));
        rows.push(cells);
    }

    tracing::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(RawGrid::new(rows))
}

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// 写出合并结果: 第一行为列名, 之后每行按输出列顺序
pub fn write_merged(path: &Path, outcome: &MergeOutcome) -> Result<(), StoreError> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in outcome.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (idx, row) in outcome.rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        for (col, name) in outcome.columns.iter().enumerate() {
            let c = col as u16;
            match row.get(name) {
                None | Some(CellValue::Empty) => {}
                Some(CellValue::Text(s)) => {
                    worksheet.write_string(r, c, s)?;
                }
                Some(CellValue::Number(n)) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Some(CellValue::Bool(b)) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Some(CellValue::DateTime(dt)) => {
                    worksheet.write_datetime_with_format(r, c, dt, &date_format)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// 一行一条; 调用方只在存在不匹配时写出
pub fn write_mismatch_log(path: &Path, mismatches: &[Mismatch]) -> Result<(), StoreError> {
    let body = mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchStatus, MergedRow, Row};

    #[test]
    fn test_read_grid_keeps_absolute_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(2, 1, "Time Sheet: Owner Name").unwrap();
        ws.write_string(2, 2, "Sum of Hours").unwrap();
        ws.write_string(3, 1, "Smith, John").unwrap();
        ws.write_number(3, 2, 80.0).unwrap();
        wb.save(&path).unwrap();

        let grid = read_grid(&path).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.row_text(0), "");
        assert_eq!(grid.row_text(2), "Time Sheet: Owner Name Sum of Hours");

        let table = grid.with_header(2);
        assert_eq!(table.columns(), &["Unnamed: 0", "Time Sheet: Owner Name", "Sum of Hours"]);
        assert_eq!(table.rows()[0]["Sum of Hours"], CellValue::Number(80.0));
    }

    #[test]
    fn test_write_merged_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.xlsx");

        let mut values = Row::new();
        values.insert("Name".to_string(), CellValue::from("Doe, Jane"));
        values.insert("ID".to_string(), CellValue::from("NOT FOUND"));
        values.insert("Hours".to_string(), CellValue::Number(7.5));
        let outcome = MergeOutcome {
            columns: vec!["Name".into(), "Hours".into(), "ID".into()],
            rows: vec![MergedRow {
                values,
                status: MatchStatus::Unresolved,
            }],
            mismatches: vec![],
        };
        write_merged(&path, &outcome).unwrap();

        let grid = read_grid(&path).unwrap();
        assert_eq!(grid.row_text(0), "Name Hours ID");
        assert_eq!(grid.row_text(1), "Doe, Jane 7.5 NOT FOUND");
    }

    #[test]
    fn test_mismatch_log_one_line_per_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mismatches = vec![
            Mismatch { name: "A".into() },
            Mismatch { name: "B".into() },
        ];
        write_mismatch_log(&path, &mismatches).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "No matching Employee ID found for: 'A'",
                "No matching Employee ID found for: 'B'"
            ]
        );
    }
}
