use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// 单元格值
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            // 整数不带小数位
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// 无表头的原始网格, 行号即工作表中的绝对行号 (0 起)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<CellValue>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&[CellValue]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// 非空单元格以单个空格拼接 (表头打分用)
    pub fn row_text(&self, idx: usize) -> String {
        self.row(idx)
            .unwrap_or_default()
            .iter()
            .filter(|c| !c.is_blank())
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 以 `header_row` 为表头构建具名表; 表头之后的全空行被丢弃
    pub fn with_header(&self, header_row: usize) -> ReportTable {
        let Some(header) = self.rows.get(header_row) else {
            return ReportTable::default();
        };
        let width = self.rows[header_row..]
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut seen: HashMap<String, usize> = HashMap::new();
        let columns: Vec<String> = (0..width)
            .map(|col| {
                let raw = header
                    .get(col)
                    .map(|c| c.to_string().trim().to_string())
                    .unwrap_or_default();
                let base = if raw.is_empty() {
                    format!("Unnamed: {col}")
                } else {
                    raw
                };
                // 重名列追加 .1 / .2 后缀
                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base
                } else {
                    format!("{base}.{count}")
                };
                *count += 1;
                name
            })
            .collect();

        let rows = self.rows[header_row + 1..]
            .iter()
            .filter(|cells| cells.iter().any(|c| !c.is_blank()))
            .map(|cells| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(col, name)| (name.clone(), cells.get(col).cloned().unwrap_or_default()))
                    .collect::<Row>()
            })
            .collect();

        ReportTable { columns, rows }
    }
}

/// 列名 -> 值, 保持列顺序
pub type Row = IndexMap<String, CellValue>;

/// 已定位表头的具名表; 列名已去除首尾空白
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ReportTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let columns = columns.into_iter().map(|c| c.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (k.trim().to_string(), v))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}
