use crate::utils::error::{GstError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Excel 單一工作表上限（含標題列）
pub const EXCEL_MAX_ROWS: usize = 1_048_576;
pub const EXCEL_MAX_COLUMNS: usize = 16_384;
pub const EXCEL_MAX_SHEET_NAME_LEN: usize = 31;
/// 單一儲存格文字長度上限（字元數）
pub const EXCEL_MAX_CELL_TEXT_LEN: usize = 32_767;

/// 攤平後的一筆紀錄：欄位名稱 → 純量值，保留插入順序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub data: Map<String, Value>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.data.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.data.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for FlatRecord {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// 無法解析的日期：寫出時留白，計入診斷
    InvalidDate(String),
}

impl CellValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            Value::String(s) => CellValue::Text(s.clone()),
            // 結構值以 JSON 文字呈現
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 純文字呈現，供 CSV 輸出使用
    pub fn to_plain_string(&self) -> String {
        match self {
            CellValue::Empty | CellValue::InvalidDate(_) => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// 單一工作表：標題列 + 資料列，每列長度必須等於標題欄數
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: String,
    pub header: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(sheet_name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            header,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(GstError::TableShapeError {
                sheet: self.sheet_name.clone(),
                expected: self.header.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<CellValue>] {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    /// 依欄位名稱取值（測試與診斷用）
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }
}

/// 記憶體中的活頁簿：依序排列的工作表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Table>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table) {
        self.sheets.push(table);
    }

    pub fn sheets(&self) -> &[Table] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|table| table.sheet_name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|t| t.sheet_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// 單一文件轉換的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Idle,
    BasicInfoExtracted,
    SectionsProcessed,
    WorkbookAssembled,
    Written,
    Failed,
}

/// transform 階段的產物
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub workbook: Workbook,
    pub warnings: Vec<String>,
    pub skipped_sections: Vec<String>,
    pub invalid_dates: usize,
    pub stage: ConversionStage,
}

/// load 階段的產物
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub sheet_count: usize,
    pub row_count: usize,
    pub warnings: Vec<String>,
    pub stage: ConversionStage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileResult {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub success: bool,
    pub message: String,
    pub warnings: Vec<String>,
}

impl FileResult {
    pub fn succeeded(source: PathBuf, summary: ConversionSummary) -> Self {
        let message = format!(
            "Successfully converted {} to {}",
            source.display(),
            summary.output.display()
        );
        Self {
            source,
            output: Some(summary.output),
            success: true,
            message,
            warnings: summary.warnings,
        }
    }

    pub fn failed(source: PathBuf, message: impl Into<String>) -> Self {
        Self {
            source,
            output: None,
            success: false,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    /// `(success, message)` 形式的結果
    pub fn outcome(&self) -> (bool, &str) {
        (self.success, &self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub success: bool,
    pub message: String,
    pub per_file: Vec<FileResult>,
}

impl ConversionReport {
    pub fn from_results(per_file: Vec<FileResult>) -> Self {
        let total = per_file.len();
        let converted = per_file.iter().filter(|r| r.success).count();
        Self {
            success: total > 0 && converted == total,
            message: format!("{}/{} converted", converted, total),
            per_file,
        }
    }

    pub fn converted(&self) -> usize {
        self.per_file.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.per_file.len() - self.converted()
    }

    pub fn total(&self) -> usize {
        self.per_file.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_row_enforces_header_width() {
        let mut table = Table::new("B2B", vec!["a".to_string(), "b".to_string()]);
        assert!(table.push_row(vec![CellValue::Empty, CellValue::Number(1.0)]).is_ok());

        let err = table.push_row(vec![CellValue::Empty]).unwrap_err();
        assert!(matches!(
            err,
            GstError::TableShapeError {
                expected: 2,
                actual: 1,
                ..
            }
        ));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_cell_value_from_json() {
        assert_eq!(CellValue::from_json(&json!(null)), CellValue::Empty);
        assert_eq!(CellValue::from_json(&json!(18)), CellValue::Number(18.0));
        assert_eq!(CellValue::from_json(&json!("P1")), CellValue::Text("P1".into()));
        assert_eq!(CellValue::from_json(&json!(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_plain_string_rendering() {
        assert_eq!(CellValue::Number(100.0).to_plain_string(), "100");
        assert_eq!(CellValue::Number(12.5).to_plain_string(), "12.5");
        assert_eq!(CellValue::InvalidDate("99-99-2024".into()).to_plain_string(), "");
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(CellValue::Date(date).to_plain_string(), "2024-01-31");
    }

    #[test]
    fn test_report_counts() {
        let ok = FileResult {
            source: PathBuf::from("a.json"),
            output: Some(PathBuf::from("a.xlsx")),
            success: true,
            message: "ok".into(),
            warnings: vec![],
        };
        let bad = FileResult::failed(PathBuf::from("b.json"), "broken");

        let report = ConversionReport::from_results(vec![ok.clone(), bad, ok]);
        assert!(!report.success);
        assert_eq!(report.message, "2/3 converted");
        assert_eq!(report.failed(), 1);

        let empty = ConversionReport::from_results(vec![]);
        assert!(!empty.success);
    }
}
