use crate::domain::model::{CellValue, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// 未指定格式時依序嘗試的日期格式
pub const INFERRED_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%Y/%m/%d",
];

const INFERRED_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 日期欄位轉換：先試設定的格式，再試推斷格式；失敗的儲存格標記為無效
#[derive(Debug, Clone, Default)]
pub struct DateCoercion {
    explicit_formats: Vec<String>,
}

impl DateCoercion {
    pub fn new(explicit_formats: Vec<String>) -> Self {
        Self { explicit_formats }
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();

        for format in &self.explicit_formats {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Some(date);
            }
            if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(datetime.date());
            }
        }

        INFERRED_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
            .or_else(|| {
                INFERRED_DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                    .map(|dt| dt.date())
            })
    }

    /// 數值與布林值不視為日期
    pub fn coerce_cell(&self, cell: &CellValue) -> CellValue {
        match cell {
            CellValue::Empty => CellValue::Empty,
            CellValue::Date(date) => CellValue::Date(*date),
            CellValue::InvalidDate(raw) => CellValue::InvalidDate(raw.clone()),
            CellValue::Text(text) if text.trim().is_empty() => CellValue::Empty,
            CellValue::Text(text) => self
                .parse(text)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::InvalidDate(text.clone())),
            CellValue::Number(n) => CellValue::InvalidDate(n.to_string()),
            CellValue::Bool(b) => CellValue::InvalidDate(b.to_string()),
        }
    }

    /// 轉換表格中存在的日期欄位，回傳無效日期的數量
    pub fn apply(&self, table: &mut Table, columns: &[String]) -> usize {
        let indexes: Vec<usize> = columns
            .iter()
            .filter_map(|column| table.column_index(column))
            .collect();
        if indexes.is_empty() {
            return 0;
        }

        let mut invalid = 0;
        for row in table.rows_mut() {
            for &index in &indexes {
                let coerced = self.coerce_cell(&row[index]);
                if matches!(coerced, CellValue::InvalidDate(_)) {
                    invalid += 1;
                }
                row[index] = coerced;
            }
        }
        invalid
    }
}
