use crate::config::app_config::{ConversionOptions, SheetLayout};
use crate::config::section_config::{ExtractionStrategy, PathMetaRule, SectionRule};
use crate::core::coerce::DateCoercion;
use crate::core::{fixed_shape, flatten::flatten, shape::shape};
use crate::domain::model::{
    CellValue, FlatRecord, Table, EXCEL_MAX_CELL_TEXT_LEN, EXCEL_MAX_COLUMNS, EXCEL_MAX_ROWS,
};
use crate::utils::error::{GstError, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 文件中沒有此區段
    Absent,
    /// null、空陣列、空物件或空字串
    Empty,
    /// 攤平後沒有任何資料列
    NoRows,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Produced { table: Table, invalid_dates: usize },
    Skipped(SkipReason),
}

/// 單一區段的處理：取出、攤平、整形、日期轉換
#[derive(Debug, Clone)]
pub struct SectionProcessor {
    dates: DateCoercion,
    default_date_columns: Vec<String>,
    layout: SheetLayout,
}

impl SectionProcessor {
    pub fn new(options: &ConversionOptions) -> Self {
        Self {
            dates: DateCoercion::new(options.date_formats.clone()),
            default_date_columns: options.date_columns.clone(),
            layout: options.layout,
        }
    }

    /// 區段不存在或為空時回傳 `Skipped`，不視為錯誤；
    /// 其他失敗一律包成 `SectionError`
    pub fn process(&self, document: &Value, rule: &SectionRule) -> Result<SectionOutcome> {
        let section = match document.get(&rule.section_key) {
            None => return Ok(SectionOutcome::Skipped(SkipReason::Absent)),
            Some(section) if is_empty_value(section) => {
                return Ok(SectionOutcome::Skipped(SkipReason::Empty))
            }
            Some(section) => section,
        };

        let records = extract_records(section, &rule.strategy);
        tracing::debug!(
            "🔄 Section '{}' ({}) yielded {} records",
            rule.section_key,
            rule.strategy.name(),
            records.len()
        );

        let mut table = shape(&records, &rule.rename, &rule.column_order, &rule.sheet_name)
            .map_err(|e| section_error(rule, e))?;

        if table.row_count() == 0 {
            return Ok(SectionOutcome::Skipped(SkipReason::NoRows));
        }

        self.check_sheet_limits(rule, &table)?;

        let date_columns = rule.date_columns.as_ref().unwrap_or(&self.default_date_columns);
        let invalid_dates = self.dates.apply(&mut table, date_columns);
        if invalid_dates > 0 {
            tracing::debug!(
                "⚠️ Section '{}' has {} unparsable dates",
                rule.section_key,
                invalid_dates
            );
        }

        if let Some(column) = overlong_text_column(&table) {
            return Err(GstError::SectionError {
                section: rule.section_key.clone(),
                message: format!(
                    "column '{}' has text longer than the {} character cell limit",
                    column, EXCEL_MAX_CELL_TEXT_LEN
                ),
            });
        }

        Ok(SectionOutcome::Produced {
            table,
            invalid_dates,
        })
    }

    /// 表格加上寫出偏移後必須落在 Excel 工作表範圍內
    fn check_sheet_limits(&self, rule: &SectionRule, table: &Table) -> Result<()> {
        let rows_needed = self.layout.start_row as usize + 1 + table.row_count();
        let columns_needed = self.layout.start_col as usize + table.column_count();
        if rows_needed > EXCEL_MAX_ROWS || columns_needed > EXCEL_MAX_COLUMNS {
            return Err(GstError::SectionError {
                section: rule.section_key.clone(),
                message: format!(
                    "{} rows x {} columns starting at row {}, column {} exceeds the spreadsheet limit of {} rows x {} columns",
                    table.row_count() + 1,
                    table.column_count(),
                    self.layout.start_row,
                    self.layout.start_col,
                    EXCEL_MAX_ROWS,
                    EXCEL_MAX_COLUMNS
                ),
            });
        }
        Ok(())
    }
}

/// 第一個超過儲存格文字上限的欄位（含標題）
fn overlong_text_column(table: &Table) -> Option<&str> {
    let too_long = |text: &str| text.chars().count() > EXCEL_MAX_CELL_TEXT_LEN;

    if let Some(column) = table.header.iter().find(|column| too_long(column.as_str())) {
        return Some(column.as_str());
    }
    table.rows().iter().find_map(|row| {
        row.iter().zip(&table.header).find_map(|(cell, column)| match cell {
            CellValue::Text(text) if too_long(text.as_str()) => Some(column.as_str()),
            _ => None,
        })
    })
}

fn extract_records(section: &Value, strategy: &ExtractionStrategy) -> Vec<FlatRecord> {
    match strategy {
        ExtractionStrategy::PathMeta(rule) => flatten(section, rule),
        ExtractionStrategy::SimpleTable => flatten(section, &PathMetaRule::default()),
        ExtractionStrategy::FixedShape(shape) => fixed_shape::extract(shape, section),
    }
}

fn section_error(rule: &SectionRule, error: GstError) -> GstError {
    match error {
        GstError::SectionError { .. } => error,
        other => GstError::SectionError {
            section: rule.section_key.clone(),
            message: other.to_string(),
        },
    }
}

pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::section_config::{MetaField, PathStep};
    use chrono::NaiveDate;
    use serde_json::json;

    fn key(name: &str) -> PathStep {
        PathStep::Key(name.to_string())
    }

    fn b2b_rule() -> SectionRule {
        let rename = [
            ("inum", "invoice_or_note_number"),
            ("nt_num", "invoice_or_note_number"),
            ("idt", "date"),
            ("nt_dt", "date"),
            ("val", "total_value"),
            ("num", "item_number"),
            ("itm_det.txval", "taxable_value"),
            ("itm_det.rt", "rate"),
            ("itm_det.iamt", "igst"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        SectionRule {
            section_key: "b2b".to_string(),
            sheet_name: "B2B".to_string(),
            strategy: ExtractionStrategy::PathMeta(PathMetaRule {
                record_path: vec![PathStep::EachElement, key("inv"), PathStep::EachElement],
                meta: vec![MetaField::new("recipient_gstin", vec![key("ctin")])],
                line_items: Some("itms".to_string()),
            }),
            rename,
            column_order: [
                "recipient_gstin",
                "invoice_or_note_number",
                "date",
                "total_value",
                "item_number",
                "taxable_value",
                "rate",
                "igst",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            date_columns: None,
        }
    }

    #[test]
    fn test_single_invoice_produces_exact_row() {
        let document = json!({"gstin":"X","b2b":[{"ctin":"P1","inv":[{"inum":"I1","idt":"01-01-2024","val":100,"itms":[{"num":1,"itm_det":{"txval":100,"rt":18,"iamt":18}}]}]}]});
        let processor = SectionProcessor::new(&ConversionOptions::default());

        let outcome = processor.process(&document, &b2b_rule()).unwrap();
        let SectionOutcome::Produced { table, invalid_dates } = outcome else {
            panic!("expected a table");
        };

        assert_eq!(invalid_dates, 0);
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.rows()[0],
            vec![
                CellValue::Text("P1".into()),
                CellValue::Text("I1".into()),
                CellValue::Text("01-01-2024".into()),
                CellValue::Number(100.0),
                CellValue::Number(1.0),
                CellValue::Number(100.0),
                CellValue::Number(18.0),
                CellValue::Number(18.0),
            ]
        );
    }

    #[test]
    fn test_absent_and_empty_sections_are_skipped() {
        let processor = SectionProcessor::new(&ConversionOptions::default());
        let rule = b2b_rule();

        for (document, reason) in [
            (json!({"gstin": "X"}), SkipReason::Absent),
            (json!({"b2b": null}), SkipReason::Empty),
            (json!({"b2b": []}), SkipReason::Empty),
            (json!({"b2b": {}}), SkipReason::Empty),
            (json!({"b2b": ""}), SkipReason::Empty),
            (json!({"b2b": [{"ctin": "P1"}]}), SkipReason::NoRows),
        ] {
            assert_eq!(
                processor.process(&document, &rule).unwrap(),
                SectionOutcome::Skipped(reason)
            );
        }
    }

    #[test]
    fn test_date_column_is_coerced() {
        let mut rule = SectionRule::simple("at");
        rule.rename = vec![("idt".to_string(), "Date".to_string())];
        let document = json!({"at": [{"idt": "15-03-2024"}, {"idt": "garbage"}]});

        let outcome = SectionProcessor::new(&ConversionOptions::default())
            .process(&document, &rule)
            .unwrap();
        let SectionOutcome::Produced { table, invalid_dates } = outcome else {
            panic!("expected a table");
        };

        assert_eq!(invalid_dates, 1);
        assert_eq!(
            table.cell(0, "Date"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()))
        );
        assert_eq!(table.cell(1, "Date"), Some(&CellValue::InvalidDate("garbage".into())));
    }

    #[test]
    fn test_processing_is_idempotent() {
        let document = json!({"b2b":[{"ctin":"P1","inv":[{"inum":"I1","itms":[{"num":1},{"num":2}]}]}]});
        let processor = SectionProcessor::new(&ConversionOptions::default());
        let rule = b2b_rule();

        let first = processor.process(&document, &rule).unwrap();
        let second = processor.process(&document, &rule).unwrap();
        assert_eq!(first, second);
    }

    fn wide_rule(columns: usize) -> SectionRule {
        let mut rule = SectionRule::simple("at");
        rule.column_order = (0..columns).map(|i| format!("c{}", i)).collect();
        rule
    }

    #[test]
    fn test_column_offset_counts_toward_sheet_limit() {
        let document = json!({"at": [{"c0": 1}]});
        let options = ConversionOptions {
            layout: SheetLayout {
                start_row: 0,
                start_col: 16_000,
                freeze_header: true,
            },
            ..Default::default()
        };

        // 500 欄本身未超限，加上偏移後超過 16,384 欄
        let plain = SectionProcessor::new(&ConversionOptions::default());
        assert!(plain.process(&document, &wide_rule(500)).is_ok());

        let err = SectionProcessor::new(&options)
            .process(&document, &wide_rule(500))
            .unwrap_err();
        assert!(matches!(err, GstError::SectionError { ref section, .. } if section == "at"));

        assert!(SectionProcessor::new(&options)
            .process(&document, &wide_rule(384))
            .is_ok());
    }

    #[test]
    fn test_row_offset_counts_toward_sheet_limit() {
        let document = json!({"at": [{"c0": 1}, {"c0": 2}]});
        let at_edge = |start_row: u32| ConversionOptions {
            layout: SheetLayout {
                start_row,
                start_col: 0,
                freeze_header: false,
            },
            ..Default::default()
        };

        // 標題 + 2 列：起始列最多為 1,048,573
        let fits = SectionProcessor::new(&at_edge(1_048_573));
        assert!(fits.process(&document, &wide_rule(1)).is_ok());

        let overflows = SectionProcessor::new(&at_edge(1_048_574));
        assert!(matches!(
            overflows.process(&document, &wide_rule(1)),
            Err(GstError::SectionError { .. })
        ));
    }

    #[test]
    fn test_overlong_text_fails_only_the_section() {
        let long_text = "x".repeat(EXCEL_MAX_CELL_TEXT_LEN + 1);
        let document = json!({"at": [{"pos": "29", "note": long_text}]});
        let processor = SectionProcessor::new(&ConversionOptions::default());

        let err = processor
            .process(&document, &SectionRule::simple("at"))
            .unwrap_err();
        assert!(err.to_string().contains("'note'"));

        let at_limit = json!({"at": [{"note": "x".repeat(EXCEL_MAX_CELL_TEXT_LEN)}]});
        assert!(processor.process(&at_limit, &SectionRule::simple("at")).is_ok());
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!([1])));
    }
}
