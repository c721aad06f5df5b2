use crate::config::app_config::ConversionOptions;
use crate::config::section_config::SectionConfig;
use crate::core::section::{SectionOutcome, SectionProcessor};
use crate::domain::model::{CellValue, ConversionStage, ConvertedDocument, Table, Workbook};
use crate::utils::error::{GstError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const BASIC_INFO_SHEET: &str = "Basic Info";
pub const BASIC_INFO_HEADER: [&str; 2] = ["Key", "Value"];

/// 整份文件的轉換：基本資訊 + 所有設定的區段 → 活頁簿
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    sections: Arc<SectionConfig>,
    processor: SectionProcessor,
    basic_info_keys: Option<Vec<String>>,
}

impl DocumentConverter {
    pub fn new(sections: Arc<SectionConfig>, options: &ConversionOptions) -> Self {
        Self {
            sections,
            processor: SectionProcessor::new(options),
            basic_info_keys: options.basic_info_keys.clone(),
        }
    }

    pub fn sections(&self) -> &SectionConfig {
        &self.sections
    }

    /// 基本資訊表：頂層純量鍵（或指定的鍵清單）以 (Key, Value) 列出
    pub fn basic_info(&self, document: &Map<String, Value>) -> Result<Table> {
        let header = BASIC_INFO_HEADER.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(BASIC_INFO_SHEET, header);

        let entries: Vec<(&String, &Value)> = match &self.basic_info_keys {
            Some(keys) => keys
                .iter()
                .filter_map(|key| document.get_key_value(key.as_str()))
                .collect(),
            None => document
                .iter()
                .filter(|(_, value)| !matches!(value, Value::Object(_) | Value::Array(_)))
                .collect(),
        };

        for (key, value) in entries {
            table.push_row(vec![CellValue::Text(key.clone()), CellValue::from_json(value)])?;
        }
        Ok(table)
    }

    pub fn convert(&self, document: &Value) -> Result<ConvertedDocument> {
        let mut stage = ConversionStage::Idle;

        let root = match document {
            Value::Object(map) if !map.is_empty() => map,
            Value::Object(_) => {
                return Err(GstError::EmptyDocumentError {
                    reason: "document has no keys".to_string(),
                })
            }
            other => {
                return Err(GstError::EmptyDocumentError {
                    reason: format!("expected a JSON object at the top level, found {}", kind(other)),
                })
            }
        };

        let mut workbook = Workbook::new();
        workbook.push(self.basic_info(root)?);
        stage = advance(stage, ConversionStage::BasicInfoExtracted);

        let mut warnings = Vec::new();
        let mut skipped_sections = Vec::new();
        let mut invalid_dates = 0;

        for rule in self.sections.rules() {
            match self.processor.process(document, rule) {
                Ok(SectionOutcome::Produced {
                    table,
                    invalid_dates: invalid,
                }) => {
                    tracing::debug!(
                        "📄 Section '{}' → sheet '{}' ({} rows)",
                        rule.section_key,
                        table.sheet_name,
                        table.row_count()
                    );
                    if invalid > 0 {
                        warnings.push(format!(
                            "Section '{}': {} unparsable dates left blank",
                            rule.section_key, invalid
                        ));
                    }
                    invalid_dates += invalid;
                    workbook.push(table);
                }
                Ok(SectionOutcome::Skipped(reason)) => {
                    tracing::debug!("⏭️ Section '{}' skipped ({:?})", rule.section_key, reason);
                    skipped_sections.push(rule.section_key.clone());
                }
                Err(e) => {
                    tracing::warn!("⚠️ Could not process section '{}': {}", rule.section_key, e);
                    warnings.push(e.to_string());
                }
            }
        }
        stage = advance(stage, ConversionStage::SectionsProcessed);
        stage = advance(stage, ConversionStage::WorkbookAssembled);

        Ok(ConvertedDocument {
            workbook,
            warnings,
            skipped_sections,
            invalid_dates,
            stage,
        })
    }
}

fn advance(from: ConversionStage, to: ConversionStage) -> ConversionStage {
    tracing::trace!("{:?} → {:?}", from, to);
    to
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
