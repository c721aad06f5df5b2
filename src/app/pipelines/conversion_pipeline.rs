use crate::core::document::DocumentConverter;
use crate::core::{ConversionSummary, ConvertedDocument, Pipeline, Storage, WorkbookWriter};
use crate::domain::model::ConversionStage;
use crate::utils::error::{GstError, Result};
use crate::utils::validation::validate_file_extension;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// 單一來源檔的轉換：讀取 JSON → 轉成活頁簿 → 寫出
pub struct ConversionPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) converter: Arc<DocumentConverter>,
    pub(crate) writer: Arc<dyn WorkbookWriter>,
    source: PathBuf,
    destination: PathBuf,
}

impl<S: Storage> ConversionPipeline<S> {
    pub fn new(
        storage: S,
        converter: Arc<DocumentConverter>,
        writer: Arc<dyn WorkbookWriter>,
        source: PathBuf,
        destination: PathBuf,
    ) -> Self {
        Self {
            storage,
            converter,
            writer,
            source,
            destination,
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> GstError {
        GstError::DocumentParseError {
            path: self.source.display().to_string(),
            message: message.into(),
        }
    }

    fn write_error(&self, message: impl Into<String>) -> GstError {
        GstError::WriteError {
            path: self.destination.display().to_string(),
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ConversionPipeline<S> {
    async fn extract(&self) -> Result<Value> {
        validate_file_extension("source", &self.source, &["json"])
            .map_err(|_| self.parse_error("not a JSON file"))?;

        tracing::debug!("📥 Reading {}", self.source.display());
        let bytes = self
            .storage
            .read_file(&self.source)
            .await
            .map_err(|e| self.parse_error(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| self.parse_error(e.to_string()))
    }

    async fn transform(&self, document: Value) -> Result<ConvertedDocument> {
        self.converter.convert(&document)
    }

    async fn load(&self, converted: ConvertedDocument) -> Result<ConversionSummary> {
        let data = self
            .writer
            .render(&converted.workbook)
            .map_err(|e| self.write_error(e.to_string()))?;

        tracing::debug!(
            "💾 Writing {} ({} bytes, {} sheets)",
            self.destination.display(),
            data.len(),
            converted.workbook.len()
        );
        self.storage
            .write_file(&self.destination, &data)
            .await
            .map_err(|e| self.write_error(e.to_string()))?;

        Ok(ConversionSummary {
            output: self.destination.clone(),
            sheet_count: converted.workbook.len(),
            row_count: converted.workbook.sheets().iter().map(|t| t.row_count()).sum(),
            warnings: converted.warnings,
            stage: ConversionStage::Written,
        })
    }
}
