use crate::domain::model::{ConversionSummary, ConvertedDocument, Workbook};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &Path) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 將活頁簿序列化為輸出檔內容
pub trait WorkbookWriter: Send + Sync {
    fn extension(&self) -> &'static str;
    fn render(&self, workbook: &Workbook) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Value>;
    async fn transform(&self, document: Value) -> Result<ConvertedDocument>;
    async fn load(&self, converted: ConvertedDocument) -> Result<ConversionSummary>;
}
