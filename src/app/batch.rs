use crate::app::pipelines::ConversionPipeline;
use crate::core::document::DocumentConverter;
use crate::core::etl::ConversionEngine;
use crate::core::{Storage, WorkbookWriter};
use crate::domain::model::{ConversionReport, FileResult};
use crate::utils::discovery::derive_output_path;
use crate::utils::monitor::SystemMonitor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub const CANCELLED_MESSAGE: &str = "cancelled";

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    Finished { success: bool, message: String },
}

/// 批次進度：第 `index` 個檔案（從 1 起算），共 `total` 個
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub index: usize,
    pub total: usize,
    pub source: PathBuf,
    pub event: ProgressEvent,
}

/// 依序轉換多個來源檔；單一檔案失敗不影響其他檔案
pub struct BatchConverter<S: Storage + Clone> {
    storage: S,
    converter: Arc<DocumentConverter>,
    writer: Arc<dyn WorkbookWriter>,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
    cancel: Option<watch::Receiver<bool>>,
    monitor: SystemMonitor,
}

impl<S: Storage + Clone> BatchConverter<S> {
    pub fn new(storage: S, converter: Arc<DocumentConverter>, writer: Arc<dyn WorkbookWriter>) -> Self {
        Self {
            storage,
            converter,
            writer,
            progress: None,
            cancel: None,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<BatchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// 收到 `true` 後，於檔案之間停止
    pub fn with_cancellation(mut self, receiver: watch::Receiver<bool>) -> Self {
        self.cancel = Some(receiver);
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn output_path_for(&self, source: &Path, dest_dir: &Path) -> PathBuf {
        derive_output_path(source, dest_dir, self.writer.extension())
    }

    pub async fn convert_document(&self, source: &Path, destination: &Path) -> FileResult {
        let pipeline = ConversionPipeline::new(
            self.storage.clone(),
            Arc::clone(&self.converter),
            Arc::clone(&self.writer),
            source.to_path_buf(),
            destination.to_path_buf(),
        );

        match ConversionEngine::new(pipeline).run().await {
            Ok(summary) => {
                tracing::info!(
                    "✅ {} → {} ({} sheets, {} rows)",
                    source.display(),
                    summary.output.display(),
                    summary.sheet_count,
                    summary.row_count
                );
                for warning in &summary.warnings {
                    tracing::warn!("⚠️ {}: {}", source.display(), warning);
                }
                FileResult::succeeded(source.to_path_buf(), summary)
            }
            Err(e) => {
                tracing::error!(
                    "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                    source.display(),
                    e,
                    e.category(),
                    e.severity()
                );
                FileResult::failed(source.to_path_buf(), e.user_friendly_message())
            }
        }
    }

    pub async fn convert_all(&self, sources: &[PathBuf], dest_dir: &Path) -> ConversionReport {
        let total = sources.len();
        let mut results = Vec::with_capacity(total);
        tracing::info!("🚀 Converting {} files into {}", total, dest_dir.display());
        self.monitor.log_stats("Batch start");

        for (position, source) in sources.iter().enumerate() {
            let index = position + 1;

            if self.is_cancelled() {
                tracing::warn!("⏹️ Batch cancelled before {}", source.display());
                for remaining in &sources[position..] {
                    let result = FileResult::failed(remaining.clone(), CANCELLED_MESSAGE);
                    self.emit(index, total, remaining, finished(&result));
                    results.push(result);
                }
                break;
            }

            self.emit(index, total, source, ProgressEvent::Started);
            let destination = self.output_path_for(source, dest_dir);
            let result = self.convert_document(source, &destination).await;
            self.emit(index, total, source, finished(&result));
            results.push(result);

            self.monitor.log_stats(&format!("After file {}/{}", index, total));
        }

        let report = ConversionReport::from_results(results);
        self.monitor.log_final_stats(report.converted(), report.total());
        tracing::info!("📊 {}", report.message);
        report
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    fn emit(&self, index: usize, total: usize, source: &Path, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            let progress = BatchProgress {
                index,
                total,
                source: source.to_path_buf(),
                event,
            };
            if sender.send(progress).is_err() {
                tracing::debug!("Progress receiver dropped");
            }
        }
    }
}

fn finished(result: &FileResult) -> ProgressEvent {
    ProgressEvent::Finished {
        success: result.success,
        message: result.message.clone(),
    }
}
