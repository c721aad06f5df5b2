use crate::domain::model::{ConversionStage, ConversionSummary};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// 依序執行 pipeline 的 extract → transform → load
pub struct ConversionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ConversionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<ConversionSummary> {
        let mut stage = ConversionStage::Idle;
        let result = self.run_stages(&mut stage).await;
        if let Err(e) = &result {
            tracing::debug!("{:?} → {:?}: {}", stage, ConversionStage::Failed, e);
        }
        result
    }

    async fn run_stages(&self, stage: &mut ConversionStage) -> Result<ConversionSummary> {
        tracing::debug!("📥 Reading document...");
        let document = self.pipeline.extract().await?;

        tracing::debug!("🔄 Converting sections...");
        let converted = self.pipeline.transform(document).await?;
        *stage = converted.stage;
        tracing::debug!(
            "🔄 Assembled {} sheets ({} skipped sections, {} warnings)",
            converted.workbook.len(),
            converted.skipped_sections.len(),
            converted.warnings.len()
        );

        tracing::debug!("💾 Writing workbook...");
        let summary = self.pipeline.load(converted).await?;
        *stage = summary.stage;

        Ok(summary)
    }
}
