use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting cohort analysis...");

        // Simulate
        let simulations = self.pipeline.simulate().await?;
        tracing::info!("Simulated {} strategies", simulations.len());

        // Evaluate
        let result = self.pipeline.evaluate(simulations).await?;
        tracing::info!(
            "Evaluated {} strategies, {} incremental comparisons",
            result.outcomes.len(),
            result.incremental.len()
        );

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!(
            "Output saved to: {} ({:?})",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}
