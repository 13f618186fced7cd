use crate::core::cea::CohortAnalysis;
use crate::domain::model::{AnalysisResult, SimulatedStrategy};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ModelProvider: Send + Sync {
    fn model_name(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn bundle_name(&self) -> Option<&str>;
    fn build_analysis(&self) -> Result<CohortAnalysis>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn simulate(&self) -> Result<Vec<SimulatedStrategy>>;
    async fn evaluate(&self, simulations: Vec<SimulatedStrategy>) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
