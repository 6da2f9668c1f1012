use crate::model::{CompetitorAnalysis, EngineResponse, Question, SimulationResult};
use async_trait::async_trait;

/// Brand context the backend evaluates responses against. Owned by the
/// client, not threaded through every request.
#[derive(Debug, Clone)]
pub struct BrandProfile {
    pub brand: String,
    pub competitors: Vec<String>,
}

/// One (question, engine) unit of work.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub question: Question,
    pub engine: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub result: SimulationResult,
}

#[async_trait]
pub trait SimulationClient: Send + Sync {
    async fn simulate(&self, req: &SimulationRequest) -> anyhow::Result<EngineResponse>;
    async fn analyze_competitors(&self, req: &AnalysisRequest)
        -> anyhow::Result<CompetitorAnalysis>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod http;
