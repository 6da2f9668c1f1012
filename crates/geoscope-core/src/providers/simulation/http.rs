use super::{AnalysisRequest, BrandProfile, SimulationClient, SimulationRequest};
use crate::model::{CompetitorAnalysis, EngineResponse};
use async_trait::async_trait;
use serde_json::json;

/// Client for the remote simulation backend.
pub struct HttpSimulationClient {
    pub endpoint: String,
    pub profile: BrandProfile,
    pub client: reqwest::Client,
}

impl HttpSimulationClient {
    pub fn new(endpoint: String, profile: BrandProfile) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            profile,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SimulationClient for HttpSimulationClient {
    async fn simulate(&self, req: &SimulationRequest) -> anyhow::Result<EngineResponse> {
        let url = format!("{}/api/simulations", self.endpoint);
        let body = json!({
            "question": req.question.text,
            "intent": req.question.intent,
            "persona_role": req.question.persona_role,
            "persona_name": req.question.persona_name,
            "keyword": req.question.keyword,
            "engine": req.engine,
            "channels": req.channels,
            "brand": self.profile.brand,
            "competitors": self.profile.competitors,
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("simulation API error ({}): {}", status, error_text);
        }
        let parsed: EngineResponse = resp.json().await?;
        Ok(parsed)
    }

    async fn analyze_competitors(
        &self,
        req: &AnalysisRequest,
    ) -> anyhow::Result<CompetitorAnalysis> {
        let url = format!("{}/api/competitor-analysis", self.endpoint);
        let body = json!({
            "response_text": req.result.simulated_response,
            "engine": req.result.engine,
            "ranking": req.result.ranking,
            "competitors_mentioned": req.result.competitors_mentioned,
            "brand": self.profile.brand,
            "competitors": self.profile.competitors,
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("competitor analysis API error ({}): {}", status, error_text);
        }
        let parsed: CompetitorAnalysis = resp.json().await?;
        Ok(parsed)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}
