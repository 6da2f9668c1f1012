use crate::errors::CoreError;
use crate::model::CompetitorAnalysis;
use crate::providers::simulation::{AnalysisRequest, SimulationClient};
use crate::storage::store::Store;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

/// On-demand deep competitor analysis for a single result. Idempotent: the
/// first successful generation is cached on the result row and returned on
/// every later call. Runs under its own extended budget, separate from the
/// per-pair simulation timeout.
pub struct CompetitorAnalyst {
    store: Store,
    client: Arc<dyn SimulationClient>,
    budget: Duration,
}

impl CompetitorAnalyst {
    pub fn new(store: Store, client: Arc<dyn SimulationClient>, budget: Duration) -> Self {
        Self {
            store,
            client,
            budget,
        }
    }

    pub fn existing(&self, result_id: i64) -> anyhow::Result<Option<CompetitorAnalysis>> {
        self.store.get_analysis(result_id)
    }

    pub async fn get_or_generate(&self, result_id: i64) -> anyhow::Result<CompetitorAnalysis> {
        if let Some(cached) = self.store.get_analysis(result_id)? {
            tracing::debug!(event = "analysis.cache_hit", result_id = result_id);
            return Ok(cached);
        }
        let result = self.store.get_result(result_id)?;
        let req = AnalysisRequest { result };
        let analysis = match timeout(self.budget, self.client.analyze_competitors(&req)).await {
            Ok(r) => r?,
            Err(_) => {
                return Err(CoreError::upstream_timeout(
                    "competitor analysis",
                    self.budget.as_secs(),
                )
                .into());
            }
        };
        self.store.put_analysis(result_id, &analysis)?;
        tracing::info!(event = "analysis.generated", result_id = result_id);
        Ok(analysis)
    }
}
