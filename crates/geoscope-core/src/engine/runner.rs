use crate::providers::simulation::{SimulationClient, SimulationRequest};
use crate::storage::store::Store;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub parallel: usize,
    /// Per-pair budget; a pair that exceeds it is recorded as failed, the
    /// rest of the batch continues.
    pub timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct Runner {
    pub store: Store,
    pub client: Arc<dyn SimulationClient>,
    pub settings: RunSettings,
}

impl Runner {
    pub fn new(store: Store, client: Arc<dyn SimulationClient>, settings: RunSettings) -> Self {
        Self {
            store,
            client,
            settings,
        }
    }

    /// Executes the benchmark's current question set against every engine in
    /// the set, one unit of work per (question, engine) pair. Pair failures
    /// never abort siblings; the run completes once every pair has settled.
    pub async fn execute(
        &self,
        project: &str,
        benchmark_id: i64,
        engines: &[String],
        channels: &[String],
    ) -> anyhow::Result<crate::model::Run> {
        let (run, questions) = self
            .store
            .begin_run(project, benchmark_id, engines, channels)?;
        tracing::info!(
            event = "run.started",
            run_id = run.id,
            benchmark_id = benchmark_id,
            version = %run.benchmark_version,
            total_pairs = run.progress.total,
            provider = self.client.provider_name(),
        );

        let sem = Arc::new(Semaphore::new(self.settings.parallel.max(1)));
        let mut handles = Vec::new();
        for question in &questions {
            for engine in engines {
                let permit = sem.clone().acquire_owned().await?;
                let store = self.store.clone();
                let client = self.client.clone();
                let budget = self.settings.timeout;
                let run_id = run.id;
                let question_id = question.id;
                let fallback_channel = channels
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "chat".to_string());
                let req = SimulationRequest {
                    question: question.clone(),
                    engine: engine.clone(),
                    channels: channels.to_vec(),
                };
                let h = tokio::spawn(async move {
                    let _permit = permit;
                    match timeout(budget, client.simulate(&req)).await {
                        Ok(Ok(resp)) => {
                            store.record_success(run_id, question_id, &req.engine, &resp)
                        }
                        Ok(Err(e)) => store.record_failure(
                            run_id,
                            question_id,
                            &req.engine,
                            &fallback_channel,
                            &format!("simulation error: {}", e),
                        ),
                        Err(_) => store.record_failure(
                            run_id,
                            question_id,
                            &req.engine,
                            &fallback_channel,
                            &format!("timeout after {}s", budget.as_secs()),
                        ),
                    }
                });
                handles.push(h);
            }
        }

        for h in handles {
            if let Err(e) = h.await? {
                // A pair that could not even record its outcome; surface it,
                // the counters stay consistent because record_* is atomic.
                tracing::warn!(event = "run.record_failed", run_id = run.id, error = %e);
            }
        }

        let run = self.store.finalize_run(run.id)?;
        if let Some(summary) = &run.summary {
            tracing::info!(
                event = "run.completed",
                run_id = run.id,
                status = run.status.as_str(),
                completed = run.progress.completed,
                failed = run.progress.failed,
                visibility_rate = summary.visibility_rate,
                danger_count = summary.danger_count,
            );
        }
        Ok(run)
    }
}
