use crate::errors::CoreError;
use crate::model::{
    Benchmark, BenchmarkDraft, BenchmarkPatch, BenchmarkStatus, BenchmarkVersion,
};
use crate::providers::generation::{GenerationEvent, QuestionGenerator};
use crate::model::QuestionIntent;
use crate::storage::store::Store;
use tokio::sync::mpsc;

pub struct BenchmarkService {
    store: Store,
}

impl BenchmarkService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create(&self, draft: &BenchmarkDraft) -> anyhow::Result<Benchmark> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::validation("name", "must not be empty").into());
        }
        let benchmark = self.store.insert_benchmark(draft, BenchmarkStatus::Draft)?;
        tracing::info!(
            event = "benchmark.created",
            benchmark_id = benchmark.id,
            version = %benchmark.current_version,
        );
        Ok(benchmark)
    }

    pub fn get(&self, project: &str, id: i64) -> anyhow::Result<Benchmark> {
        self.store.get_benchmark(project, id)
    }

    pub fn list(&self, project: &str) -> anyhow::Result<Vec<Benchmark>> {
        self.store.list_benchmarks(project)
    }

    pub fn update(
        &self,
        project: &str,
        id: i64,
        patch: &BenchmarkPatch,
    ) -> anyhow::Result<(Benchmark, BenchmarkVersion)> {
        if patch.is_empty() {
            return Err(CoreError::validation("patch", "no fields to update").into());
        }
        self.store.update_benchmark(project, id, patch)
    }

    pub fn delete(&self, project: &str, id: i64) -> anyhow::Result<()> {
        self.store.delete_benchmark(project, id)
    }

    pub fn archive(&self, project: &str, id: i64) -> anyhow::Result<Benchmark> {
        let benchmark = self.store.get_benchmark(project, id)?;
        if !benchmark.status.can_transition(BenchmarkStatus::Archived) {
            return Err(CoreError::invalid_state(format!(
                "benchmark {} cannot be archived from status {}",
                id,
                benchmark.status.as_str()
            ))
            .into());
        }
        self.store.set_benchmark_status(id, BenchmarkStatus::Archived)?;
        self.store.get_benchmark(project, id)
    }

    /// Brings an archived benchmark back into rotation and flips is_active.
    pub fn activate(&self, project: &str, id: i64, active: bool) -> anyhow::Result<Benchmark> {
        let benchmark = self.store.get_benchmark(project, id)?;
        if active && benchmark.status == BenchmarkStatus::Archived {
            self.store.set_benchmark_status(id, BenchmarkStatus::Ready)?;
        }
        self.store.set_benchmark_active(project, id, active)
    }

    /// AI-assisted creation: walks the six funnel stages in order, streaming
    /// progress events to the caller. All generated questions land under a
    /// single question_added version; on generator failure the benchmark
    /// falls back to draft and the error event closes the stream.
    pub async fn generate(
        &self,
        generator: &dyn QuestionGenerator,
        draft: &BenchmarkDraft,
        events: Option<mpsc::Sender<GenerationEvent>>,
    ) -> anyhow::Result<Benchmark> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::validation("name", "must not be empty").into());
        }
        if draft.questions_per_stage == 0 {
            return Err(
                CoreError::validation("questions_per_stage", "must be at least 1").into(),
            );
        }
        let benchmark = self
            .store
            .insert_benchmark(draft, BenchmarkStatus::Generating)?;
        emit(
            &events,
            GenerationEvent::BenchmarkCreated {
                benchmark_id: benchmark.id,
            },
        )
        .await;

        // Idle-channel heartbeat while stages are in flight.
        let heartbeat = events.clone().map(|tx| {
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(std::time::Duration::from_secs(5));
                tick.tick().await; // first tick is immediate; skip it
                loop {
                    tick.tick().await;
                    if tx.send(GenerationEvent::Heartbeat).await.is_err() {
                        break;
                    }
                }
            })
        });

        let mut total: u32 = 0;
        for stage in QuestionIntent::FUNNEL {
            emit(&events, GenerationEvent::StageStart { stage }).await;
            let drafts = match generator
                .stage_questions(&benchmark, stage, draft.questions_per_stage)
                .await
            {
                Ok(drafts) => drafts,
                Err(e) => {
                    tracing::warn!(
                        event = "generation.failed",
                        benchmark_id = benchmark.id,
                        stage = stage.as_str(),
                        error = %e,
                    );
                    self.store.fail_generation(benchmark.id)?;
                    emit(
                        &events,
                        GenerationEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                    if let Some(h) = &heartbeat {
                        h.abort();
                    }
                    return Err(e);
                }
            };
            let mut generated: u32 = 0;
            for q in &drafts {
                let question = self.store.insert_question_raw(benchmark.id, q)?;
                generated += 1;
                emit(
                    &events,
                    GenerationEvent::QuestionGenerated {
                        benchmark_id: benchmark.id,
                        question_id: question.id,
                        stage,
                    },
                )
                .await;
            }
            total += generated;
            emit(&events, GenerationEvent::StageComplete { stage, generated }).await;
        }

        let (benchmark, version) = self.store.finish_generation(
            benchmark.id,
            &format!("generated {} questions", total),
        )?;
        emit(
            &events,
            GenerationEvent::GenerationComplete {
                total_questions: total,
                version: version.version.clone(),
            },
        )
        .await;
        if let Some(h) = &heartbeat {
            h.abort();
        }
        tracing::info!(
            event = "generation.completed",
            benchmark_id = benchmark.id,
            total_questions = total,
            version = %version.version,
        );
        Ok(benchmark)
    }
}

async fn emit(events: &Option<mpsc::Sender<GenerationEvent>>, event: GenerationEvent) {
    if let Some(tx) = events {
        // A dropped receiver just means nobody is watching the stream.
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionSource;
    use crate::providers::generation::TemplateGenerator;
    use async_trait::async_trait;

    fn service() -> BenchmarkService {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        BenchmarkService::new(store)
    }

    fn draft() -> BenchmarkDraft {
        BenchmarkDraft {
            project_id: "p1".into(),
            name: "CRM tools".into(),
            scenario: "mid-market CRM selection".into(),
            target_roles: vec!["founder".into()],
            questions_per_stage: 2,
        }
    }

    #[tokio::test]
    async fn generate_streams_ordered_events_and_readies_benchmark() {
        let svc = service();
        let (tx, mut rx) = mpsc::channel(256);
        let benchmark = svc
            .generate(&TemplateGenerator, &draft(), Some(tx))
            .await
            .unwrap();
        assert_eq!(benchmark.status, BenchmarkStatus::Ready);
        assert_eq!(benchmark.total_questions, 12);
        assert_eq!(benchmark.current_version, "1.1");

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(matches!(events[0], GenerationEvent::BenchmarkCreated { .. }));
        assert!(matches!(
            events.last().unwrap(),
            GenerationEvent::GenerationComplete { total_questions: 12, .. }
        ));
        let stage_starts = events
            .iter()
            .filter(|e| matches!(e, GenerationEvent::StageStart { .. }))
            .count();
        let stage_completes = events
            .iter()
            .filter(|e| matches!(e, GenerationEvent::StageComplete { .. }))
            .count();
        let generated = events
            .iter()
            .filter(|e| matches!(e, GenerationEvent::QuestionGenerated { .. }))
            .count();
        assert_eq!(stage_starts, 6);
        assert_eq!(stage_completes, 6);
        assert_eq!(generated, 12);

        // every generated question is marked as such
        let questions = svc.store.list_questions("p1", benchmark.id).unwrap();
        assert!(questions.iter().all(|q| q.source == QuestionSource::Generated));
    }

    struct FailingGenerator;

    #[async_trait]
    impl QuestionGenerator for FailingGenerator {
        async fn stage_questions(
            &self,
            _benchmark: &Benchmark,
            stage: QuestionIntent,
            _count: u32,
        ) -> anyhow::Result<Vec<crate::model::QuestionDraft>> {
            anyhow::bail!("generator backend unavailable at stage {}", stage.as_str())
        }

        fn provider_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn generator_failure_emits_error_and_reverts_to_draft() {
        let svc = service();
        let (tx, mut rx) = mpsc::channel(64);
        let err = svc
            .generate(&FailingGenerator, &draft(), Some(tx))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("generator backend unavailable"));

        let mut saw_error = false;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, GenerationEvent::Error { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);

        let benchmarks = svc.list("p1").unwrap();
        assert_eq!(benchmarks[0].status, BenchmarkStatus::Draft);
    }

    #[test]
    fn archive_requires_legal_transition() {
        let svc = service();
        let b = svc.create(&draft()).unwrap();
        // draft -> archived is not in the table
        assert!(svc.archive("p1", b.id).is_err());
    }
}
