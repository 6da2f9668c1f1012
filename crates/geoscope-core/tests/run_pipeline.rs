//! End-to-end pass through the scheduled-run pipeline: a generated
//! benchmark, a weekly schedule fired at its due time, and the aggregates
//! that land on the run.

use chrono::{TimeZone, Utc};
use geoscope_core::benchmarks::BenchmarkService;
use geoscope_core::engine::runner::{RunSettings, Runner};
use geoscope_core::model::{BenchmarkDraft, BenchmarkStatus, Frequency, RunStatus, TaskDraft};
use geoscope_core::providers::generation::TemplateGenerator;
use geoscope_core::providers::simulation::fake::FakeSimulationClient;
use geoscope_core::schedule::TaskEngine;
use geoscope_core::storage::store::Store;
use std::sync::Arc;

fn fixture() -> (Store, Runner) {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let runner = Runner::new(
        store.clone(),
        Arc::new(FakeSimulationClient::new(
            "Acme",
            &["Globex".into(), "Initech".into()],
        )),
        RunSettings::default(),
    );
    (store, runner)
}

#[tokio::test]
async fn generated_benchmark_scheduled_and_fired() {
    let (store, runner) = fixture();
    let svc = BenchmarkService::new(store.clone());
    let benchmark = svc
        .generate(
            &TemplateGenerator,
            &BenchmarkDraft {
                project_id: "p1".into(),
                name: "CRM tools".into(),
                scenario: "mid-market CRM selection".into(),
                target_roles: vec!["founder".into()],
                questions_per_stage: 1,
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(benchmark.status, BenchmarkStatus::Ready);
    assert_eq!(benchmark.total_questions, 6);

    let engine = TaskEngine::new(store.clone());
    let created_at = Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap(); // Wednesday
    let task = engine
        .create(
            &TaskDraft {
                project_id: "p1".into(),
                benchmark_id: benchmark.id,
                name: "weekly visibility".into(),
                engines: vec!["chatgpt".into(), "claude".into()],
                channels: vec!["chat".into()],
                frequency: Frequency::Weekly,
                day_of_week: Some(1),
                day_of_month: None,
                time: "09:00".into(),
            },
            created_at,
        )
        .unwrap();
    let due = task.next_run_at;
    assert_eq!(due, Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap());

    let reports = engine.fire_due(&runner, "p1", due).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].fired);

    let run_id = reports[0].run_id.unwrap();
    let run = store.get_run("p1", run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.progress.total, 12); // 6 questions x 2 engines
    assert_eq!(run.benchmark_version, "1.1");
    let summary = run.summary.unwrap();
    assert_eq!(summary.total_results, 12);
    assert!((0.0..=1.0).contains(&summary.visibility_rate));

    // the benchmark is back in rotation and the task points at next Monday
    assert_eq!(
        store.get_benchmark("p1", benchmark.id).unwrap().status,
        BenchmarkStatus::Ready
    );
    let task = engine.get("p1", task.id).unwrap();
    assert_eq!(task.run_count, 1);
    assert_eq!(task.last_run_id, Some(run_id));
    assert_eq!(
        task.next_run_at,
        Utc.with_ymd_and_hms(2026, 8, 17, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn fire_due_skips_tasks_scheduled_for_later() {
    let (store, runner) = fixture();
    let svc = BenchmarkService::new(store.clone());
    let benchmark = svc
        .generate(
            &TemplateGenerator,
            &BenchmarkDraft {
                project_id: "p1".into(),
                name: "CRM tools".into(),
                scenario: "crm".into(),
                target_roles: vec![],
                questions_per_stage: 1,
            },
            None,
        )
        .await
        .unwrap();
    let engine = TaskEngine::new(store.clone());
    let now = Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap();
    engine
        .create(
            &TaskDraft {
                project_id: "p1".into(),
                benchmark_id: benchmark.id,
                name: "daily".into(),
                engines: vec!["chatgpt".into()],
                channels: vec!["chat".into()],
                frequency: Frequency::Daily,
                day_of_week: None,
                day_of_month: None,
                time: "09:00".into(),
            },
            now,
        )
        .unwrap();
    // still Wednesday noon; the 09:00 slot has passed and tomorrow's has not
    let reports = engine.fire_due(&runner, "p1", now).await.unwrap();
    assert!(reports.is_empty());
}
