//! Runs pin the benchmark version they executed against; later edits to the
//! live question set must never leak into a historical run's results.

use geoscope_core::engine::runner::{RunSettings, Runner};
use geoscope_core::model::{
    BenchmarkDraft, BenchmarkStatus, QuestionDraft, QuestionIntent, QuestionPatch, QuestionSource,
};
use geoscope_core::providers::simulation::fake::FakeSimulationClient;
use geoscope_core::questions::QuestionSet;
use geoscope_core::storage::store::Store;
use std::sync::Arc;

fn draft(text: &str) -> QuestionDraft {
    QuestionDraft {
        text: text.into(),
        intent: QuestionIntent::Recommend,
        persona_role: "founder".into(),
        persona_name: "Sam".into(),
        keyword: "crm".into(),
        source: QuestionSource::Manual,
    }
}

#[tokio::test]
async fn historical_run_reads_questions_from_its_pinned_snapshot() {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let benchmark = store
        .insert_benchmark(
            &BenchmarkDraft {
                project_id: "p1".into(),
                name: "CRM tools".into(),
                scenario: "crm".into(),
                target_roles: vec![],
                questions_per_stage: 1,
            },
            BenchmarkStatus::Draft,
        )
        .unwrap();
    let set = QuestionSet::new(store.clone());
    let (question, _) = set
        .add("p1", benchmark.id, &draft("Which CRM fits a small team?"))
        .unwrap();

    let runner = Runner::new(
        store.clone(),
        Arc::new(FakeSimulationClient::new("Acme", &["Globex".into()])),
        RunSettings::default(),
    );
    let run = runner
        .execute("p1", benchmark.id, &["chatgpt".into()], &["chat".into()])
        .await
        .unwrap();
    assert_eq!(run.benchmark_version, "1.1");

    // reword the question after the run
    set.update(
        "p1",
        benchmark.id,
        question.id,
        &QuestionPatch {
            text: Some("Completely different wording".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        store.get_benchmark("p1", benchmark.id).unwrap().current_version,
        "1.2"
    );

    // the run still reports the text it actually asked
    let rows = store.results_with_questions(&run).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.text, "Which CRM fits a small team?");
    assert_eq!(run.benchmark_version, "1.1");
}

#[tokio::test]
async fn deleting_a_run_leaves_versions_and_other_runs_alone() {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let benchmark = store
        .insert_benchmark(
            &BenchmarkDraft {
                project_id: "p1".into(),
                name: "CRM tools".into(),
                scenario: "crm".into(),
                target_roles: vec![],
                questions_per_stage: 1,
            },
            BenchmarkStatus::Draft,
        )
        .unwrap();
    let set = QuestionSet::new(store.clone());
    set.add("p1", benchmark.id, &draft("q1")).unwrap();

    let runner = Runner::new(
        store.clone(),
        Arc::new(FakeSimulationClient::new("Acme", &["Globex".into()])),
        RunSettings::default(),
    );
    let first = runner
        .execute("p1", benchmark.id, &["chatgpt".into()], &["chat".into()])
        .await
        .unwrap();
    let second = runner
        .execute("p1", benchmark.id, &["chatgpt".into()], &["chat".into()])
        .await
        .unwrap();

    store.delete_run("p1", first.id).unwrap();

    let remaining = store.list_runs("p1").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    // version history untouched; the pinned version still counts both runs
    let versions = store.list_versions("p1", benchmark.id).unwrap();
    let current = versions.iter().find(|v| v.is_current).unwrap();
    assert_eq!(current.run_count, 2);
}
