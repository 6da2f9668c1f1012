use crate::errors::CoreError;
use crate::model::{BenchmarkVersion, Question, QuestionDraft, QuestionPatch};
use crate::storage::store::Store;

/// The mutable working set behind a benchmark's current version. Every
/// structural mutation lands together with exactly one version snapshot of
/// the matching change type; total_questions on the benchmark is refreshed
/// as part of the same write.
pub struct QuestionSet {
    store: Store,
}

impl QuestionSet {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list(&self, project: &str, benchmark_id: i64) -> anyhow::Result<Vec<Question>> {
        self.store.list_questions(project, benchmark_id)
    }

    pub fn add(
        &self,
        project: &str,
        benchmark_id: i64,
        draft: &QuestionDraft,
    ) -> anyhow::Result<(Question, BenchmarkVersion)> {
        if draft.text.trim().is_empty() {
            return Err(CoreError::validation("text", "must not be empty").into());
        }
        let (question, version) = self.store.add_question(project, benchmark_id, draft)?;
        tracing::debug!(
            event = "question.added",
            benchmark_id = benchmark_id,
            question_id = question.id,
            version = %version.version,
        );
        Ok((question, version))
    }

    pub fn update(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        patch: &QuestionPatch,
    ) -> anyhow::Result<(Question, BenchmarkVersion)> {
        if let Some(text) = &patch.text {
            if text.trim().is_empty() {
                return Err(CoreError::validation("text", "must not be empty").into());
            }
        }
        self.store
            .update_question(project, benchmark_id, question_id, patch)
    }

    pub fn delete(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        self.store.delete_question(project, benchmark_id, question_id)
    }

    pub fn approve(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        approved: bool,
    ) -> anyhow::Result<Question> {
        self.store
            .set_question_approved(project, benchmark_id, question_id, approved)
    }

    pub fn set_relevance(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        relevant: bool,
    ) -> anyhow::Result<Question> {
        self.store
            .set_question_relevance(project, benchmark_id, question_id, relevant)
    }
}
