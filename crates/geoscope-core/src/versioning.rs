use crate::model::BenchmarkVersion;
use crate::storage::store::Store;
use crate::version::compare_versions;

/// Read/restore surface over the append-only version log. Snapshot writes
/// happen inside the question-set and benchmark mutations themselves; this
/// service owns ordering, lookup and restore.
pub struct VersionStore {
    store: Store,
}

impl VersionStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Newest first, by numeric (major, minor) — "1.10" sorts above "1.9".
    pub fn list(&self, project: &str, benchmark_id: i64) -> anyhow::Result<Vec<BenchmarkVersion>> {
        let mut versions = self.store.list_versions(project, benchmark_id)?;
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
        Ok(versions)
    }

    pub fn get(
        &self,
        project: &str,
        benchmark_id: i64,
        version_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        self.store.get_version(project, benchmark_id, version_id)
    }

    /// Re-materializes the snapshot as the live question set and appends a
    /// `restored` version; the source version is left untouched. Restoring
    /// the current version is rejected, restoring the same version twice
    /// yields two distinct forward versions with identical content.
    pub fn restore(
        &self,
        project: &str,
        benchmark_id: i64,
        version_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        let restored = self.store.restore_version(project, benchmark_id, version_id)?;
        tracing::info!(
            event = "version.restored",
            benchmark_id = benchmark_id,
            source_version_id = version_id,
            new_version = %restored.version,
        );
        Ok(restored)
    }

    /// Quick-undo target: the most recent non-current version that has been
    /// run against, falling back to the most recent non-current version.
    pub fn quick_undo_candidate(
        &self,
        project: &str,
        benchmark_id: i64,
    ) -> anyhow::Result<Option<BenchmarkVersion>> {
        let versions = self.list(project, benchmark_id)?;
        let candidate = versions
            .iter()
            .find(|v| !v.is_current && v.run_count > 0)
            .or_else(|| versions.iter().find(|v| !v.is_current))
            .cloned();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{try_map_error, CoreError};
    use crate::model::{
        BenchmarkDraft, BenchmarkStatus, QuestionDraft, QuestionIntent, QuestionSource,
        VersionChangeType,
    };

    fn fixture() -> (VersionStore, Store, i64) {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let b = store
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
        (VersionStore::new(store.clone()), store, b.id)
    }

    fn draft(text: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.into(),
            intent: QuestionIntent::Aware,
            persona_role: String::new(),
            persona_name: String::new(),
            keyword: String::new(),
            source: QuestionSource::Manual,
        }
    }

    #[test]
    fn list_orders_numerically_not_lexically() {
        let (versions, store, benchmark_id) = fixture();
        // walk the minor component into double digits
        for i in 0..10 {
            store
                .add_question("p1", benchmark_id, &draft(&format!("q{}", i)))
                .unwrap();
        }
        let listed = versions.list("p1", benchmark_id).unwrap();
        assert_eq!(listed.first().unwrap().version, "1.10");
        assert_eq!(listed.last().unwrap().version, "1.0");
        // "1.10" must sort above "1.9"
        let labels: Vec<&str> = listed.iter().map(|v| v.version.as_str()).collect();
        let pos_110 = labels.iter().position(|v| *v == "1.10").unwrap();
        let pos_19 = labels.iter().position(|v| *v == "1.9").unwrap();
        assert!(pos_110 < pos_19);
    }

    #[test]
    fn restore_rematerializes_snapshot_and_moves_forward() {
        let (versions, store, benchmark_id) = fixture();
        let (q1, _) = store.add_question("p1", benchmark_id, &draft("original")).unwrap();
        let old = versions.list("p1", benchmark_id).unwrap()[0].clone();
        assert_eq!(old.version, "1.1");

        store.delete_question("p1", benchmark_id, q1.id).unwrap();
        store.add_question("p1", benchmark_id, &draft("replacement")).unwrap();

        let restored = versions.restore("p1", benchmark_id, old.id).unwrap();
        assert_eq!(restored.version, "1.4");
        assert_eq!(restored.change_type, VersionChangeType::Restored);
        assert_eq!(restored.snapshot.questions, old.snapshot.questions);

        // source version untouched, new version current
        let listed = versions.list("p1", benchmark_id).unwrap();
        let source = listed.iter().find(|v| v.id == old.id).unwrap();
        assert!(!source.is_current);
        assert!(listed.iter().find(|v| v.id == restored.id).unwrap().is_current);

        // live set equals the restored snapshot
        let live = store.list_questions("p1", benchmark_id).unwrap();
        assert_eq!(live, old.snapshot.questions);
    }

    #[test]
    fn restore_twice_yields_two_forward_versions() {
        let (versions, store, benchmark_id) = fixture();
        store.add_question("p1", benchmark_id, &draft("one")).unwrap();
        let old = versions.list("p1", benchmark_id).unwrap()[0].clone();
        store.add_question("p1", benchmark_id, &draft("two")).unwrap();

        let first = versions.restore("p1", benchmark_id, old.id).unwrap();
        let second = versions.restore("p1", benchmark_id, old.id).unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.version, second.version);
        assert_eq!(first.snapshot.questions, second.snapshot.questions);
    }

    #[test]
    fn restoring_current_version_is_invalid_state() {
        let (versions, store, benchmark_id) = fixture();
        store.add_question("p1", benchmark_id, &draft("one")).unwrap();
        let current = versions.list("p1", benchmark_id).unwrap()[0].clone();
        assert!(current.is_current);
        let err = versions.restore("p1", benchmark_id, current.id).unwrap_err();
        assert!(matches!(
            try_map_error(&err).unwrap(),
            CoreError::InvalidState { .. }
        ));
    }

    #[test]
    fn restoring_unknown_version_is_not_found() {
        let (versions, _store, benchmark_id) = fixture();
        let err = versions.restore("p1", benchmark_id, 9999).unwrap_err();
        assert!(matches!(
            try_map_error(&err).unwrap(),
            CoreError::NotFound { entity: "version", .. }
        ));
    }

    #[test]
    fn quick_undo_prefers_run_against_versions() {
        let (versions, store, benchmark_id) = fixture();
        store.add_question("p1", benchmark_id, &draft("one")).unwrap();
        // run pins and bumps the current (1.1) version's run_count
        store
            .begin_run("p1", benchmark_id, &["chatgpt".into()], &["chat".into()])
            .unwrap();
        store
            .set_benchmark_status(benchmark_id, BenchmarkStatus::Ready)
            .unwrap();
        // two more edits so 1.1 is no longer current
        store.add_question("p1", benchmark_id, &draft("two")).unwrap();
        store.add_question("p1", benchmark_id, &draft("three")).unwrap();

        let candidate = versions
            .quick_undo_candidate("p1", benchmark_id)
            .unwrap()
            .expect("candidate expected");
        assert_eq!(candidate.version, "1.1");
        assert!(candidate.run_count > 0);
    }

    #[test]
    fn quick_undo_falls_back_to_most_recent_non_current() {
        let (versions, store, benchmark_id) = fixture();
        store.add_question("p1", benchmark_id, &draft("one")).unwrap();
        store.add_question("p1", benchmark_id, &draft("two")).unwrap();
        let candidate = versions
            .quick_undo_candidate("p1", benchmark_id)
            .unwrap()
            .expect("candidate expected");
        // no version has runs; newest non-current wins
        assert_eq!(candidate.version, "1.1");
        assert_eq!(candidate.run_count, 0);
    }
}
