use crate::errors::CoreError;
use crate::model::{
    Benchmark, BenchmarkDraft, BenchmarkPatch, BenchmarkStatus, BenchmarkVersion,
    CompetitorAnalysis, EngineResponse, Frequency, Question, QuestionDraft, QuestionPatch,
    QuestionIntent, QuestionSource, ResultOutcome, Run, RunProgress, RunStatus, RunSummary,
    ScheduledTask, Sentiment, SimulationResult, SnapshotMeta, TaskDraft, VersionChangeType,
    VersionSnapshot,
};
use crate::version::{bump_minor, INITIAL_VERSION};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

const BENCHMARK_COLS: &str = "id, project_id, name, scenario, target_roles_json, \
     questions_per_stage, total_questions, status, is_active, current_version, created_at";

const QUESTION_COLS: &str =
    "id, benchmark_id, text, intent, persona_role, persona_name, keyword, source, \
     is_relevant, is_approved";

const VERSION_COLS: &str = "id, benchmark_id, version, change_type, change_summary, \
     run_count, is_current, created_at, snapshot_json";

const TASK_COLS: &str = "id, project_id, benchmark_id, name, engines_json, channels_json, \
     frequency, day_of_week, day_of_month, time_of_day, enabled, last_run_at, next_run_at, \
     last_run_id, last_run_status, run_count";

const RUN_COLS: &str = "id, project_id, benchmark_id, benchmark_version, engines_json, \
     channels_json, status, total_pairs, completed_pairs, failed_pairs, created_at, \
     visibility_rate, avg_ranking, danger_count, total_results";

const RESULT_COLS: &str = "id, run_id, question_id, engine, channel, outcome, response_text, \
     sentiment, brand_mentioned, competitor_mentioned, competitors_json, ranking, sources_json, \
     risk_flags_json, cta, visibility_score, error";

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // --- benchmarks ---

    pub fn insert_benchmark(
        &self,
        draft: &BenchmarkDraft,
        status: BenchmarkStatus,
    ) -> anyhow::Result<Benchmark> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO benchmarks(project_id, name, scenario, target_roles_json, \
             questions_per_stage, total_questions, status, is_active, current_version, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 1, ?7, ?8)",
            params![
                draft.project_id,
                draft.name,
                draft.scenario,
                serde_json::to_string(&draft.target_roles)?,
                draft.questions_per_stage as i64,
                status.as_str(),
                INITIAL_VERSION,
                now_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        snapshot_in_tx(&tx, id, VersionChangeType::Initial, "benchmark created")?;
        let benchmark = benchmark_in_tx(&tx, id)?;
        tx.commit()?;
        Ok(benchmark)
    }

    pub fn get_benchmark(&self, project: &str, id: i64) -> anyhow::Result<Benchmark> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, id)
    }

    pub fn list_benchmarks(&self, project: &str) -> anyhow::Result<Vec<Benchmark>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM benchmarks WHERE project_id=?1 ORDER BY id ASC",
            BENCHMARK_COLS
        ))?;
        let rows = stmt.query_map(params![project], benchmark_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Metadata edit; snapshots a benchmark_updated version in the same
    /// transaction.
    pub fn update_benchmark(
        &self,
        project: &str,
        id: i64,
        patch: &BenchmarkPatch,
    ) -> anyhow::Result<(Benchmark, BenchmarkVersion)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let current = benchmark_for_project(&tx, project, id)?;
        let name = patch.name.clone().unwrap_or(current.name);
        let scenario = patch.scenario.clone().unwrap_or(current.scenario);
        let roles = patch.target_roles.clone().unwrap_or(current.target_roles);
        let qps = patch.questions_per_stage.unwrap_or(current.questions_per_stage);
        tx.execute(
            "UPDATE benchmarks SET name=?1, scenario=?2, target_roles_json=?3, \
             questions_per_stage=?4 WHERE id=?5",
            params![name, scenario, serde_json::to_string(&roles)?, qps as i64, id],
        )?;
        let version = snapshot_in_tx(
            &tx,
            id,
            VersionChangeType::BenchmarkUpdated,
            "benchmark metadata updated",
        )?;
        let benchmark = benchmark_in_tx(&tx, id)?;
        tx.commit()?;
        Ok((benchmark, version))
    }

    pub fn set_benchmark_status(&self, id: i64, status: BenchmarkStatus) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE benchmarks SET status=?1 WHERE id=?2",
            params![status.as_str(), id],
        )?;
        if n == 0 {
            return Err(CoreError::not_found("benchmark", id).into());
        }
        Ok(())
    }

    pub fn set_benchmark_active(
        &self,
        project: &str,
        id: i64,
        active: bool,
    ) -> anyhow::Result<Benchmark> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, id)?;
        conn.execute(
            "UPDATE benchmarks SET is_active=?1 WHERE id=?2",
            params![active, id],
        )?;
        benchmark_for_project(&conn, project, id)
    }

    /// Removes the benchmark, its questions and its version history. Runs
    /// already produced against it are historical data and survive.
    pub fn delete_benchmark(&self, project: &str, id: i64) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        benchmark_for_project(&tx, project, id)?;
        tx.execute("DELETE FROM questions WHERE benchmark_id=?1", params![id])?;
        tx.execute(
            "DELETE FROM benchmark_versions WHERE benchmark_id=?1",
            params![id],
        )?;
        tx.execute("DELETE FROM benchmarks WHERE id=?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // --- questions ---

    pub fn list_questions(&self, project: &str, benchmark_id: i64) -> anyhow::Result<Vec<Question>> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, benchmark_id)?;
        questions_in_tx(&conn, benchmark_id)
    }

    pub fn add_question(
        &self,
        project: &str,
        benchmark_id: i64,
        draft: &QuestionDraft,
    ) -> anyhow::Result<(Question, BenchmarkVersion)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let benchmark = benchmark_for_project(&tx, project, benchmark_id)?;
        let question = insert_question_in_tx(&tx, benchmark_id, draft)?;
        // A draft benchmark becomes runnable once it holds questions.
        if benchmark.status == BenchmarkStatus::Draft {
            tx.execute(
                "UPDATE benchmarks SET status=?1 WHERE id=?2",
                params![BenchmarkStatus::Ready.as_str(), benchmark_id],
            )?;
        }
        let version = snapshot_in_tx(
            &tx,
            benchmark_id,
            VersionChangeType::QuestionAdded,
            &format!("added question #{}", question.id),
        )?;
        tx.commit()?;
        Ok((question, version))
    }

    pub fn update_question(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        patch: &QuestionPatch,
    ) -> anyhow::Result<(Question, BenchmarkVersion)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        benchmark_for_project(&tx, project, benchmark_id)?;
        let current = question_in_tx(&tx, benchmark_id, question_id)?;
        let text = patch.text.clone().unwrap_or(current.text);
        let intent = patch.intent.unwrap_or(current.intent);
        let persona_role = patch.persona_role.clone().unwrap_or(current.persona_role);
        let keyword = patch.keyword.clone().unwrap_or(current.keyword);
        tx.execute(
            "UPDATE questions SET text=?1, intent=?2, persona_role=?3, keyword=?4 WHERE id=?5",
            params![text, intent.as_str(), persona_role, keyword, question_id],
        )?;
        let version = snapshot_in_tx(
            &tx,
            benchmark_id,
            VersionChangeType::QuestionModified,
            &format!("modified question #{}", question_id),
        )?;
        let question = question_in_tx(&tx, benchmark_id, question_id)?;
        tx.commit()?;
        Ok((question, version))
    }

    pub fn delete_question(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        benchmark_for_project(&tx, project, benchmark_id)?;
        question_in_tx(&tx, benchmark_id, question_id)?;
        tx.execute("DELETE FROM questions WHERE id=?1", params![question_id])?;
        let version = snapshot_in_tx(
            &tx,
            benchmark_id,
            VersionChangeType::QuestionDeleted,
            &format!("deleted question #{}", question_id),
        )?;
        tx.commit()?;
        Ok(version)
    }

    /// Approval is a review flag, not a structural change: no snapshot.
    pub fn set_question_approved(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        approved: bool,
    ) -> anyhow::Result<Question> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, benchmark_id)?;
        question_in_tx(&conn, benchmark_id, question_id)?;
        conn.execute(
            "UPDATE questions SET is_approved=?1 WHERE id=?2",
            params![approved, question_id],
        )?;
        question_in_tx(&conn, benchmark_id, question_id)
    }

    pub fn set_question_relevance(
        &self,
        project: &str,
        benchmark_id: i64,
        question_id: i64,
        relevant: bool,
    ) -> anyhow::Result<Question> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, benchmark_id)?;
        question_in_tx(&conn, benchmark_id, question_id)?;
        conn.execute(
            "UPDATE questions SET is_relevant=?1 WHERE id=?2",
            params![relevant, question_id],
        )?;
        question_in_tx(&conn, benchmark_id, question_id)
    }

    /// Generation path: inserts without a snapshot; the caller records one
    /// version for the whole batch via [`Store::finish_generation`].
    pub fn insert_question_raw(
        &self,
        benchmark_id: i64,
        draft: &QuestionDraft,
    ) -> anyhow::Result<Question> {
        let conn = self.conn.lock().unwrap();
        insert_question_in_tx(&conn, benchmark_id, draft)
    }

    pub fn finish_generation(
        &self,
        benchmark_id: i64,
        summary: &str,
    ) -> anyhow::Result<(Benchmark, BenchmarkVersion)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let version = snapshot_in_tx(
            &tx,
            benchmark_id,
            VersionChangeType::QuestionAdded,
            summary,
        )?;
        tx.execute(
            "UPDATE benchmarks SET status=?1 WHERE id=?2 AND status=?3",
            params![
                BenchmarkStatus::Ready.as_str(),
                benchmark_id,
                BenchmarkStatus::Generating.as_str()
            ],
        )?;
        let benchmark = benchmark_in_tx(&tx, benchmark_id)?;
        tx.commit()?;
        Ok((benchmark, version))
    }

    pub fn fail_generation(&self, benchmark_id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE benchmarks SET status=?1 WHERE id=?2 AND status=?3",
            params![
                BenchmarkStatus::Draft.as_str(),
                benchmark_id,
                BenchmarkStatus::Generating.as_str()
            ],
        )?;
        Ok(())
    }

    // --- versions ---

    pub fn list_versions(
        &self,
        project: &str,
        benchmark_id: i64,
    ) -> anyhow::Result<Vec<BenchmarkVersion>> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, benchmark_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM benchmark_versions WHERE benchmark_id=?1 ORDER BY id ASC",
            VERSION_COLS
        ))?;
        let rows = stmt.query_map(params![benchmark_id], version_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn get_version(
        &self,
        project: &str,
        benchmark_id: i64,
        version_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, project, benchmark_id)?;
        version_in_tx(&conn, benchmark_id, version_id)
    }

    /// Materializes an old snapshot's questions as the live set and appends
    /// a `restored` version; the restored-from version is never touched.
    pub fn restore_version(
        &self,
        project: &str,
        benchmark_id: i64,
        version_id: i64,
    ) -> anyhow::Result<BenchmarkVersion> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        benchmark_for_project(&tx, project, benchmark_id)?;
        let source = version_in_tx(&tx, benchmark_id, version_id)?;
        if source.is_current {
            return Err(CoreError::invalid_state(format!(
                "version {} is already current",
                source.version
            ))
            .into());
        }
        tx.execute(
            "DELETE FROM questions WHERE benchmark_id=?1",
            params![benchmark_id],
        )?;
        for q in &source.snapshot.questions {
            // Question ids are never recycled by sqlite, so re-inserting the
            // snapshot rows under their original ids preserves identity.
            tx.execute(
                "INSERT INTO questions(id, benchmark_id, text, intent, persona_role, \
                 persona_name, keyword, source, is_relevant, is_approved) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    q.id,
                    benchmark_id,
                    q.text,
                    q.intent.as_str(),
                    q.persona_role,
                    q.persona_name,
                    q.keyword,
                    q.source.as_str(),
                    q.is_relevant,
                    q.is_approved,
                ],
            )?;
        }
        let version = snapshot_in_tx(
            &tx,
            benchmark_id,
            VersionChangeType::Restored,
            &format!("restored from version {}", source.version),
        )?;
        tx.commit()?;
        Ok(version)
    }

    // --- scheduled tasks ---

    pub fn insert_task(
        &self,
        draft: &TaskDraft,
        next_run_at: DateTime<Utc>,
    ) -> anyhow::Result<ScheduledTask> {
        let conn = self.conn.lock().unwrap();
        benchmark_for_project(&conn, &draft.project_id, draft.benchmark_id)?;
        conn.execute(
            "INSERT INTO scheduled_tasks(project_id, benchmark_id, name, engines_json, \
             channels_json, frequency, day_of_week, day_of_month, time_of_day, enabled, \
             next_run_at, run_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, 0)",
            params![
                draft.project_id,
                draft.benchmark_id,
                draft.name,
                serde_json::to_string(&draft.engines)?,
                serde_json::to_string(&draft.channels)?,
                draft.frequency.as_str(),
                draft.day_of_week.map(i64::from),
                draft.day_of_month.map(i64::from),
                draft.time,
                next_run_at.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        task_in_tx(&conn, &draft.project_id, id)
    }

    pub fn get_task(&self, project: &str, id: i64) -> anyhow::Result<ScheduledTask> {
        let conn = self.conn.lock().unwrap();
        task_in_tx(&conn, project, id)
    }

    pub fn list_tasks(&self, project: &str) -> anyhow::Result<Vec<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scheduled_tasks WHERE project_id=?1 ORDER BY id ASC",
            TASK_COLS
        ))?;
        let rows = stmt.query_map(params![project], task_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn update_task_row(&self, task: &ScheduledTask) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE scheduled_tasks SET name=?1, engines_json=?2, channels_json=?3, \
             frequency=?4, day_of_week=?5, day_of_month=?6, time_of_day=?7, enabled=?8, \
             last_run_at=?9, next_run_at=?10, last_run_id=?11, last_run_status=?12, \
             run_count=?13 WHERE id=?14 AND project_id=?15",
            params![
                task.name,
                serde_json::to_string(&task.engines)?,
                serde_json::to_string(&task.channels)?,
                task.frequency.as_str(),
                task.day_of_week.map(i64::from),
                task.day_of_month.map(i64::from),
                task.time,
                task.enabled,
                task.last_run_at.map(|t| t.to_rfc3339()),
                task.next_run_at.to_rfc3339(),
                task.last_run_id,
                task.last_run_status.map(|s| s.as_str()),
                task.run_count as i64,
                task.id,
                task.project_id,
            ],
        )?;
        if n == 0 {
            return Err(CoreError::not_found("scheduled task", task.id).into());
        }
        Ok(())
    }

    pub fn delete_task(&self, project: &str, id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM scheduled_tasks WHERE id=?1 AND project_id=?2",
            params![id, project],
        )?;
        if n == 0 {
            return Err(CoreError::not_found("scheduled task", id).into());
        }
        Ok(())
    }

    // --- runs ---

    /// Single transaction: checks the benchmark is ready (the `running`
    /// status doubles as the no-overlap flag), pins the current version,
    /// creates the run and bumps the pinned version's run_count.
    pub fn begin_run(
        &self,
        project: &str,
        benchmark_id: i64,
        engines: &[String],
        channels: &[String],
    ) -> anyhow::Result<(Run, Vec<Question>)> {
        if engines.is_empty() {
            return Err(CoreError::validation("engines", "at least one engine is required").into());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let benchmark = benchmark_for_project(&tx, project, benchmark_id)?;
        match benchmark.status {
            BenchmarkStatus::Ready => {}
            BenchmarkStatus::Running => {
                return Err(CoreError::invalid_state(format!(
                    "benchmark {} already has a run in flight",
                    benchmark_id
                ))
                .into());
            }
            other => {
                return Err(CoreError::invalid_state(format!(
                    "benchmark {} must be ready to start a run (status: {})",
                    benchmark_id,
                    other.as_str()
                ))
                .into());
            }
        }
        let questions = questions_in_tx(&tx, benchmark_id)?;
        if questions.is_empty() {
            return Err(CoreError::validation("questions", "benchmark has no questions").into());
        }
        let total = (questions.len() * engines.len()) as i64;
        tx.execute(
            "INSERT INTO runs(project_id, benchmark_id, benchmark_version, engines_json, \
             channels_json, status, total_pairs, completed_pairs, failed_pairs, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8)",
            params![
                project,
                benchmark_id,
                benchmark.current_version,
                serde_json::to_string(&engines)?,
                serde_json::to_string(&channels)?,
                RunStatus::Running.as_str(),
                total,
                now_rfc3339(),
            ],
        )?;
        let run_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE benchmarks SET status=?1 WHERE id=?2",
            params![BenchmarkStatus::Running.as_str(), benchmark_id],
        )?;
        tx.execute(
            "UPDATE benchmark_versions SET run_count=run_count+1 \
             WHERE benchmark_id=?1 AND is_current=1",
            params![benchmark_id],
        )?;
        let run = run_in_tx(&tx, run_id)?;
        tx.commit()?;
        Ok((run, questions))
    }

    /// Result insert and progress bump are one transaction so counters can
    /// never drift from the rows behind them.
    pub fn record_success(
        &self,
        run_id: i64,
        question_id: i64,
        engine: &str,
        resp: &EngineResponse,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO results(run_id, question_id, engine, channel, outcome, response_text, \
             sentiment, brand_mentioned, competitor_mentioned, competitors_json, ranking, \
             sources_json, risk_flags_json, cta, visibility_score, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                run_id,
                question_id,
                engine,
                resp.channel,
                ResultOutcome::Ok.as_str(),
                resp.text,
                resp.sentiment.as_str(),
                resp.brand_mentioned,
                resp.competitor_mentioned,
                serde_json::to_string(&resp.competitors_mentioned)?,
                resp.ranking,
                serde_json::to_string(&resp.sources)?,
                serde_json::to_string(&resp.risk_flags)?,
                resp.cta,
                resp.visibility_score as i64,
                now_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE runs SET completed_pairs=completed_pairs+1 WHERE id=?1",
            params![run_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn record_failure(
        &self,
        run_id: i64,
        question_id: i64,
        engine: &str,
        channel: &str,
        error: &str,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO results(run_id, question_id, engine, channel, outcome, error, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                question_id,
                engine,
                channel,
                ResultOutcome::Failed.as_str(),
                error,
                now_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE runs SET failed_pairs=failed_pairs+1 WHERE id=?1",
            params![run_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Final atomic transition once every pair has settled: writes the
    /// summary and hands the benchmark back to `ready` in one transaction.
    /// Failed pairs never enter the visibility/ranking aggregates.
    pub fn finalize_run(&self, run_id: i64) -> anyhow::Result<Run> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let run = run_in_tx(&tx, run_id)?;
        if !run.progress.is_settled() {
            return Err(CoreError::invalid_state(format!(
                "run {} has unsettled pairs ({}/{} resolved)",
                run_id,
                run.progress.completed + run.progress.failed,
                run.progress.total
            ))
            .into());
        }
        let (ok_count, mentioned, dangerous, avg_ranking): (i64, i64, i64, Option<f64>) = tx
            .query_row(
                "SELECT COUNT(*), \
                 COALESCE(SUM(CASE WHEN brand_mentioned=1 THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN competitor_mentioned=1 AND brand_mentioned=0 \
                     THEN 1 ELSE 0 END), 0), \
                 AVG(CASE WHEN brand_mentioned=1 THEN ranking END) \
                 FROM results WHERE run_id=?1 AND outcome='ok'",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        let visibility_rate = if ok_count > 0 {
            mentioned as f64 / ok_count as f64
        } else {
            0.0
        };
        let status = if run.progress.completed == 0 && run.progress.total > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        tx.execute(
            "UPDATE runs SET status=?1, visibility_rate=?2, avg_ranking=?3, danger_count=?4, \
             total_results=?5 WHERE id=?6",
            params![
                status.as_str(),
                visibility_rate,
                avg_ranking,
                dangerous,
                ok_count,
                run_id
            ],
        )?;
        tx.execute(
            "UPDATE benchmarks SET status=?1 WHERE id=?2 AND status=?3",
            params![
                BenchmarkStatus::Ready.as_str(),
                run.benchmark_id,
                BenchmarkStatus::Running.as_str()
            ],
        )?;
        let run = run_in_tx(&tx, run_id)?;
        tx.commit()?;
        Ok(run)
    }

    pub fn get_run(&self, project: &str, id: i64) -> anyhow::Result<Run> {
        let conn = self.conn.lock().unwrap();
        let run = run_in_tx(&conn, id)?;
        if run.project_id != project {
            return Err(CoreError::not_found("run", id).into());
        }
        Ok(run)
    }

    pub fn list_runs(&self, project: &str) -> anyhow::Result<Vec<Run>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM runs WHERE project_id=?1 ORDER BY id ASC",
            RUN_COLS
        ))?;
        let rows = stmt.query_map(params![project], run_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn latest_completed_run(&self, project: &str) -> anyhow::Result<Option<Run>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM runs WHERE project_id=?1 AND status=?2 ORDER BY id DESC LIMIT 1",
            RUN_COLS
        ))?;
        let run = stmt
            .query_row(params![project, RunStatus::Completed.as_str()], run_from_row)
            .optional()?;
        Ok(run)
    }

    pub fn delete_run(&self, project: &str, id: i64) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let run = run_in_tx(&tx, id)?;
        if run.project_id != project {
            return Err(CoreError::not_found("run", id).into());
        }
        tx.execute("DELETE FROM results WHERE run_id=?1", params![id])?;
        tx.execute("DELETE FROM runs WHERE id=?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // --- results ---

    pub fn list_results(
        &self,
        run_id: i64,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<(Vec<SimulationResult>, u64)> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM results WHERE run_id=?1",
            params![run_id],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM results WHERE run_id=?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
            RESULT_COLS
        ))?;
        let rows = stmt.query_map(
            params![run_id, limit as i64, offset as i64],
            result_from_row,
        )?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok((out, total as u64))
    }

    pub fn get_result(&self, result_id: i64) -> anyhow::Result<SimulationResult> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM results WHERE id=?1",
            RESULT_COLS
        ))?;
        stmt.query_row(params![result_id], result_from_row)
            .optional()?
            .ok_or_else(|| CoreError::not_found("result", result_id).into())
    }

    /// Pairs each of a run's results with the question it exercised, taken
    /// from the version snapshot the run was pinned to (later edits to the
    /// live set must not leak into historical runs).
    pub fn results_with_questions(
        &self,
        run: &Run,
    ) -> anyhow::Result<Vec<(SimulationResult, Question)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM results WHERE run_id=?1 ORDER BY id ASC",
            RESULT_COLS
        ))?;
        let rows = stmt.query_map(params![run.id], result_from_row)?;
        let mut results = Vec::new();
        for r in rows {
            results.push(r?);
        }

        let snapshot_json: Option<String> = conn
            .query_row(
                "SELECT snapshot_json FROM benchmark_versions \
                 WHERE benchmark_id=?1 AND version=?2 ORDER BY id DESC LIMIT 1",
                params![run.benchmark_id, run.benchmark_version],
                |row| row.get(0),
            )
            .optional()?;
        let mut by_id = std::collections::HashMap::new();
        if let Some(raw) = snapshot_json {
            let snapshot: VersionSnapshot =
                serde_json::from_str(&raw).context("corrupt version snapshot")?;
            for q in snapshot.questions {
                by_id.insert(q.id, q);
            }
        }
        // Fall back to the live table for anything the snapshot lacks.
        for q in questions_in_tx(&conn, run.benchmark_id)? {
            by_id.entry(q.id).or_insert(q);
        }

        let mut out = Vec::new();
        for r in results {
            match by_id.get(&r.question_id) {
                Some(q) => out.push((r, q.clone())),
                None => {
                    tracing::warn!(
                        event = "results.question_missing",
                        run_id = run.id,
                        question_id = r.question_id,
                        "result references a question absent from snapshot and live set"
                    );
                }
            }
        }
        Ok(out)
    }

    // --- competitor analysis cache ---

    pub fn get_analysis(&self, result_id: i64) -> anyhow::Result<Option<CompetitorAnalysis>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT analysis_json FROM results WHERE id=?1",
                params![result_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            None => Err(CoreError::not_found("result", result_id).into()),
            Some(None) => Ok(None),
            Some(Some(s)) => Ok(serde_json::from_str(&s).ok()),
        }
    }

    pub fn put_analysis(
        &self,
        result_id: i64,
        analysis: &CompetitorAnalysis,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE results SET analysis_json=?1 WHERE id=?2",
            params![serde_json::to_string(analysis)?, result_id],
        )?;
        if n == 0 {
            return Err(CoreError::not_found("result", result_id).into());
        }
        Ok(())
    }
}

// --- row mapping ---

fn benchmark_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Benchmark> {
    Ok(Benchmark {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        scenario: row.get(3)?,
        target_roles: json_list(&row.get::<_, String>(4)?),
        questions_per_stage: row.get::<_, i64>(5)? as u32,
        total_questions: row.get::<_, i64>(6)? as u32,
        status: BenchmarkStatus::parse(&row.get::<_, String>(7)?),
        is_active: row.get(8)?,
        current_version: row.get(9)?,
        created_at: parse_ts(&row.get::<_, String>(10)?),
    })
}

fn question_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        benchmark_id: row.get(1)?,
        text: row.get(2)?,
        intent: QuestionIntent::parse(&row.get::<_, String>(3)?),
        persona_role: row.get(4)?,
        persona_name: row.get(5)?,
        keyword: row.get(6)?,
        source: QuestionSource::parse(&row.get::<_, String>(7)?),
        is_relevant: row.get(8)?,
        is_approved: row.get(9)?,
    })
}

fn version_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BenchmarkVersion> {
    let raw: String = row.get(8)?;
    let snapshot: VersionSnapshot = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(BenchmarkVersion {
        id: row.get(0)?,
        benchmark_id: row.get(1)?,
        version: row.get(2)?,
        change_type: VersionChangeType::parse(&row.get::<_, String>(3)?),
        change_summary: row.get(4)?,
        run_count: row.get::<_, i64>(5)? as u32,
        is_current: row.get(6)?,
        created_at: parse_ts(&row.get::<_, String>(7)?),
        snapshot,
    })
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.get(0)?,
        project_id: row.get(1)?,
        benchmark_id: row.get(2)?,
        name: row.get(3)?,
        engines: json_list(&row.get::<_, String>(4)?),
        channels: json_list(&row.get::<_, String>(5)?),
        frequency: Frequency::parse(&row.get::<_, String>(6)?),
        day_of_week: row.get::<_, Option<i64>>(7)?.map(|v| v as u8),
        day_of_month: row.get::<_, Option<i64>>(8)?.map(|v| v as u8),
        time: row.get(9)?,
        enabled: row.get(10)?,
        last_run_at: row.get::<_, Option<String>>(11)?.map(|s| parse_ts(&s)),
        next_run_at: parse_ts(&row.get::<_, String>(12)?),
        last_run_id: row.get(13)?,
        last_run_status: row
            .get::<_, Option<String>>(14)?
            .map(|s| RunStatus::parse(&s)),
        run_count: row.get::<_, i64>(15)? as u32,
    })
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Run> {
    let visibility_rate: Option<f64> = row.get(11)?;
    let summary = visibility_rate.map(|rate| RunSummary {
        visibility_rate: rate,
        avg_ranking: row.get(12).unwrap_or(None),
        danger_count: row.get::<_, Option<i64>>(13).unwrap_or(None).unwrap_or(0) as u32,
        total_results: row.get::<_, Option<i64>>(14).unwrap_or(None).unwrap_or(0) as u32,
    });
    Ok(Run {
        id: row.get(0)?,
        project_id: row.get(1)?,
        benchmark_id: row.get(2)?,
        benchmark_version: row.get(3)?,
        engines: json_list(&row.get::<_, String>(4)?),
        channels: json_list(&row.get::<_, String>(5)?),
        status: RunStatus::parse(&row.get::<_, String>(6)?),
        progress: RunProgress {
            total: row.get::<_, i64>(7)? as u32,
            completed: row.get::<_, i64>(8)? as u32,
            failed: row.get::<_, i64>(9)? as u32,
        },
        created_at: parse_ts(&row.get::<_, String>(10)?),
        summary,
    })
}

fn result_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SimulationResult> {
    Ok(SimulationResult {
        id: row.get(0)?,
        run_id: row.get(1)?,
        question_id: row.get(2)?,
        engine: row.get(3)?,
        channel: row.get(4)?,
        outcome: ResultOutcome::parse(&row.get::<_, String>(5)?),
        simulated_response: row.get(6)?,
        sentiment: Sentiment::parse(&row.get::<_, String>(7)?),
        brand_mentioned: row.get(8)?,
        competitor_mentioned: row.get(9)?,
        competitors_mentioned: json_list(&row.get::<_, String>(10)?),
        ranking: row.get(11)?,
        sources: json_list(&row.get::<_, String>(12)?),
        risk_flags: json_list(&row.get::<_, String>(13)?),
        cta: row.get(14)?,
        visibility_score: row.get::<_, i64>(15)? as u8,
        error: row.get(16)?,
    })
}

// --- in-transaction helpers (Transaction derefs to Connection) ---

fn benchmark_in_tx(conn: &Connection, id: i64) -> anyhow::Result<Benchmark> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM benchmarks WHERE id=?1",
        BENCHMARK_COLS
    ))?;
    stmt.query_row(params![id], benchmark_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("benchmark", id).into())
}

fn benchmark_for_project(conn: &Connection, project: &str, id: i64) -> anyhow::Result<Benchmark> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM benchmarks WHERE id=?1 AND project_id=?2",
        BENCHMARK_COLS
    ))?;
    stmt.query_row(params![id, project], benchmark_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("benchmark", id).into())
}

fn questions_in_tx(conn: &Connection, benchmark_id: i64) -> anyhow::Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions WHERE benchmark_id=?1 ORDER BY id ASC",
        QUESTION_COLS
    ))?;
    let rows = stmt.query_map(params![benchmark_id], question_from_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn question_in_tx(
    conn: &Connection,
    benchmark_id: i64,
    question_id: i64,
) -> anyhow::Result<Question> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions WHERE id=?1 AND benchmark_id=?2",
        QUESTION_COLS
    ))?;
    stmt.query_row(params![question_id, benchmark_id], question_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("question", question_id).into())
}

fn version_in_tx(
    conn: &Connection,
    benchmark_id: i64,
    version_id: i64,
) -> anyhow::Result<BenchmarkVersion> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM benchmark_versions WHERE id=?1 AND benchmark_id=?2",
        VERSION_COLS
    ))?;
    stmt.query_row(params![version_id, benchmark_id], version_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("version", version_id).into())
}

fn task_in_tx(conn: &Connection, project: &str, id: i64) -> anyhow::Result<ScheduledTask> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM scheduled_tasks WHERE id=?1 AND project_id=?2",
        TASK_COLS
    ))?;
    stmt.query_row(params![id, project], task_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("scheduled task", id).into())
}

fn run_in_tx(conn: &Connection, id: i64) -> anyhow::Result<Run> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM runs WHERE id=?1", RUN_COLS))?;
    stmt.query_row(params![id], run_from_row)
        .optional()?
        .ok_or_else(|| CoreError::not_found("run", id).into())
}

fn insert_question_in_tx(
    conn: &Connection,
    benchmark_id: i64,
    draft: &QuestionDraft,
) -> anyhow::Result<Question> {
    conn.execute(
        "INSERT INTO questions(benchmark_id, text, intent, persona_role, persona_name, \
         keyword, source, is_relevant, is_approved) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, 0)",
        params![
            benchmark_id,
            draft.text,
            draft.intent.as_str(),
            draft.persona_role,
            draft.persona_name,
            draft.keyword,
            draft.source.as_str(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    question_in_tx(conn, benchmark_id, id)
}

/// Appends a new version capturing the benchmark and its full question list
/// by value, flips the current pointer, and refreshes the derived columns on
/// the benchmark row. Must run inside the same transaction as the mutation
/// that triggered it.
fn snapshot_in_tx(
    conn: &Connection,
    benchmark_id: i64,
    change_type: VersionChangeType,
    summary: &str,
) -> anyhow::Result<BenchmarkVersion> {
    let benchmark = benchmark_in_tx(conn, benchmark_id)?;
    let questions = questions_in_tx(conn, benchmark_id)?;
    let version = if change_type == VersionChangeType::Initial {
        INITIAL_VERSION.to_string()
    } else {
        bump_minor(&benchmark.current_version)?
    };
    let snapshot = VersionSnapshot {
        benchmark: SnapshotMeta {
            name: benchmark.name.clone(),
            scenario: benchmark.scenario.clone(),
            target_roles: benchmark.target_roles.clone(),
            questions_per_stage: benchmark.questions_per_stage,
        },
        questions: questions.clone(),
    };
    let created_at = now_rfc3339();
    conn.execute(
        "UPDATE benchmark_versions SET is_current=0 WHERE benchmark_id=?1 AND is_current=1",
        params![benchmark_id],
    )?;
    conn.execute(
        "INSERT INTO benchmark_versions(benchmark_id, version, change_type, change_summary, \
         run_count, is_current, created_at, snapshot_json) \
         VALUES (?1, ?2, ?3, ?4, 0, 1, ?5, ?6)",
        params![
            benchmark_id,
            version,
            change_type.as_str(),
            summary,
            created_at,
            serde_json::to_string(&snapshot)?,
        ],
    )?;
    let id = conn.last_insert_rowid();
    conn.execute(
        "UPDATE benchmarks SET current_version=?1, total_questions=?2 WHERE id=?3",
        params![version, questions.len() as i64, benchmark_id],
    )?;
    Ok(BenchmarkVersion {
        id,
        benchmark_id,
        version,
        change_type,
        change_summary: summary.to_string(),
        run_count: 0,
        is_current: true,
        created_at: parse_ts(&created_at),
        snapshot,
    })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn json_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
