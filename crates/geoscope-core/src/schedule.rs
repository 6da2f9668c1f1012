use crate::engine::runner::Runner;
use crate::errors::CoreError;
use crate::model::{
    BenchmarkStatus, Frequency, RunStatus, ScheduledTask, TaskDraft, TaskPatch,
};
use crate::storage::store::Store;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// "HH:MM", 24h clock.
const TIME_OF_DAY: &str = r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$";

pub fn parse_time_of_day(s: &str) -> anyhow::Result<(u32, u32)> {
    let re = regex::Regex::new(TIME_OF_DAY)?;
    let caps = re.captures(s).ok_or_else(|| {
        anyhow::Error::new(CoreError::validation(
            "time",
            format!("'{}' is not a valid HH:MM time", s),
        ))
    })?;
    let hour: u32 = caps[1].parse()?;
    let minute: u32 = caps[2].parse()?;
    Ok((hour, minute))
}

/// Soonest occurrence of the schedule pattern strictly after `now`.
///
/// Bounded forward scan over calendar days: 92 covers the worst monthly gap
/// (day 31 between two long months). Today counts when its time-of-day has
/// not passed yet. Missed occurrences are never backfilled.
pub fn next_occurrence(
    frequency: Frequency,
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
    time: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<DateTime<Utc>> {
    let (hour, minute) = parse_time_of_day(time)?;
    for offset in 0..92i64 {
        let date = (now + Duration::days(offset)).date_naive();
        let matches = match frequency {
            Frequency::Daily => true,
            Frequency::Weekly => day_of_week
                .map(|d| date.weekday().num_days_from_sunday() == u32::from(d))
                .unwrap_or(false),
            Frequency::Monthly => day_of_month
                .map(|d| date.day() == u32::from(d))
                .unwrap_or(false),
        };
        if !matches {
            continue;
        }
        let naive = date
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid time of day '{}'", time))?;
        let candidate = Utc.from_utc_datetime(&naive);
        if candidate > now {
            return Ok(candidate);
        }
    }
    anyhow::bail!(
        "no occurrence of {} schedule within 92 days",
        frequency.as_str()
    )
}

fn validate_pattern(
    frequency: Frequency,
    day_of_week: Option<u8>,
    day_of_month: Option<u8>,
    time: &str,
) -> anyhow::Result<()> {
    parse_time_of_day(time)?;
    match frequency {
        Frequency::Daily => {}
        Frequency::Weekly => match day_of_week {
            Some(d) if d <= 6 => {}
            Some(d) => {
                return Err(CoreError::validation(
                    "day_of_week",
                    format!("{} is out of range 0-6", d),
                )
                .into());
            }
            None => {
                return Err(CoreError::validation(
                    "day_of_week",
                    "required for weekly schedules",
                )
                .into());
            }
        },
        Frequency::Monthly => match day_of_month {
            Some(d) if (1..=31).contains(&d) => {}
            Some(d) => {
                return Err(CoreError::validation(
                    "day_of_month",
                    format!("{} is out of range 1-31", d),
                )
                .into());
            }
            None => {
                return Err(CoreError::validation(
                    "day_of_month",
                    "required for monthly schedules",
                )
                .into());
            }
        },
    }
    Ok(())
}

/// Outcome of one scheduler tick entry, for operator-facing reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FireReport {
    pub task_id: i64,
    pub fired: bool,
    pub run_id: Option<i64>,
    pub detail: String,
}

pub struct TaskEngine {
    store: Store,
}

impl TaskEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create(&self, draft: &TaskDraft, now: DateTime<Utc>) -> anyhow::Result<ScheduledTask> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::validation("name", "must not be empty").into());
        }
        if draft.engines.is_empty() {
            return Err(CoreError::validation("engines", "at least one engine is required").into());
        }
        validate_pattern(
            draft.frequency,
            draft.day_of_week,
            draft.day_of_month,
            &draft.time,
        )?;
        let next = next_occurrence(
            draft.frequency,
            draft.day_of_week,
            draft.day_of_month,
            &draft.time,
            now,
        )?;
        let task = self.store.insert_task(draft, next)?;
        tracing::info!(
            event = "scheduler.task_created",
            task_id = task.id,
            benchmark_id = task.benchmark_id,
            next_run_at = %task.next_run_at,
        );
        Ok(task)
    }

    /// Merges the patch, re-validates the frequency/day invariant against
    /// the merged row and recomputes next_run_at.
    pub fn update(
        &self,
        project: &str,
        id: i64,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ScheduledTask> {
        let mut task = self.store.get_task(project, id)?;
        if let Some(name) = &patch.name {
            task.name = name.clone();
        }
        if let Some(engines) = &patch.engines {
            task.engines = engines.clone();
        }
        if let Some(channels) = &patch.channels {
            task.channels = channels.clone();
        }
        if let Some(frequency) = patch.frequency {
            task.frequency = frequency;
        }
        if let Some(d) = patch.day_of_week {
            task.day_of_week = Some(d);
        }
        if let Some(d) = patch.day_of_month {
            task.day_of_month = Some(d);
        }
        if let Some(time) = &patch.time {
            task.time = time.clone();
        }
        if task.engines.is_empty() {
            return Err(CoreError::validation("engines", "at least one engine is required").into());
        }
        validate_pattern(task.frequency, task.day_of_week, task.day_of_month, &task.time)?;
        task.next_run_at = next_occurrence(
            task.frequency,
            task.day_of_week,
            task.day_of_month,
            &task.time,
            now,
        )?;
        self.store.update_task_row(&task)?;
        Ok(task)
    }

    /// Flips enabled. Re-enabling recomputes next_run_at from now so a task
    /// disabled for a while never fires for missed occurrences.
    pub fn toggle(&self, project: &str, id: i64, now: DateTime<Utc>) -> anyhow::Result<ScheduledTask> {
        let mut task = self.store.get_task(project, id)?;
        task.enabled = !task.enabled;
        if task.enabled {
            task.next_run_at = next_occurrence(
                task.frequency,
                task.day_of_week,
                task.day_of_month,
                &task.time,
                now,
            )?;
        }
        self.store.update_task_row(&task)?;
        tracing::info!(
            event = "scheduler.task_toggled",
            task_id = task.id,
            enabled = task.enabled,
        );
        Ok(task)
    }

    pub fn delete(&self, project: &str, id: i64) -> anyhow::Result<()> {
        self.store.delete_task(project, id)
    }

    pub fn get(&self, project: &str, id: i64) -> anyhow::Result<ScheduledTask> {
        self.store.get_task(project, id)
    }

    pub fn list(&self, project: &str) -> anyhow::Result<Vec<ScheduledTask>> {
        self.store.list_tasks(project)
    }

    /// Invoked by an external timer at next_run_at. Safe against
    /// double-firing: a task whose next_run_at already moved past now is
    /// left alone. A benchmark that is not ready at fire time is skipped and
    /// logged as failed; next_run_at still advances so there is no retry
    /// storm.
    pub async fn fire(
        &self,
        runner: &Runner,
        project: &str,
        id: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<FireReport> {
        let mut task = self.store.get_task(project, id)?;
        if !task.enabled {
            return Ok(FireReport {
                task_id: id,
                fired: false,
                run_id: None,
                detail: "task is disabled".into(),
            });
        }
        if task.next_run_at > now {
            tracing::debug!(
                event = "scheduler.fire_skipped",
                task_id = id,
                next_run_at = %task.next_run_at,
                "not due yet"
            );
            return Ok(FireReport {
                task_id: id,
                fired: false,
                run_id: None,
                detail: format!("not due until {}", task.next_run_at.to_rfc3339()),
            });
        }

        let benchmark = self.store.get_benchmark(project, task.benchmark_id);
        let report = match benchmark {
            Ok(b) if b.status == BenchmarkStatus::Ready => {
                match runner
                    .execute(project, task.benchmark_id, &task.engines, &task.channels)
                    .await
                {
                    Ok(run) => {
                        task.last_run_id = Some(run.id);
                        task.last_run_status = Some(run.status);
                        task.last_run_at = Some(now);
                        task.run_count += 1;
                        FireReport {
                            task_id: id,
                            fired: true,
                            run_id: Some(run.id),
                            detail: format!("run {} {}", run.id, run.status.as_str()),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            event = "scheduler.fire_failed",
                            task_id = id,
                            benchmark_id = task.benchmark_id,
                            error = %e,
                        );
                        task.last_run_status = Some(RunStatus::Failed);
                        task.last_run_at = Some(now);
                        FireReport {
                            task_id: id,
                            fired: false,
                            run_id: None,
                            detail: format!("run failed: {}", e),
                        }
                    }
                }
            }
            Ok(b) => {
                tracing::warn!(
                    event = "scheduler.fire_skipped",
                    task_id = id,
                    benchmark_id = task.benchmark_id,
                    status = b.status.as_str(),
                    "benchmark not ready at fire time"
                );
                task.last_run_status = Some(RunStatus::Failed);
                task.last_run_at = Some(now);
                FireReport {
                    task_id: id,
                    fired: false,
                    run_id: None,
                    detail: format!("benchmark not ready (status: {})", b.status.as_str()),
                }
            }
            Err(e) => {
                tracing::warn!(
                    event = "scheduler.fire_skipped",
                    task_id = id,
                    benchmark_id = task.benchmark_id,
                    error = %e,
                );
                task.last_run_status = Some(RunStatus::Failed);
                task.last_run_at = Some(now);
                FireReport {
                    task_id: id,
                    fired: false,
                    run_id: None,
                    detail: format!("benchmark lookup failed: {}", e),
                }
            }
        };

        task.next_run_at = next_occurrence(
            task.frequency,
            task.day_of_week,
            task.day_of_month,
            &task.time,
            now,
        )?;
        self.store.update_task_row(&task)?;
        Ok(report)
    }

    /// One scheduler tick: fires every enabled task whose next_run_at has
    /// arrived.
    pub async fn fire_due(
        &self,
        runner: &Runner,
        project: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<FireReport>> {
        let due: Vec<ScheduledTask> = self
            .store
            .list_tasks(project)?
            .into_iter()
            .filter(|t| t.enabled && t.next_run_at <= now)
            .collect();
        let mut reports = Vec::new();
        for task in due {
            reports.push(self.fire(runner, project, task.id, now).await?);
        }
        Ok(reports)
    }
}
