use chrono::NaiveDate;
use geoscope_core::model::{Run, RunStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One daily bucket of the visibility trend. Pure projection over completed
/// runs; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub bucket: NaiveDate,
    pub visibility_rate: f64,
    pub avg_ranking: Option<f64>,
    pub total_results: u32,
    /// Distinct benchmarks contributing to this bucket.
    pub benchmark_count: usize,
    /// Benchmarks whose first-ever run falls in this bucket, so the UI can
    /// show "N datasets (+M new)".
    pub new_benchmarks: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendDeltas {
    /// Latest bucket minus the one before it; absent when either side lacks
    /// data — never defaulted to zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_rate_trend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_ranking_trend: Option<f64>,
}

/// Rolls completed runs up into daily visibility buckets, oldest first.
/// The optional engine filter keeps only runs whose engine set contains it.
pub fn visibility_trend(runs: &[Run], engine: Option<&str>) -> Vec<TrendPoint> {
    let eligible: Vec<&Run> = runs
        .iter()
        .filter(|r| r.status == RunStatus::Completed && r.summary.is_some())
        .filter(|r| engine.map(|e| r.engines.iter().any(|x| x == e)).unwrap_or(true))
        .collect();

    // First-ever run date per benchmark, within the eligible set.
    let mut first_seen: HashMap<i64, NaiveDate> = HashMap::new();
    for run in &eligible {
        let date = run.created_at.date_naive();
        first_seen
            .entry(run.benchmark_id)
            .and_modify(|d| {
                if date < *d {
                    *d = date;
                }
            })
            .or_insert(date);
    }

    let mut buckets: BTreeMap<NaiveDate, Vec<&Run>> = BTreeMap::new();
    for run in &eligible {
        buckets.entry(run.created_at.date_naive()).or_default().push(run);
    }

    buckets
        .into_iter()
        .map(|(bucket, runs)| {
            let mut mentioned = 0.0;
            let mut total: u32 = 0;
            let mut rankings = Vec::new();
            let mut benchmarks = HashSet::new();
            for run in &runs {
                let Some(summary) = run.summary.as_ref() else {
                    continue;
                };
                mentioned += summary.visibility_rate * f64::from(summary.total_results);
                total += summary.total_results;
                if let Some(avg) = summary.avg_ranking {
                    rankings.push(avg);
                }
                benchmarks.insert(run.benchmark_id);
            }
            let visibility_rate = if total > 0 {
                mentioned / f64::from(total)
            } else {
                0.0
            };
            let avg_ranking = if rankings.is_empty() {
                None
            } else {
                Some(rankings.iter().sum::<f64>() / rankings.len() as f64)
            };
            let new_benchmarks = benchmarks
                .iter()
                .filter(|id| first_seen.get(id) == Some(&bucket))
                .count();
            TrendPoint {
                bucket,
                visibility_rate,
                avg_ranking,
                total_results: total,
                benchmark_count: benchmarks.len(),
                new_benchmarks,
            }
        })
        .collect()
}

/// Latest-vs-previous deltas over a trend series.
pub fn trend_deltas(points: &[TrendPoint]) -> TrendDeltas {
    if points.len() < 2 {
        return TrendDeltas::default();
    }
    let prev = &points[points.len() - 2];
    let last = &points[points.len() - 1];
    TrendDeltas {
        visibility_rate_trend: Some(last.visibility_rate - prev.visibility_rate),
        avg_ranking_trend: match (last.avg_ranking, prev.avg_ranking) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use geoscope_core::model::{RunProgress, RunSummary};

    fn run(
        id: i64,
        benchmark_id: i64,
        day: u32,
        engines: &[&str],
        visibility_rate: f64,
        total_results: u32,
        avg_ranking: Option<f64>,
    ) -> Run {
        Run {
            id,
            project_id: "p1".into(),
            benchmark_id,
            benchmark_version: "1.1".into(),
            engines: engines.iter().map(|s| s.to_string()).collect(),
            channels: vec!["chat".into()],
            status: RunStatus::Completed,
            progress: RunProgress {
                completed: total_results,
                failed: 0,
                total: total_results,
            },
            created_at: Utc.with_ymd_and_hms(2026, 8, day, 9, 0, 0).unwrap(),
            summary: Some(RunSummary {
                visibility_rate,
                avg_ranking,
                danger_count: 0,
                total_results,
            }),
        }
    }

    #[test]
    fn buckets_by_day_weighted_by_result_count() {
        let runs = vec![
            run(1, 1, 3, &["chatgpt"], 0.5, 4, Some(2.0)),
            run(2, 2, 3, &["chatgpt"], 1.0, 4, Some(1.0)),
            run(3, 1, 4, &["chatgpt"], 0.25, 8, None),
        ];
        let points = visibility_trend(&runs, None);
        assert_eq!(points.len(), 2);
        assert!((points[0].visibility_rate - 0.75).abs() < 1e-9);
        assert_eq!(points[0].total_results, 8);
        assert_eq!(points[0].benchmark_count, 2);
        assert_eq!(points[0].avg_ranking, Some(1.5));
        assert_eq!(points[1].avg_ranking, None);
    }

    #[test]
    fn new_benchmarks_counted_in_first_bucket_only() {
        let runs = vec![
            run(1, 1, 3, &["chatgpt"], 0.5, 4, None),
            run(2, 1, 4, &["chatgpt"], 0.5, 4, None),
            run(3, 2, 4, &["chatgpt"], 0.5, 4, None),
        ];
        let points = visibility_trend(&runs, None);
        assert_eq!(points[0].new_benchmarks, 1);
        assert_eq!(points[1].benchmark_count, 2);
        assert_eq!(points[1].new_benchmarks, 1); // only benchmark 2 is new
    }

    #[test]
    fn engine_filter_drops_unmatched_runs() {
        let runs = vec![
            run(1, 1, 3, &["chatgpt"], 1.0, 4, None),
            run(2, 1, 3, &["claude"], 0.0, 4, None),
        ];
        let points = visibility_trend(&runs, Some("chatgpt"));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].visibility_rate, 1.0);
    }

    #[test]
    fn incomplete_runs_never_contribute() {
        let mut r = run(1, 1, 3, &["chatgpt"], 1.0, 4, None);
        r.status = RunStatus::Running;
        r.summary = None;
        assert!(visibility_trend(&[r], None).is_empty());
    }

    #[test]
    fn deleting_a_run_recomputes_the_point() {
        let all = vec![
            run(1, 1, 3, &["chatgpt"], 1.0, 4, Some(1.0)),
            run(2, 1, 3, &["chatgpt"], 0.0, 4, None),
        ];
        let before = visibility_trend(&all, None);
        assert!((before[0].visibility_rate - 0.5).abs() < 1e-9);
        // run 1 deleted: the projection is recomputed from what remains
        let after = visibility_trend(&all[1..], None);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].visibility_rate, 0.0);
        // and dropping the last run drops the point entirely
        assert!(visibility_trend(&[], None).is_empty());
    }

    #[test]
    fn deltas_require_two_buckets_and_two_rankings() {
        let one = vec![run(1, 1, 3, &["chatgpt"], 0.5, 4, Some(2.0))];
        let d = trend_deltas(&visibility_trend(&one, None));
        assert_eq!(d.visibility_rate_trend, None);
        assert_eq!(d.avg_ranking_trend, None);

        let two = vec![
            run(1, 1, 3, &["chatgpt"], 0.5, 4, Some(2.0)),
            run(2, 1, 4, &["chatgpt"], 0.75, 4, None),
        ];
        let d = trend_deltas(&visibility_trend(&two, None));
        assert_eq!(d.visibility_rate_trend, Some(0.25));
        // latest bucket has no ranking data: delta omitted, not zero
        assert_eq!(d.avg_ranking_trend, None);
    }
}
