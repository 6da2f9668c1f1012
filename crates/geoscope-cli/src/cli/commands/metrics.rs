use super::{open_ctx, parse_intent};
use crate::cli::args::{DashboardArgs, OptimizeArgs};
use geoscope_metrics::advisor::{journey_optimizations, AdvisorConfig, JourneyOptimization};
use geoscope_metrics::projector::{trend_deltas, visibility_trend};

pub fn cmd_dashboard(args: DashboardArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let runs = ctx.store.list_runs(&ctx.project)?;
    let points = visibility_trend(&runs, args.engine.as_deref());
    let deltas = trend_deltas(&points);
    if ctx.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "points": points,
                "deltas": deltas,
                "total": points.len(),
            }))?
        );
        return Ok(());
    }
    for p in &points {
        let rank = p
            .avg_ranking
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "n/a".into());
        println!(
            "{}  visibility {:>5.1}%  avg rank {:<5}  {} datasets (+{} new)  {} results",
            p.bucket,
            p.visibility_rate * 100.0,
            rank,
            p.benchmark_count,
            p.new_benchmarks,
            p.total_results
        );
    }
    if points.is_empty() {
        eprintln!("no completed runs yet");
    }
    if let Some(d) = deltas.visibility_rate_trend {
        eprintln!("visibility trend {:+.1}% vs previous day", d * 100.0);
    }
    if let Some(d) = deltas.avg_ranking_trend {
        eprintln!("avg ranking trend {:+.2} vs previous day", d);
    }
    Ok(())
}

fn render_journey(j: &JourneyOptimization) -> String {
    let mut out = format!(
        "{:<9} (stage {})  {} issue{}",
        j.journey.as_str(),
        j.journey.stage(),
        j.issue_count,
        if j.issue_count == 1 { "" } else { "s" }
    );
    for issue in &j.issues {
        let rank = issue
            .ranking
            .map(|v| format!(" rank {}", v))
            .unwrap_or_default();
        out.push_str(&format!(
            "\n  - [{}] {} ({}{})",
            issue.reason.as_str(),
            issue.question_text,
            issue.engine,
            rank
        ));
    }
    out
}

/// Projection over the latest completed run; with no runs yet every stage
/// simply reports zero issues.
pub fn cmd_optimize(args: OptimizeArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let rows = match ctx.store.latest_completed_run(&ctx.project)? {
        Some(run) => ctx.store.results_with_questions(&run)?,
        None => Vec::new(),
    };
    let config = AdvisorConfig {
        ranking_threshold: args.ranking_threshold,
    };
    let mut journeys = journey_optimizations(&rows, &config);
    if let Some(filter) = &args.journey {
        let stage = parse_intent(filter)?;
        journeys.retain(|j| j.journey == stage);
    }
    if ctx.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "items": journeys,
                "total": journeys.len(),
            }))?
        );
        return Ok(());
    }
    for j in &journeys {
        println!("{}", render_journey(j));
    }
    Ok(())
}
