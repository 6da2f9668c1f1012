use super::{emit_item, open_ctx};
use crate::cli::args::AnalyzeArgs;
use geoscope_core::analysis::CompetitorAnalyst;
use geoscope_core::model::CompetitorAnalysis;
use std::time::Duration;

fn render(a: &CompetitorAnalysis) -> String {
    let mut out = a.summary.clone();
    for s in &a.strengths {
        out.push_str(&format!("\n  strength: {}", s));
    }
    for g in &a.gaps {
        out.push_str(&format!("\n  gap:      {}", g));
    }
    for r in &a.recommended_actions {
        out.push_str(&format!("\n  action:   {}", r));
    }
    out
}

pub async fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let analyst = CompetitorAnalyst::new(
        ctx.store.clone(),
        ctx.client.clone(),
        Duration::from_secs(ctx.cfg.simulation.analysis_timeout_seconds),
    );
    let analysis = analyst.get_or_generate(args.result).await?;
    emit_item(&ctx.format, &analysis, render(&analysis))
}
