use super::{emit_item, emit_list, open_ctx};
use crate::cli::args::{RunArgs, RunSub};
use geoscope_core::engine::runner::Runner;
use geoscope_core::model::{Run, SimulationResult};
use geoscope_core::report::console;

fn render(r: &Run) -> String {
    let summary = r
        .summary
        .as_ref()
        .map(|s| {
            format!(
                "  visibility {:.0}%, {} dangerous",
                s.visibility_rate * 100.0,
                s.danger_count
            )
        })
        .unwrap_or_default();
    format!(
        "#{:<4} benchmark {} @ v{:<6} {:<10} {}/{} resolved ({} failed){}",
        r.id,
        r.benchmark_id,
        r.benchmark_version,
        r.status.as_str(),
        r.progress.completed + r.progress.failed,
        r.progress.total,
        r.progress.failed,
        summary
    )
}

fn render_result(r: &SimulationResult) -> String {
    format!(
        "#{:<5} q{:<5} {:<10} {:<7} brand {:<5} rank {}",
        r.id,
        r.question_id,
        r.engine,
        r.outcome.as_str(),
        r.brand_mentioned,
        r.ranking.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
    )
}

pub async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    match args.cmd {
        RunSub::Start {
            benchmark,
            engines,
            channels,
        } => {
            let engines = if engines.is_empty() {
                ctx.cfg.engines.clone()
            } else {
                engines
            };
            let channels = if channels.is_empty() {
                ctx.cfg.channels.clone()
            } else {
                channels
            };
            let runner = Runner::new(ctx.store.clone(), ctx.client.clone(), ctx.settings.clone());
            let run = runner
                .execute(&ctx.project, benchmark, &engines, &channels)
                .await?;
            let (results, _) = ctx.store.list_results(run.id, run.progress.total.max(1), 0)?;
            console::print_run(&run, &results);
            emit_item(&ctx.format, &run, render(&run))
        }
        RunSub::List => {
            let items = ctx.store.list_runs(&ctx.project)?;
            let lines = items.iter().map(render).collect();
            emit_list(&ctx.format, &items, lines)
        }
        RunSub::Get { id } => {
            let run = ctx.store.get_run(&ctx.project, id)?;
            emit_item(&ctx.format, &run, render(&run))
        }
        RunSub::Delete { id } => {
            ctx.store.delete_run(&ctx.project, id)?;
            eprintln!("run {} and its results deleted", id);
            Ok(())
        }
        RunSub::Results { id, limit, offset } => {
            ctx.store.get_run(&ctx.project, id)?;
            let (items, total) = ctx.store.list_results(id, limit, offset)?;
            if ctx.format == "json" {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "items": items,
                        "total": total,
                    }))?
                );
            } else {
                for r in &items {
                    println!("{}", render_result(r));
                }
                eprintln!("{} of {} results", items.len(), total);
            }
            Ok(())
        }
    }
}
