use super::{emit_item, emit_list, open_ctx};
use crate::cli::args::{BenchmarkArgs, BenchmarkSub};
use geoscope_core::benchmarks::BenchmarkService;
use geoscope_core::model::{Benchmark, BenchmarkDraft, BenchmarkPatch};
use geoscope_core::providers::generation::TemplateGenerator;
use tokio::sync::mpsc;

fn render(b: &Benchmark) -> String {
    format!(
        "#{:<4} {:<28} v{:<6} {:<10} {:>3} questions{}",
        b.id,
        b.name,
        b.current_version,
        b.status.as_str(),
        b.total_questions,
        if b.is_active { "" } else { "  (inactive)" }
    )
}

pub async fn cmd_benchmark(args: BenchmarkArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let svc = BenchmarkService::new(ctx.store.clone());
    match args.cmd {
        BenchmarkSub::List => {
            let items = svc.list(&ctx.project)?;
            let lines = items.iter().map(render).collect();
            emit_list(&ctx.format, &items, lines)
        }
        BenchmarkSub::Get { id } => {
            let b = svc.get(&ctx.project, id)?;
            emit_item(&ctx.format, &b, render(&b))
        }
        BenchmarkSub::Create {
            name,
            scenario,
            roles,
            questions_per_stage,
        } => {
            let b = svc.create(&BenchmarkDraft {
                project_id: ctx.project.clone(),
                name,
                scenario,
                target_roles: roles,
                questions_per_stage,
            })?;
            emit_item(&ctx.format, &b, render(&b))
        }
        BenchmarkSub::Generate {
            name,
            scenario,
            roles,
            questions_per_stage,
        } => {
            let draft = BenchmarkDraft {
                project_id: ctx.project.clone(),
                name,
                scenario,
                target_roles: roles,
                questions_per_stage,
            };
            // Stream the event sequence to stderr as JSON lines; stdout
            // stays reserved for the final benchmark.
            let (tx, mut rx) = mpsc::channel(64);
            let printer = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    if let Ok(line) = serde_json::to_string(&ev) {
                        eprintln!("{}", line);
                    }
                }
            });
            let result = svc.generate(&TemplateGenerator, &draft, Some(tx)).await;
            let _ = printer.await;
            let b = result?;
            emit_item(&ctx.format, &b, render(&b))
        }
        BenchmarkSub::Update {
            id,
            name,
            scenario,
            roles,
            questions_per_stage,
        } => {
            let (b, version) = svc.update(
                &ctx.project,
                id,
                &BenchmarkPatch {
                    name,
                    scenario,
                    target_roles: roles,
                    questions_per_stage,
                },
            )?;
            eprintln!("benchmark now at v{}", version.version);
            emit_item(&ctx.format, &b, render(&b))
        }
        BenchmarkSub::Delete { id } => {
            svc.delete(&ctx.project, id)?;
            eprintln!("benchmark {} deleted", id);
            Ok(())
        }
        BenchmarkSub::Archive { id } => {
            let b = svc.archive(&ctx.project, id)?;
            emit_item(&ctx.format, &b, render(&b))
        }
        BenchmarkSub::Activate { id, off } => {
            let b = svc.activate(&ctx.project, id, !off)?;
            emit_item(&ctx.format, &b, render(&b))
        }
    }
}
