use super::{emit_item, emit_list, open_ctx, parse_frequency};
use crate::cli::args::{TaskArgs, TaskSub};
use chrono::Utc;
use geoscope_core::engine::runner::Runner;
use geoscope_core::model::{ScheduledTask, TaskDraft, TaskPatch};
use geoscope_core::schedule::TaskEngine;

fn render(t: &ScheduledTask) -> String {
    format!(
        "#{:<4} {:<24} {:<8} next {}  {}  {} runs",
        t.id,
        t.name,
        t.frequency.as_str(),
        t.next_run_at.format("%Y-%m-%d %H:%M"),
        if t.enabled { "enabled" } else { "disabled" },
        t.run_count
    )
}

pub async fn cmd_task(args: TaskArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let engine = TaskEngine::new(ctx.store.clone());
    let now = Utc::now();
    match args.cmd {
        TaskSub::List => {
            let items = engine.list(&ctx.project)?;
            let lines = items.iter().map(render).collect();
            emit_list(&ctx.format, &items, lines)
        }
        TaskSub::Get { id } => {
            let t = engine.get(&ctx.project, id)?;
            emit_item(&ctx.format, &t, render(&t))
        }
        TaskSub::Create {
            benchmark,
            name,
            engines,
            channels,
            frequency,
            day_of_week,
            day_of_month,
            time,
        } => {
            let frequency = parse_frequency(&frequency)?;
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
            let t = engine.create(
                &TaskDraft {
                    project_id: ctx.project.clone(),
                    benchmark_id: benchmark,
                    name,
                    engines,
                    channels,
                    frequency,
                    day_of_week,
                    day_of_month,
                    time,
                },
                now,
            )?;
            emit_item(&ctx.format, &t, render(&t))
        }
        TaskSub::Update {
            id,
            name,
            engines,
            channels,
            frequency,
            day_of_week,
            day_of_month,
            time,
        } => {
            let frequency = frequency.as_deref().map(parse_frequency).transpose()?;
            let t = engine.update(
                &ctx.project,
                id,
                &TaskPatch {
                    name,
                    engines,
                    channels,
                    frequency,
                    day_of_week,
                    day_of_month,
                    time,
                },
                now,
            )?;
            emit_item(&ctx.format, &t, render(&t))
        }
        TaskSub::Delete { id } => {
            engine.delete(&ctx.project, id)?;
            eprintln!("task {} deleted", id);
            Ok(())
        }
        TaskSub::Toggle { id } => {
            let t = engine.toggle(&ctx.project, id, now)?;
            emit_item(&ctx.format, &t, render(&t))
        }
        TaskSub::Tick => {
            let runner = Runner::new(ctx.store.clone(), ctx.client.clone(), ctx.settings.clone());
            let reports = engine.fire_due(&runner, &ctx.project, now).await?;
            let lines = reports
                .iter()
                .map(|r| format!("task {}: {}", r.task_id, r.detail))
                .collect();
            emit_list(&ctx.format, &reports, lines)
        }
    }
}
