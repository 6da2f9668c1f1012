use super::{emit_item, emit_list, open_ctx, parse_intent};
use crate::cli::args::{QuestionArgs, QuestionSub};
use geoscope_core::model::{Question, QuestionDraft, QuestionPatch, QuestionSource};
use geoscope_core::questions::QuestionSet;

fn render(q: &Question) -> String {
    let mut flags = String::new();
    if q.is_approved {
        flags.push_str(" ✓");
    }
    if !q.is_relevant {
        flags.push_str(" (irrelevant)");
    }
    format!(
        "#{:<4} [{:<9}] {}{}",
        q.id,
        q.intent.as_str(),
        q.text,
        flags
    )
}

pub fn cmd_question(args: QuestionArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let set = QuestionSet::new(ctx.store.clone());
    let benchmark_id = args.benchmark;
    match args.cmd {
        QuestionSub::List => {
            let items = set.list(&ctx.project, benchmark_id)?;
            let lines = items.iter().map(render).collect();
            emit_list(&ctx.format, &items, lines)
        }
        QuestionSub::Add {
            text,
            intent,
            persona_role,
            persona_name,
            keyword,
        } => {
            let intent = parse_intent(&intent)?;
            let (q, version) = set.add(
                &ctx.project,
                benchmark_id,
                &QuestionDraft {
                    text,
                    intent,
                    persona_role,
                    persona_name,
                    keyword,
                    source: QuestionSource::Manual,
                },
            )?;
            eprintln!("benchmark now at v{}", version.version);
            emit_item(&ctx.format, &q, render(&q))
        }
        QuestionSub::Update {
            id,
            text,
            intent,
            persona_role,
            keyword,
        } => {
            let intent = intent.as_deref().map(parse_intent).transpose()?;
            let (q, version) = set.update(
                &ctx.project,
                benchmark_id,
                id,
                &QuestionPatch {
                    text,
                    intent,
                    persona_role,
                    keyword,
                },
            )?;
            eprintln!("benchmark now at v{}", version.version);
            emit_item(&ctx.format, &q, render(&q))
        }
        QuestionSub::Delete { id } => {
            let version = set.delete(&ctx.project, benchmark_id, id)?;
            eprintln!("question {} deleted, benchmark now at v{}", id, version.version);
            Ok(())
        }
        QuestionSub::Approve { id, revoke } => {
            let q = set.approve(&ctx.project, benchmark_id, id, !revoke)?;
            emit_item(&ctx.format, &q, render(&q))
        }
        QuestionSub::Relevance { id, irrelevant } => {
            let q = set.set_relevance(&ctx.project, benchmark_id, id, !irrelevant)?;
            emit_item(&ctx.format, &q, render(&q))
        }
    }
}
