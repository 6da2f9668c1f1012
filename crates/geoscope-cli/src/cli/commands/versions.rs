use super::{emit_item, emit_list, open_ctx};
use crate::cli::args::{VersionsArgs, VersionsSub};
use geoscope_core::errors::CoreError;
use geoscope_core::model::BenchmarkVersion;
use geoscope_core::versioning::VersionStore;

fn render(v: &BenchmarkVersion) -> String {
    format!(
        "v{:<6} {:<18} {:<40} {} runs{}",
        v.version,
        v.change_type.as_str(),
        v.change_summary,
        v.run_count,
        if v.is_current { "  *current*" } else { "" }
    )
}

pub fn cmd_versions(args: VersionsArgs) -> anyhow::Result<()> {
    let ctx = open_ctx(&args.store)?;
    let versions = VersionStore::new(ctx.store.clone());
    let benchmark_id = args.benchmark;
    match args.cmd {
        VersionsSub::List => {
            let items = versions.list(&ctx.project, benchmark_id)?;
            let lines = items.iter().map(render).collect();
            emit_list(&ctx.format, &items, lines)
        }
        VersionsSub::Get { id } => {
            let v = versions.get(&ctx.project, benchmark_id, id)?;
            emit_item(&ctx.format, &v, render(&v))
        }
        VersionsSub::Restore { id } => {
            let v = versions.restore(&ctx.project, benchmark_id, id)?;
            eprintln!("restored as v{}", v.version);
            emit_item(&ctx.format, &v, render(&v))
        }
        VersionsSub::Undo { dry_run } => {
            let candidate = versions
                .quick_undo_candidate(&ctx.project, benchmark_id)?
                .ok_or_else(|| {
                    anyhow::Error::new(CoreError::invalid_state(
                        "no prior version to undo to",
                    ))
                })?;
            if dry_run {
                eprintln!("would restore v{}", candidate.version);
                return emit_item(&ctx.format, &candidate, render(&candidate));
            }
            let v = versions.restore(&ctx.project, benchmark_id, candidate.id)?;
            eprintln!("restored v{} as v{}", candidate.version, v.version);
            emit_item(&ctx.format, &v, render(&v))
        }
    }
}
