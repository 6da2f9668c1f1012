use crate::model::{ResultOutcome, Run, SimulationResult};

pub fn print_run(run: &Run, results: &[SimulationResult]) {
    eprintln!(
        "\nRun #{} (benchmark {} @ v{}) — {}",
        run.id,
        run.benchmark_id,
        run.benchmark_version,
        run.status.as_str()
    );

    for r in results {
        let icon = match r.outcome {
            ResultOutcome::Failed => "⚠️",
            ResultOutcome::Ok if r.is_dangerous() => "❌",
            ResultOutcome::Ok if r.brand_mentioned => "✅",
            ResultOutcome::Ok => "➖",
        };
        let ranking = r
            .ranking
            .map(|v| format!("#{}", v))
            .unwrap_or_else(|| "-".into());
        let note = match r.outcome {
            ResultOutcome::Failed => r.error.clone().unwrap_or_default(),
            ResultOutcome::Ok if r.is_dangerous() => {
                format!("competitors only: {}", r.competitors_mentioned.join(", "))
            }
            _ => String::new(),
        };
        eprintln!(
            "{} q{:<5} {:<10} rank {:<4} score {:<3} {}",
            icon, r.question_id, r.engine, ranking, r.visibility_score, note
        );
    }

    if let Some(s) = &run.summary {
        let avg = s
            .avg_ranking
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "n/a".into());
        eprintln!(
            "\n{} results: visibility {:.0}%, avg ranking {}, {} dangerous, {} failed",
            s.total_results,
            s.visibility_rate * 100.0,
            avg,
            s.danger_count,
            run.progress.failed
        );
    } else {
        eprintln!(
            "\nprogress: {}/{} resolved, {} failed",
            run.progress.completed + run.progress.failed,
            run.progress.total,
            run.progress.failed
        );
    }
}
