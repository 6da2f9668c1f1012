use crate::model::{Benchmark, QuestionDraft, QuestionIntent, QuestionSource};
use async_trait::async_trait;
use serde::Serialize;

/// Server-push event sequence for streaming benchmark generation:
/// benchmark_created, then per stage stage_start / question_generated* /
/// stage_complete, closed by generation_complete. An error event
/// short-circuits the stream; heartbeat ticks on an idle interval and
/// carries no payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    BenchmarkCreated {
        benchmark_id: i64,
    },
    StageStart {
        stage: QuestionIntent,
    },
    QuestionGenerated {
        benchmark_id: i64,
        question_id: i64,
        stage: QuestionIntent,
    },
    StageComplete {
        stage: QuestionIntent,
        generated: u32,
    },
    GenerationComplete {
        total_questions: u32,
        version: String,
    },
    Error {
        message: String,
    },
    Heartbeat,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce `count` question drafts for one funnel stage.
    async fn stage_questions(
        &self,
        benchmark: &Benchmark,
        stage: QuestionIntent,
        count: u32,
    ) -> anyhow::Result<Vec<QuestionDraft>>;

    fn provider_name(&self) -> &'static str;
}

/// Offline generator: deterministic per-stage templates parameterized by
/// the benchmark's scenario and target roles.
pub struct TemplateGenerator;

const PERSONA_NAMES: [&str; 6] = ["Alex", "Priya", "Jordan", "Wei", "Sofia", "Marcus"];

impl TemplateGenerator {
    fn template(stage: QuestionIntent, scenario: &str, n: usize) -> String {
        match stage {
            QuestionIntent::Aware => format!(
                "What should I know before looking into {} (angle {})?",
                scenario,
                n + 1
            ),
            QuestionIntent::Recommend => format!(
                "Which products would you recommend for {} (variant {})?",
                scenario,
                n + 1
            ),
            QuestionIntent::Choose => format!(
                "How do I compare the top options for {} (criteria set {})?",
                scenario,
                n + 1
            ),
            QuestionIntent::Trust => format!(
                "Is the leading product for {} reliable and well reviewed ({})?",
                scenario,
                n + 1
            ),
            QuestionIntent::Compete => format!(
                "How does the leading product for {} stack up against its rivals ({})?",
                scenario,
                n + 1
            ),
            QuestionIntent::Contact => format!(
                "How do I get started or talk to sales for {} (path {})?",
                scenario,
                n + 1
            ),
        }
    }
}

#[async_trait]
impl QuestionGenerator for TemplateGenerator {
    async fn stage_questions(
        &self,
        benchmark: &Benchmark,
        stage: QuestionIntent,
        count: u32,
    ) -> anyhow::Result<Vec<QuestionDraft>> {
        let scenario = if benchmark.scenario.trim().is_empty() {
            benchmark.name.as_str()
        } else {
            benchmark.scenario.as_str()
        };
        let mut out = Vec::with_capacity(count as usize);
        for n in 0..count as usize {
            let role = benchmark
                .target_roles
                .get(n % benchmark.target_roles.len().max(1))
                .cloned()
                .unwrap_or_else(|| "buyer".to_string());
            out.push(QuestionDraft {
                text: Self::template(stage, scenario, n),
                intent: stage,
                persona_role: role,
                persona_name: PERSONA_NAMES[(stage.stage() as usize + n) % PERSONA_NAMES.len()]
                    .to_string(),
                keyword: scenario.split_whitespace().next().unwrap_or("").to_string(),
                source: QuestionSource::Generated,
            });
        }
        Ok(out)
    }

    fn provider_name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn benchmark() -> Benchmark {
        Benchmark {
            id: 1,
            project_id: "p1".into(),
            name: "CRM tools".into(),
            scenario: "mid-market CRM selection".into(),
            target_roles: vec!["sales ops lead".into(), "founder".into()],
            questions_per_stage: 3,
            total_questions: 0,
            status: crate::model::BenchmarkStatus::Generating,
            is_active: true,
            current_version: "1.0".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn generates_requested_count_per_stage() {
        let g = TemplateGenerator;
        let b = benchmark();
        for stage in QuestionIntent::FUNNEL {
            let qs = g.stage_questions(&b, stage, 3).await.unwrap();
            assert_eq!(qs.len(), 3);
            assert!(qs.iter().all(|q| q.intent == stage));
            assert!(qs.iter().all(|q| q.source == QuestionSource::Generated));
            // role assignment cycles through the target roles
            assert_eq!(qs[0].persona_role, "sales ops lead");
            assert_eq!(qs[1].persona_role, "founder");
        }
    }
}
