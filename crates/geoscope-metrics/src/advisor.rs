use geoscope_core::model::{Question, QuestionIntent, ResultOutcome, SimulationResult};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// A brand-mentioned result ranked worse than this is flagged.
    pub ranking_threshold: i64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            ranking_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    NotMentioned,
    RankingLow,
    CompetitorFavored,
}

impl IssueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueReason::NotMentioned => "not_mentioned",
            IssueReason::RankingLow => "ranking_low",
            IssueReason::CompetitorFavored => "competitor_favored",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationIssue {
    pub result_id: i64,
    pub engine: String,
    pub question_text: String,
    pub reason: IssueReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<i64>,
    pub persona_role: String,
    pub persona_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyOptimization {
    pub journey: QuestionIntent,
    pub issue_count: usize,
    pub issues: Vec<OptimizationIssue>,
}

fn classify(result: &SimulationResult, config: &AdvisorConfig) -> Option<IssueReason> {
    if !result.brand_mentioned {
        return Some(IssueReason::NotMentioned);
    }
    // A mentioned entity outranks the brand: competitor_favored wins over
    // ranking_low when both hold.
    if result.competitor_mentioned && result.ranking.is_some_and(|r| r > 1) {
        return Some(IssueReason::CompetitorFavored);
    }
    if result.ranking.is_some_and(|r| r > config.ranking_threshold) {
        return Some(IssueReason::RankingLow);
    }
    None
}

/// Buckets a completed run's results into the six funnel stages and flags
/// the low performers. Pure projection, recomputed on demand; failed pairs
/// carry no response to judge and are skipped.
pub fn journey_optimizations(
    rows: &[(SimulationResult, Question)],
    config: &AdvisorConfig,
) -> Vec<JourneyOptimization> {
    QuestionIntent::FUNNEL
        .iter()
        .map(|stage| {
            let issues: Vec<OptimizationIssue> = rows
                .iter()
                .filter(|(r, q)| r.outcome == ResultOutcome::Ok && q.intent == *stage)
                .filter_map(|(r, q)| {
                    classify(r, config).map(|reason| OptimizationIssue {
                        result_id: r.id,
                        engine: r.engine.clone(),
                        question_text: q.text.clone(),
                        reason,
                        ranking: r.ranking,
                        persona_role: q.persona_role.clone(),
                        persona_name: q.persona_name.clone(),
                    })
                })
                .collect();
            JourneyOptimization {
                journey: *stage,
                issue_count: issues.len(),
                issues,
            }
        })
        .collect()
}

/// The stages worth acting on first: most issues, brand-focused stages
/// breaking ties.
pub fn worst_journey(optimizations: &[JourneyOptimization]) -> Option<&JourneyOptimization> {
    optimizations
        .iter()
        .filter(|o| o.issue_count > 0)
        .max_by_key(|o| (o.issue_count, o.journey.brand_focused()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscope_core::model::{QuestionSource, Sentiment};

    fn question(id: i64, text: &str, intent: QuestionIntent) -> Question {
        Question {
            id,
            benchmark_id: 1,
            text: text.into(),
            intent,
            persona_role: "founder".into(),
            persona_name: "Sam".into(),
            keyword: "crm".into(),
            source: QuestionSource::Manual,
            is_relevant: true,
            is_approved: true,
        }
    }

    fn result(
        id: i64,
        question_id: i64,
        brand: bool,
        competitor: bool,
        ranking: Option<i64>,
    ) -> SimulationResult {
        SimulationResult {
            id,
            run_id: 1,
            question_id,
            engine: "chatgpt".into(),
            channel: "chat".into(),
            outcome: ResultOutcome::Ok,
            simulated_response: String::new(),
            sentiment: Sentiment::Neutral,
            brand_mentioned: brand,
            competitor_mentioned: competitor,
            competitors_mentioned: if competitor {
                vec!["Globex".into()]
            } else {
                vec![]
            },
            ranking,
            sources: vec![],
            risk_flags: vec![],
            cta: None,
            visibility_score: 50,
            error: None,
        }
    }

    #[test]
    fn all_six_stages_present_in_funnel_order() {
        let out = journey_optimizations(&[], &AdvisorConfig::default());
        assert_eq!(out.len(), 6);
        let stages: Vec<u8> = out.iter().map(|o| o.journey.stage()).collect();
        assert_eq!(stages, vec![1, 2, 3, 4, 5, 6]);
        assert!(out.iter().all(|o| o.issue_count == 0));
    }

    #[test]
    fn unmentioned_brand_is_flagged() {
        let rows = vec![(
            result(10, 1, false, false, None),
            question(1, "What is a CRM?", QuestionIntent::Aware),
        )];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        assert_eq!(out[0].issue_count, 1);
        assert_eq!(out[0].issues[0].reason, IssueReason::NotMentioned);
        assert_eq!(out[0].issues[0].result_id, 10);
    }

    #[test]
    fn low_ranking_flagged_only_past_threshold() {
        let rows = vec![
            (
                result(1, 1, true, false, Some(4)),
                question(1, "q1", QuestionIntent::Recommend),
            ),
            (
                result(2, 2, true, false, Some(3)),
                question(2, "q2", QuestionIntent::Recommend),
            ),
            // brand mentioned but unranked: nothing to judge
            (
                result(3, 3, true, false, None),
                question(3, "q3", QuestionIntent::Recommend),
            ),
        ];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        let recommend = &out[1];
        assert_eq!(recommend.issue_count, 1);
        assert_eq!(recommend.issues[0].reason, IssueReason::RankingLow);
        assert_eq!(recommend.issues[0].ranking, Some(4));
    }

    #[test]
    fn competitor_favored_takes_precedence_over_ranking_low() {
        // rank 5 with competitors present satisfies both conditions
        let rows = vec![(
            result(1, 1, true, true, Some(5)),
            question(1, "q1", QuestionIntent::Compete),
        )];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        let compete = &out[4];
        assert_eq!(compete.issues[0].reason, IssueReason::CompetitorFavored);
    }

    #[test]
    fn top_ranked_brand_with_competitors_is_fine() {
        let rows = vec![(
            result(1, 1, true, true, Some(1)),
            question(1, "q1", QuestionIntent::Compete),
        )];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        assert_eq!(out[4].issue_count, 0);
    }

    #[test]
    fn failed_rows_are_skipped() {
        let mut failed = result(1, 1, false, false, None);
        failed.outcome = ResultOutcome::Failed;
        failed.error = Some("timeout after 60s".into());
        let rows = vec![(failed, question(1, "q1", QuestionIntent::Trust))];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        assert_eq!(out[3].issue_count, 0);
    }

    #[test]
    fn threshold_is_configurable() {
        let rows = vec![(
            result(1, 1, true, false, Some(2)),
            question(1, "q1", QuestionIntent::Choose),
        )];
        let strict = AdvisorConfig {
            ranking_threshold: 1,
        };
        let out = journey_optimizations(&rows, &strict);
        assert_eq!(out[2].issues[0].reason, IssueReason::RankingLow);
        let lax = AdvisorConfig::default();
        assert_eq!(journey_optimizations(&rows, &lax)[2].issue_count, 0);
    }

    #[test]
    fn worst_journey_prefers_brand_focused_on_ties() {
        let rows = vec![
            (
                result(1, 1, false, false, None),
                question(1, "q1", QuestionIntent::Aware),
            ),
            (
                result(2, 2, false, false, None),
                question(2, "q2", QuestionIntent::Compete),
            ),
        ];
        let out = journey_optimizations(&rows, &AdvisorConfig::default());
        let worst = worst_journey(&out).unwrap();
        assert_eq!(worst.journey, QuestionIntent::Compete);
        assert!(worst_journey(&journey_optimizations(&[], &AdvisorConfig::default())).is_none());
    }
}
