use super::{AnalysisRequest, BrandProfile, SimulationClient, SimulationRequest};
use crate::model::{CompetitorAnalysis, EngineResponse, Sentiment};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

/// Offline simulator: answers are synthesized deterministically from a
/// digest of (question text, engine), so repeated runs against the same
/// question set stay stable.
pub struct FakeSimulationClient {
    profile: BrandProfile,
}

impl FakeSimulationClient {
    pub fn new(brand: &str, competitors: &[String]) -> Self {
        Self {
            profile: BrandProfile {
                brand: brand.to_string(),
                competitors: competitors.to_vec(),
            },
        }
    }

    fn digest(&self, question: &str, engine: &str) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(question.as_bytes());
        h.update(b"\n");
        h.update(engine.as_bytes());
        h.finalize().into()
    }
}

#[async_trait]
impl SimulationClient for FakeSimulationClient {
    async fn simulate(&self, req: &SimulationRequest) -> anyhow::Result<EngineResponse> {
        let d = self.digest(&req.question.text, &req.engine);
        let brand_mentioned = d[0] % 4 != 0;
        let competitor_mentioned = !self.profile.competitors.is_empty() && d[1] % 3 != 0;
        let competitors_mentioned: Vec<String> = if competitor_mentioned {
            let take = 1 + (d[2] as usize % self.profile.competitors.len());
            self.profile.competitors.iter().take(take).cloned().collect()
        } else {
            Vec::new()
        };
        let ranking = if brand_mentioned {
            Some(1 + i64::from(d[3] % 5))
        } else {
            None
        };
        let sentiment = match d[4] % 3 {
            0 => Sentiment::Positive,
            1 => Sentiment::Neutral,
            _ => Sentiment::Negative,
        };
        let visibility_score = if brand_mentioned {
            40 + d[5] % 60
        } else {
            d[5] % 25
        };
        let text = if brand_mentioned {
            format!(
                "For \"{}\", {} comes up as a solid option{}.",
                req.question.text,
                self.profile.brand,
                if competitors_mentioned.is_empty() {
                    String::new()
                } else {
                    format!(" alongside {}", competitors_mentioned.join(", "))
                }
            )
        } else if competitor_mentioned {
            format!(
                "For \"{}\", the usual recommendations are {}.",
                req.question.text,
                competitors_mentioned.join(", ")
            )
        } else {
            format!("A generic overview answering \"{}\".", req.question.text)
        };
        let cta = if brand_mentioned && d[6] % 4 == 0 {
            Some(format!("Try {} for free", self.profile.brand))
        } else {
            None
        };
        let risk_flags = if sentiment == Sentiment::Negative && brand_mentioned {
            vec!["negative_framing".to_string()]
        } else {
            Vec::new()
        };
        Ok(EngineResponse {
            channel: req
                .channels
                .first()
                .cloned()
                .unwrap_or_else(|| "chat".to_string()),
            text,
            sentiment,
            brand_mentioned,
            competitor_mentioned,
            competitors_mentioned,
            ranking,
            sources: vec![format!("https://{}.example/answers", req.engine)],
            risk_flags,
            cta,
            visibility_score,
        })
    }

    async fn analyze_competitors(
        &self,
        req: &AnalysisRequest,
    ) -> anyhow::Result<CompetitorAnalysis> {
        let leaders = if req.result.competitors_mentioned.is_empty() {
            "no named competitor".to_string()
        } else {
            req.result.competitors_mentioned.join(", ")
        };
        Ok(CompetitorAnalysis {
            summary: format!(
                "{} ranks {} on {}; co-mentioned with {}.",
                self.profile.brand,
                req.result
                    .ranking
                    .map(|r| format!("#{}", r))
                    .unwrap_or_else(|| "unranked".to_string()),
                req.result.engine,
                leaders
            ),
            strengths: vec!["recognized in direct recommendations".to_string()],
            gaps: vec!["thin citation footprint on comparison queries".to_string()],
            recommended_actions: vec![
                "publish a head-to-head comparison page".to_string(),
                "earn citations on high-authority review sites".to_string(),
            ],
            generated_at: Utc::now(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, QuestionIntent, QuestionSource};

    fn question(text: &str) -> Question {
        Question {
            id: 1,
            benchmark_id: 1,
            text: text.into(),
            intent: QuestionIntent::Recommend,
            persona_role: "founder".into(),
            persona_name: "Sam".into(),
            keyword: "crm".into(),
            source: QuestionSource::Manual,
            is_relevant: true,
            is_approved: false,
        }
    }

    #[tokio::test]
    async fn same_pair_is_deterministic() {
        let client = FakeSimulationClient::new("Acme", &["Globex".into(), "Initech".into()]);
        let req = SimulationRequest {
            question: question("Which CRM should a small team pick?"),
            engine: "chatgpt".into(),
            channels: vec!["chat".into()],
        };
        let a = client.simulate(&req).await.unwrap();
        let b = client.simulate(&req).await.unwrap();
        assert_eq!(a.brand_mentioned, b.brand_mentioned);
        assert_eq!(a.ranking, b.ranking);
        assert_eq!(a.text, b.text);
    }

    #[tokio::test]
    async fn unmentioned_brand_has_no_ranking() {
        let client = FakeSimulationClient::new("Acme", &["Globex".into()]);
        // Scan a few questions; every unmentioned case must be unranked.
        for i in 0..32 {
            let req = SimulationRequest {
                question: question(&format!("question {}", i)),
                engine: "claude".into(),
                channels: vec!["chat".into()],
            };
            let resp = client.simulate(&req).await.unwrap();
            if !resp.brand_mentioned {
                assert_eq!(resp.ranking, None);
            } else {
                assert!(resp.ranking.is_some());
            }
        }
    }
}
