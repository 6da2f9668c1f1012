use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Draft,
    Generating,
    Ready,
    Running,
    Archived,
}

impl BenchmarkStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "draft" => BenchmarkStatus::Draft,
            "generating" => BenchmarkStatus::Generating,
            "ready" => BenchmarkStatus::Ready,
            "running" => BenchmarkStatus::Running,
            "archived" => BenchmarkStatus::Archived,
            _ => BenchmarkStatus::Draft, // Default fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkStatus::Draft => "draft",
            BenchmarkStatus::Generating => "generating",
            BenchmarkStatus::Ready => "ready",
            BenchmarkStatus::Running => "running",
            BenchmarkStatus::Archived => "archived",
        }
    }

    /// The closed transition table: draft -> generating -> ready <-> running,
    /// ready <-> archived, plus draft -> ready when questions arrive and
    /// generating -> draft when generation fails.
    pub fn can_transition(self, to: BenchmarkStatus) -> bool {
        use BenchmarkStatus::*;
        matches!(
            (self, to),
            (Draft, Generating)
                | (Draft, Ready)
                | (Generating, Ready)
                | (Generating, Draft)
                | (Ready, Running)
                | (Running, Ready)
                | (Ready, Archived)
                | (Archived, Ready)
        )
    }
}

/// The six-stage intent funnel. Stages 1-3 carry no brand focus; stages 4-6
/// frame the brand against competitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionIntent {
    Aware,
    Recommend,
    Choose,
    Trust,
    Compete,
    Contact,
}

impl QuestionIntent {
    pub const FUNNEL: [QuestionIntent; 6] = [
        QuestionIntent::Aware,
        QuestionIntent::Recommend,
        QuestionIntent::Choose,
        QuestionIntent::Trust,
        QuestionIntent::Compete,
        QuestionIntent::Contact,
    ];

    pub fn stage(&self) -> u8 {
        match self {
            QuestionIntent::Aware => 1,
            QuestionIntent::Recommend => 2,
            QuestionIntent::Choose => 3,
            QuestionIntent::Trust => 4,
            QuestionIntent::Compete => 5,
            QuestionIntent::Contact => 6,
        }
    }

    pub fn brand_focused(&self) -> bool {
        self.stage() >= 4
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "AWARE" => QuestionIntent::Aware,
            "RECOMMEND" => QuestionIntent::Recommend,
            "CHOOSE" => QuestionIntent::Choose,
            "TRUST" => QuestionIntent::Trust,
            "COMPETE" => QuestionIntent::Compete,
            "CONTACT" => QuestionIntent::Contact,
            _ => QuestionIntent::Aware, // Default fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionIntent::Aware => "AWARE",
            QuestionIntent::Recommend => "RECOMMEND",
            QuestionIntent::Choose => "CHOOSE",
            QuestionIntent::Trust => "TRUST",
            QuestionIntent::Compete => "COMPETE",
            QuestionIntent::Contact => "CONTACT",
        }
    }
}

impl std::str::FromStr for QuestionIntent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AWARE" => Ok(QuestionIntent::Aware),
            "RECOMMEND" => Ok(QuestionIntent::Recommend),
            "CHOOSE" => Ok(QuestionIntent::Choose),
            "TRUST" => Ok(QuestionIntent::Trust),
            "COMPETE" => Ok(QuestionIntent::Compete),
            "CONTACT" => Ok(QuestionIntent::Contact),
            _ => anyhow::bail!("unknown intent '{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Manual,
    Generated,
    Imported,
}

impl QuestionSource {
    pub fn parse(s: &str) -> Self {
        match s {
            "manual" => QuestionSource::Manual,
            "generated" => QuestionSource::Generated,
            "imported" => QuestionSource::Imported,
            _ => QuestionSource::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Manual => "manual",
            QuestionSource::Generated => "generated",
            QuestionSource::Imported => "imported",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: i64,
    pub project_id: String,
    pub name: String,
    pub scenario: String,
    pub target_roles: Vec<String>,
    pub questions_per_stage: u32,
    pub total_questions: u32,
    pub status: BenchmarkStatus,
    pub is_active: bool,
    pub current_version: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkDraft {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub questions_per_stage: u32,
}

#[derive(Debug, Clone, Default)]
pub struct BenchmarkPatch {
    pub name: Option<String>,
    pub scenario: Option<String>,
    pub target_roles: Option<Vec<String>>,
    pub questions_per_stage: Option<u32>,
}

impl BenchmarkPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.scenario.is_none()
            && self.target_roles.is_none()
            && self.questions_per_stage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub benchmark_id: i64,
    pub text: String,
    pub intent: QuestionIntent,
    pub persona_role: String,
    pub persona_name: String,
    pub keyword: String,
    pub source: QuestionSource,
    pub is_relevant: bool,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub intent: QuestionIntent,
    #[serde(default)]
    pub persona_role: String,
    #[serde(default)]
    pub persona_name: String,
    #[serde(default)]
    pub keyword: String,
    pub source: QuestionSource,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub text: Option<String>,
    pub intent: Option<QuestionIntent>,
    pub persona_role: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionChangeType {
    Initial,
    QuestionAdded,
    QuestionModified,
    QuestionDeleted,
    BenchmarkUpdated,
    Restored,
}

impl VersionChangeType {
    pub fn parse(s: &str) -> Self {
        match s {
            "initial" => VersionChangeType::Initial,
            "question_added" => VersionChangeType::QuestionAdded,
            "question_modified" => VersionChangeType::QuestionModified,
            "question_deleted" => VersionChangeType::QuestionDeleted,
            "benchmark_updated" => VersionChangeType::BenchmarkUpdated,
            "restored" => VersionChangeType::Restored,
            _ => VersionChangeType::Initial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionChangeType::Initial => "initial",
            VersionChangeType::QuestionAdded => "question_added",
            VersionChangeType::QuestionModified => "question_modified",
            VersionChangeType::QuestionDeleted => "question_deleted",
            VersionChangeType::BenchmarkUpdated => "benchmark_updated",
            VersionChangeType::Restored => "restored",
        }
    }
}

/// Point-in-time copy of a benchmark's metadata and full question list.
/// Write-once: a stored snapshot is never mutated, restore re-materializes
/// its content as a new forward version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub benchmark: SnapshotMeta,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub name: String,
    pub scenario: String,
    pub target_roles: Vec<String>,
    pub questions_per_stage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkVersion {
    pub id: i64,
    pub benchmark_id: i64,
    pub version: String,
    pub change_type: VersionChangeType,
    pub change_summary: String,
    pub run_count: u32,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub snapshot: VersionSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn parse(s: &str) -> Self {
        match s {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            _ => Frequency::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => anyhow::bail!("unknown frequency '{}' (daily|weekly|monthly)", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub project_id: String,
    pub benchmark_id: i64,
    pub name: String,
    pub engines: Vec<String>,
    pub channels: Vec<String>,
    pub frequency: Frequency,
    /// 0-6, 0 = Sunday; meaningful iff frequency is weekly.
    pub day_of_week: Option<u8>,
    /// 1-31; meaningful iff frequency is monthly.
    pub day_of_month: Option<u8>,
    /// "HH:MM", 24h.
    pub time: String,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
    pub last_run_id: Option<i64>,
    pub last_run_status: Option<RunStatus>,
    pub run_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub project_id: String,
    pub benchmark_id: i64,
    pub name: String,
    pub engines: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub day_of_month: Option<u8>,
    pub time: String,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub engines: Option<Vec<String>>,
    pub channels: Option<Vec<String>>,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<u8>,
    pub day_of_month: Option<u8>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => RunStatus::Pending,
            "running" => RunStatus::Running,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub completed: u32,
    pub failed: u32,
    pub total: u32,
}

impl RunProgress {
    pub fn is_settled(&self) -> bool {
        self.completed + self.failed == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// count(brand_mentioned) / total_results, in [0, 1].
    pub visibility_rate: f64,
    /// Mean ranking over brand-mentioned results with a ranking; None when
    /// no such result exists. Never 0 as a stand-in for missing.
    pub avg_ranking: Option<f64>,
    pub danger_count: u32,
    pub total_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub project_id: String,
    pub benchmark_id: i64,
    /// Version label pinned at creation; later benchmark edits never
    /// retroactively alter this run.
    pub benchmark_version: String,
    pub engines: Vec<String>,
    pub channels: Vec<String>,
    pub status: RunStatus,
    pub progress: RunProgress,
    pub created_at: DateTime<Utc>,
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn parse(s: &str) -> Self {
        match s {
            "positive" => Sentiment::Positive,
            "neutral" => Sentiment::Neutral,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOutcome {
    Ok,
    Failed,
}

impl ResultOutcome {
    pub fn parse(s: &str) -> Self {
        match s {
            "ok" => ResultOutcome::Ok,
            "failed" => ResultOutcome::Failed,
            _ => ResultOutcome::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultOutcome::Ok => "ok",
            ResultOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: i64,
    pub run_id: i64,
    pub question_id: i64,
    pub engine: String,
    pub channel: String,
    pub outcome: ResultOutcome,
    pub simulated_response: String,
    pub sentiment: Sentiment,
    pub brand_mentioned: bool,
    pub competitor_mentioned: bool,
    pub competitors_mentioned: Vec<String>,
    /// Position of the brand among mentioned entities, when ranked at all.
    pub ranking: Option<i64>,
    pub sources: Vec<String>,
    pub risk_flags: Vec<String>,
    pub cta: Option<String>,
    /// 0-100.
    pub visibility_score: u8,
    /// Set iff outcome is failed.
    pub error: Option<String>,
}

impl SimulationResult {
    /// A competitor got cited where the brand did not appear at all.
    pub fn is_dangerous(&self) -> bool {
        self.competitor_mentioned && !self.brand_mentioned
    }
}

/// What the simulation backend returns for one (question, engine) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    pub channel: String,
    pub text: String,
    pub sentiment: Sentiment,
    pub brand_mentioned: bool,
    pub competitor_mentioned: bool,
    #[serde(default)]
    pub competitors_mentioned: Vec<String>,
    #[serde(default)]
    pub ranking: Option<i64>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub visibility_score: u8,
}

/// Deep competitor read for a single result; computed once, then cached on
/// the result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
