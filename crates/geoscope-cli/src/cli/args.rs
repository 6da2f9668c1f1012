use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geoscope",
    version,
    about = "Brand visibility tracking across AI search engines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a starter geoscope.yaml
    Init(InitArgs),
    /// Manage benchmarks
    Benchmark(BenchmarkArgs),
    /// Manage a benchmark's question set
    Question(QuestionArgs),
    /// Inspect and restore benchmark version history
    Versions(VersionsArgs),
    /// Manage recurring benchmark schedules
    Task(TaskArgs),
    /// Execute benchmarks and inspect results
    Run(RunArgs),
    /// Project visibility trend over completed runs
    Dashboard(DashboardArgs),
    /// Journey optimization issues from the latest completed run
    Optimize(OptimizeArgs),
    /// Deep competitor analysis for one result
    Analyze(AnalyzeArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = "geoscope.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".geoscope/geoscope.db")]
    pub db: PathBuf,

    /// Project id; defaults to the config's project
    #[arg(long)]
    pub project: Option<String>,

    /// Fail on unknown config fields
    #[arg(long)]
    pub strict: bool,

    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "geoscope.yaml")]
    pub config: PathBuf,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Clone)]
pub struct BenchmarkArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub cmd: BenchmarkSub,
}

#[derive(Subcommand, Clone)]
pub enum BenchmarkSub {
    List,
    Get {
        #[arg(long)]
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        scenario: String,

        /// Persona roles, comma separated
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        #[arg(long, default_value_t = 2)]
        questions_per_stage: u32,
    },
    /// Generate the question set through the six-stage funnel, streaming
    /// progress events to stderr
    Generate {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        scenario: String,

        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        #[arg(long, default_value_t = 2)]
        questions_per_stage: u32,
    },
    Update {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        scenario: Option<String>,

        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,

        #[arg(long)]
        questions_per_stage: Option<u32>,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    Archive {
        #[arg(long)]
        id: i64,
    },
    Activate {
        #[arg(long)]
        id: i64,

        /// Deactivate instead
        #[arg(long)]
        off: bool,
    },
}

#[derive(Parser, Clone)]
pub struct QuestionArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub benchmark: i64,

    #[command(subcommand)]
    pub cmd: QuestionSub,
}

#[derive(Subcommand, Clone)]
pub enum QuestionSub {
    List,
    Add {
        #[arg(long)]
        text: String,

        /// Funnel stage: AWARE|RECOMMEND|CHOOSE|TRUST|COMPETE|CONTACT
        #[arg(long)]
        intent: String,

        #[arg(long, default_value = "")]
        persona_role: String,

        #[arg(long, default_value = "")]
        persona_name: String,

        #[arg(long, default_value = "")]
        keyword: String,
    },
    Update {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        intent: Option<String>,

        #[arg(long)]
        persona_role: Option<String>,

        #[arg(long)]
        keyword: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    Approve {
        #[arg(long)]
        id: i64,

        /// Withdraw approval instead
        #[arg(long)]
        revoke: bool,
    },
    Relevance {
        #[arg(long)]
        id: i64,

        /// Mark as irrelevant instead
        #[arg(long)]
        irrelevant: bool,
    },
}

#[derive(Parser, Clone)]
pub struct VersionsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub benchmark: i64,

    #[command(subcommand)]
    pub cmd: VersionsSub,
}

#[derive(Subcommand, Clone)]
pub enum VersionsSub {
    List,
    Get {
        #[arg(long)]
        id: i64,
    },
    /// Re-materialize an old version's question set as the live one
    Restore {
        #[arg(long)]
        id: i64,
    },
    /// Restore the best quick-undo candidate
    Undo {
        /// Show the candidate without restoring it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Parser, Clone)]
pub struct TaskArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub cmd: TaskSub,
}

#[derive(Subcommand, Clone)]
pub enum TaskSub {
    List,
    Get {
        #[arg(long)]
        id: i64,
    },
    Create {
        #[arg(long)]
        benchmark: i64,

        #[arg(long)]
        name: String,

        /// Engines, comma separated; defaults to the config's engines
        #[arg(long, value_delimiter = ',')]
        engines: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,

        /// daily|weekly|monthly
        #[arg(long)]
        frequency: String,

        /// 0-6, 0 = Sunday; required for weekly schedules
        #[arg(long)]
        day_of_week: Option<u8>,

        /// 1-31; required for monthly schedules
        #[arg(long)]
        day_of_month: Option<u8>,

        /// "HH:MM", 24h
        #[arg(long, default_value = "09:00")]
        time: String,
    },
    Update {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_delimiter = ',')]
        engines: Option<Vec<String>>,

        #[arg(long, value_delimiter = ',')]
        channels: Option<Vec<String>>,

        #[arg(long)]
        frequency: Option<String>,

        #[arg(long)]
        day_of_week: Option<u8>,

        #[arg(long)]
        day_of_month: Option<u8>,

        #[arg(long)]
        time: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Flip enabled; re-enabling recomputes the next occurrence from now
    Toggle {
        #[arg(long)]
        id: i64,
    },
    /// Fire every enabled task whose next occurrence has arrived
    Tick,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub cmd: RunSub,
}

#[derive(Subcommand, Clone)]
pub enum RunSub {
    /// Run a benchmark now
    Start {
        #[arg(long)]
        benchmark: i64,

        /// Engines, comma separated; defaults to the config's engines
        #[arg(long, value_delimiter = ',')]
        engines: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,
    },
    List,
    Get {
        #[arg(long)]
        id: i64,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Paginated results for one run
    Results {
        #[arg(long)]
        id: i64,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

#[derive(Parser, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Keep only runs that exercised this engine
    #[arg(long)]
    pub engine: Option<String>,
}

#[derive(Parser, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Restrict to one funnel stage
    #[arg(long)]
    pub journey: Option<String>,

    /// Brand rankings worse than this are flagged
    #[arg(long, default_value_t = 3)]
    pub ranking_threshold: i64,
}

#[derive(Parser, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub result: i64,
}
