pub mod analyze;
pub mod benchmark;
pub mod init;
pub mod metrics;
pub mod question;
pub mod run;
pub mod task;
pub mod versions;

use crate::cli::args::{Cli, Command, StoreArgs};
use geoscope_core::config::{load_config, ProjectConfig};
use geoscope_core::engine::runner::RunSettings;
use geoscope_core::errors::{try_map_error, ConfigError, CoreError};
use geoscope_core::model::{Frequency, QuestionIntent};
use geoscope_core::providers::simulation::fake::FakeSimulationClient;
use geoscope_core::providers::simulation::http::HttpSimulationClient;
use geoscope_core::providers::simulation::{BrandProfile, SimulationClient};
use geoscope_core::storage::store::Store;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const INVALID_STATE: i32 = 4;
    pub const VALIDATION: i32 = 5;
    pub const TIMEOUT: i32 = 6;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let result = match cli.cmd {
        Command::Init(args) => init::cmd_init(args),
        Command::Benchmark(args) => benchmark::cmd_benchmark(args).await,
        Command::Question(args) => question::cmd_question(args),
        Command::Versions(args) => versions::cmd_versions(args),
        Command::Task(args) => task::cmd_task(args).await,
        Command::Run(args) => run::cmd_run(args).await,
        Command::Dashboard(args) => metrics::cmd_dashboard(args),
        Command::Optimize(args) => metrics::cmd_optimize(args),
        Command::Analyze(args) => analyze::cmd_analyze(args).await,
        Command::Version => {
            println!("geoscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };
    Ok(match result {
        Ok(()) => exit_codes::OK,
        Err(e) => classify_exit(&e),
    })
}

/// The typed core errors keep their specific message and get a dedicated
/// exit code; anything untyped is a plain failure.
fn classify_exit(e: &anyhow::Error) -> i32 {
    if let Some(core) = try_map_error(e) {
        eprintln!("error: {}", core);
        return match core {
            CoreError::NotFound { .. } => exit_codes::NOT_FOUND,
            CoreError::InvalidState { .. } => exit_codes::INVALID_STATE,
            CoreError::Validation { .. } => exit_codes::VALIDATION,
            CoreError::UpstreamTimeout { .. } => {
                eprintln!("the backend ran out of budget; retrying is safe");
                exit_codes::TIMEOUT
            }
        };
    }
    if e.downcast_ref::<ConfigError>().is_some() {
        eprintln!("fatal: {}", e);
        return exit_codes::CONFIG_ERROR;
    }
    eprintln!("error: {:?}", e);
    exit_codes::ERROR
}

/// Everything a command needs, assembled from the config file and the local
/// database. The simulation client is the remote backend when the config
/// names an endpoint, the deterministic offline simulator otherwise.
pub struct Ctx {
    pub cfg: ProjectConfig,
    pub store: Store,
    pub project: String,
    pub client: Arc<dyn SimulationClient>,
    pub settings: RunSettings,
    pub format: String,
}

pub fn open_ctx(args: &StoreArgs) -> anyhow::Result<Ctx> {
    let cfg = load_config(&args.config, args.strict)?;
    if let Some(dir) = args.db.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = Store::open(&args.db)?;
    store.init_schema()?;
    let client: Arc<dyn SimulationClient> = match &cfg.simulation.endpoint {
        Some(endpoint) => Arc::new(HttpSimulationClient::new(
            endpoint.clone(),
            BrandProfile {
                brand: cfg.brand.clone(),
                competitors: cfg.competitors.clone(),
            },
        )),
        None => Arc::new(FakeSimulationClient::new(&cfg.brand, &cfg.competitors)),
    };
    let settings = RunSettings {
        parallel: cfg.simulation.parallel,
        timeout: Duration::from_secs(cfg.simulation.timeout_seconds),
    };
    let project = args.project.clone().unwrap_or_else(|| cfg.project.clone());
    Ok(Ctx {
        cfg,
        store,
        project,
        client,
        settings,
        format: args.format.clone(),
    })
}

pub fn parse_intent(s: &str) -> anyhow::Result<QuestionIntent> {
    s.parse::<QuestionIntent>()
        .map_err(|e| CoreError::validation("intent", e.to_string()).into())
}

pub fn parse_frequency(s: &str) -> anyhow::Result<Frequency> {
    s.parse::<Frequency>()
        .map_err(|e| CoreError::validation("frequency", e.to_string()).into())
}

pub fn emit_item<T: Serialize>(format: &str, item: &T, text: String) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

/// Lists always carry their total so callers never have to count pages.
pub fn emit_list<T: Serialize>(format: &str, items: &[T], lines: Vec<String>) -> anyhow::Result<()> {
    if format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "items": items,
                "total": items.len(),
            }))?
        );
    } else {
        for line in lines {
            println!("{}", line);
        }
        eprintln!("{} total", items.len());
    }
    Ok(())
}
