//! CLI binary for the cfn-collect crate.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use cfn_collect::{CfnConfig, CfnError, Collector, DEFAULT_DEPLOYMENT_KEY, DEFAULT_METADATA_HINT};
use clap::Parser;
use serde_json::{json, Map, Value};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cfn-collect")]
#[command(
    author,
    version,
    about = "Collect deployment metadata from a CloudFormation-compatible metadata server"
)]
struct Cli {
    /// URL to query for CloudFormation metadata
    #[arg(long)]
    metadata_url: Option<String>,

    /// Local file to read for the metadata URL if not explicitly specified
    #[arg(long, default_value = DEFAULT_METADATA_HINT)]
    heat_metadata_hint: PathBuf,

    /// Stack name to describe
    #[arg(long)]
    stack_name: Option<String>,

    /// Path to metadata, resource.field[.x.y] (repeatable)
    #[arg(long = "path")]
    paths: Vec<String>,

    /// Access key ID
    #[arg(long, env = "CFN_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "CFN_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Key to explode into multiple collected outputs (repeatable)
    #[arg(long = "deployment-key", default_value = DEFAULT_DEPLOYMENT_KEY)]
    deployment_keys: Vec<String>,

    /// Request timeout in seconds
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Output format
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// One object keyed by output name
    #[default]
    Json,
    /// An ordered list of `{name, content}` objects
    List,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "list" => Ok(OutputFormat::List),
            _ => Err(format!("unknown format: {} (expected json or list)", s)),
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("invalid timeout: {} (expected seconds)", s))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout {}: {}", s, e))
}

impl Cli {
    fn config(&self) -> CfnConfig {
        CfnConfig {
            metadata_url: self.metadata_url.clone(),
            heat_metadata_hint: Some(self.heat_metadata_hint.clone()),
            stack_name: self.stack_name.clone(),
            path: self.paths.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            deployment_key: self.deployment_keys.clone(),
            timeout: self.timeout,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CfnError> {
    let collector = Collector::new(cli.config())?;
    let outputs = collector.collect().await?;

    let value = match cli.format {
        OutputFormat::Json => Value::Object(
            outputs
                .into_iter()
                .map(|o| (o.name, o.content))
                .collect::<Map<_, _>>(),
        ),
        OutputFormat::List => Value::Array(
            outputs
                .into_iter()
                .map(|o| json!({"name": o.name, "content": o.content}))
                .collect(),
        ),
    };

    println!("{:#}", value);
    Ok(())
}
