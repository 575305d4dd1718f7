use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use bugsnag_deploy::config::{self, FileConfig};
use bugsnag_deploy::options::{DeployOptions, DeployParams};
use bugsnag_deploy::plugin::DeployPlugin;
use bugsnag_deploy::resolver::OptionResolver;
use bugsnag_deploy::transport;

mod host;

use host::CommandHost;

#[derive(Parser, Debug)]
#[command(name = "bugsnag-deploy", version)]
#[command(about = "Notify Bugsnag of a deploy after a successful build")]
struct Cli {
    /// Bugsnag project API key (32 characters). Also read from BUGSNAG_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Release stage (default: production). Also read from BUGSNAG_RELEASE_STAGE.
    #[arg(long)]
    release_stage: Option<String>,

    /// Source repository URL. Detected from the `origin` remote or the manifest if omitted.
    #[arg(long)]
    repository: Option<String>,

    /// Source control provider (e.g. github-enterprise)
    #[arg(long)]
    provider: Option<String>,

    /// Branch name. Detected from git if omitted.
    #[arg(long)]
    branch: Option<String>,

    /// Revision (commit hash). Detected from git if omitted.
    #[arg(long)]
    revision: Option<String>,

    /// Application version. Detected from Cargo.toml or package.json if omitted.
    #[arg(long)]
    app_version: Option<String>,

    /// Directory the build runs in; metadata is detected from here.
    #[arg(long, default_value = ".")]
    working_dir: PathBuf,

    /// Config file (default: <working-dir>/.bugsnag-deploy.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deploy notification endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the parameters that would be sent, with the API key redacted.
    Resolve,
    /// Send a deploy notification now.
    Notify,
    /// Run a build command and notify Bugsnag if it succeeds.
    Run {
        /// Build command and its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

/// Human-facing progress output on stderr.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let working_dir = absolute(&cli.working_dir)?;
    let file = load_file_config(&cli, &working_dir)?;
    let mut reporter = CliReporter;

    let mut options = file.options;
    config::layer(&mut options, config::env_options());
    config::layer(&mut options, flag_options(&cli));

    let options = DeployOptions::from_map(&options).context("invalid Bugsnag deploy options")?;
    let plugin = build_plugin(options, cli.endpoint.or(file.endpoint))?;

    match cli.cmd {
        Commands::Resolve => {
            let params = plugin.resolve(&working_dir);
            println!("{}", render_params(&params, &plugin)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Notify => {
            let params = plugin.notify(&working_dir)?;
            reporter.info(&format!(
                "deploy notified (releaseStage: {})",
                params.release_stage.as_deref().unwrap_or("-")
            ));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { command } => {
            let mut host = CommandHost::default();
            plugin.apply(&mut host);

            let outcome = host.run_build(&command, &working_dir, &mut reporter)?;
            for err in &outcome.errors {
                reporter.error(&format!("{err:#}"));
            }
            if outcome.status.success() && outcome.errors.is_empty() {
                reporter.info("deploy notified");
            }
            Ok(outcome.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}

fn load_file_config(cli: &Cli, working_dir: &Path) -> Result<FileConfig> {
    let loaded = match &cli.config {
        Some(path) => Some(FileConfig::load_from_file(path)?),
        None => FileConfig::load_from_dir(working_dir)?,
    };
    Ok(loaded.unwrap_or_default())
}

fn flag_options(cli: &Cli) -> Map<String, Value> {
    let flags = [
        ("apiKey", &cli.api_key),
        ("releaseStage", &cli.release_stage),
        ("repository", &cli.repository),
        ("provider", &cli.provider),
        ("branch", &cli.branch),
        ("revision", &cli.revision),
        ("appVersion", &cli.app_version),
    ];

    flags
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| (key.to_string(), Value::String(v.clone())))
        })
        .collect()
}

fn build_plugin(options: DeployOptions, endpoint: Option<String>) -> Result<DeployPlugin> {
    let mut notifier = transport::default_notifier()?;
    if let Some(endpoint) = endpoint {
        notifier = notifier.with_endpoint(endpoint);
    }
    Ok(DeployPlugin::with_parts(
        OptionResolver::new(options),
        Box::new(notifier),
    ))
}

fn render_params(params: &DeployParams, plugin: &DeployPlugin) -> Result<String> {
    let redacted = DeployParams {
        api_key: Some(plugin.options().api_key().redacted()),
        ..params.clone()
    };
    serde_json::to_string_pretty(&redacted).context("failed to serialize deploy parameters")
}
