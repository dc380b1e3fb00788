mod config;
mod observability;

use clap::{Args, Parser, Subcommand};
use config::Config;
use shared::http::ShutdownOutcome;
use shared::signal::shutdown_signal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
/// Exit status when the shutdown timeout elapsed with requests still in flight.
const EXIT_FORCED_SHUTDOWN: u8 = 2;

#[derive(Parser)]
#[command(name = "relaychain", about = "Relays values through a chain of HTTP stages")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run a relay or terminal stage.
    Stage(ConfigArgs),
    /// Post random values to the first stage on a fixed interval.
    Generator(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, env = "RELAYCHAIN_CONFIG", default_value = "relaychain.yaml")]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("config has no `{0}` section")]
    MissingSection(&'static str),
    #[error("invalid stage config: {0}")]
    StageConfig(#[from] relay_stage::config::ValidationError),
    #[error("invalid generator config: {0}")]
    GeneratorConfig(#[from] generator::config::ValidationError),
    #[error(transparent)]
    Observability(#[from] observability::ObservabilityError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Stage(#[from] relay_stage::StageError),
    #[error(transparent)]
    Generator(#[from] generator::GeneratorError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Every failure ends up here after the resources owned by cli_main are released.
    let result = cli_main(cli);
    match &result {
        Ok(_) => tracing::info!("exiting"),
        Err(e) => eprintln!("error encountered: {e}"),
    }
    ExitCode::from(exit_status(&result))
}

/// 0 for a clean stop, 1 for any error, 2 when the drain timed out.
fn exit_status(result: &Result<ShutdownOutcome, CliError>) -> u8 {
    match result {
        Ok(ShutdownOutcome::Clean) => EXIT_SUCCESS,
        Ok(ShutdownOutcome::Forced) => EXIT_FORCED_SHUTDOWN,
        Err(_) => EXIT_FAILURE,
    }
}

fn cli_main(cli: Cli) -> Result<ShutdownOutcome, CliError> {
    match cli.command {
        CliCommand::Stage(args) => {
            let (config, stage) = load_stage_config(&args.config_file_path)?;

            let _guard = observability::init(&config.common)?;
            let runtime = build_runtime()?;

            Ok(runtime.block_on(relay_stage::run(stage, shutdown_signal()))?)
        }
        CliCommand::Generator(args) => {
            let (config, generator_config) = load_generator_config(&args.config_file_path)?;

            let _guard = observability::init(&config.common)?;
            let runtime = build_runtime()?;

            let summary = runtime.block_on(generator::run(generator_config, shutdown_signal()))?;
            tracing::info!(sent = summary.sent, reason = ?summary.reason, "generator finished");
            Ok(ShutdownOutcome::Clean)
        }
    }
}

fn load_stage_config(path: &Path) -> Result<(Config, relay_stage::config::Config), CliError> {
    let mut config = Config::from_file(path)?;
    let stage = config.stage.take().ok_or(CliError::MissingSection("stage"))?;
    stage.validate()?;
    Ok((config, stage))
}

fn load_generator_config(path: &Path) -> Result<(Config, generator::config::Config), CliError> {
    let mut config = Config::from_file(path)?;
    let generator_config = config
        .generator
        .take()
        .ok_or(CliError::MissingSection("generator"))?;
    generator_config.validate()?;
    Ok((config, generator_config))
}

fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
