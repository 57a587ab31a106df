use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;

use validate_schema::{Cli, ConfigManager, Output, ToolError, USAGE, ValidationEngine, logging};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.print().is_err() {
                eprintln!("{err}");
            }
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            println!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    Ok(runtime.block_on(validate(cli)))
}

async fn validate(cli: Cli) -> ExitCode {
    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", ToolError::from(err));
            return ExitCode::from(1);
        }
    };

    let verbosity = config.output.verbosity();
    if let Err(err) = logging::init(verbosity) {
        eprintln!("Warning: logging is unavailable: {}", err);
    }
    debug!(?config, "Configuration loaded");

    let output = Output::new(verbosity);
    let engine = ValidationEngine::new(&config);

    match engine
        .run_report(&cli.schema_folder, &cli.submission)
        .await
    {
        Ok(report) => {
            print!("{}", output.format_report(&report));
            ExitCode::from(report.outcome.exit_code())
        }
        Err(err) => {
            eprintln!("{}", output.format_error(&err));
            ExitCode::from(1)
        }
    }
}
