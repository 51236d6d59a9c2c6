mod check;
mod cli;
mod config;
mod deliver;
mod error;
mod exec;
mod exit_codes;
mod payload;
mod types;

use clap::{CommandFactory, Parser};
use console::Style;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{FileConfig, Settings};
use error::WrapperError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            if e.wants_help() {
                let _ = Cli::command().write_help(&mut std::io::stderr());
                eprintln!();
            }
            let red = Style::new().for_stderr().red().bold();
            eprintln!("{} {e}", red.apply_to("Error:"));
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> error::Result<()> {
    let file = match &cli.config {
        Some(path) => config::load_config(path).map_err(|e| WrapperError::Config(format!("{e:#}")))?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, file)?;

    let document = check::run_check(&settings).await?;
    deliver::deliver(settings.sink, &document).await
}

/// Diagnostics go to stderr; stdout carries only the dry-run record.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
