use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "check-wrapper",
    version,
    about = "Execute a command and send the result to a monitoring agent socket"
)]
pub struct Cli {
    /// Print the result to stdout instead of sending it to the agent
    #[arg(short = 'd', long, short_alias = 'D')]
    pub dry_run: bool,

    /// The name of the check
    #[arg(short = 'n', long, short_alias = 'N')]
    pub name: Option<String>,

    /// The TTL for the check, in seconds
    #[arg(short = 't', long)]
    pub ttl: Option<u64>,

    /// Seconds before the command is killed [default: 5]
    #[arg(short = 'T', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// The source of the check
    #[arg(short = 's', long, short_alias = 'S')]
    pub source: Option<String>,

    /// A handler for the check. Repeat the flag or separate names with commas
    #[arg(short = 'H', long = "handlers", value_delimiter = ',')]
    pub handlers: Vec<String>,

    /// JSON file to merge the result into
    #[arg(short = 'f', long)]
    pub json_file: Option<PathBuf>,

    /// TOML file with defaults (agent address, timeout, ttl, source, handlers)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// The command to run, followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
