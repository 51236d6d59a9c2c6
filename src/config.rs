use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::cli::Cli;
use crate::deliver::Sink;
use crate::error::{Result, WrapperError};

/// Where the local monitoring agent listens for check results.
pub const DEFAULT_AGENT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3030);

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Optional defaults shared by every check on a host.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub agent_address: Option<SocketAddr>,
    pub timeout: Option<u64>,
    pub ttl: Option<u64>,
    pub source: Option<String>,
    #[serde(default)]
    pub handlers: Vec<String>,
}

/// Load defaults from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(config)
}

/// Everything one invocation needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub ttl: u64,
    pub source: String,
    pub handlers: Vec<String>,
    pub json_file: Option<PathBuf>,
    pub sink: Sink,
}

impl Settings {
    /// Combine command-line flags with file defaults. Flags win; handlers
    /// given on the command line replace the file's list.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self> {
        let name = cli
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| WrapperError::Usage("No check name specified".to_string()))?;

        let mut command = cli.command.into_iter();
        let program = command
            .next()
            .ok_or_else(|| WrapperError::Usage("Must pass a command to run".to_string()))?;
        let args: Vec<String> = command.collect();

        let timeout_secs = cli.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(WrapperError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let handlers = if cli.handlers.is_empty() {
            file.handlers
        } else {
            cli.handlers
        };

        let sink = if cli.dry_run {
            Sink::Stdout
        } else {
            Sink::Agent(file.agent_address.unwrap_or(DEFAULT_AGENT_ADDR))
        };

        Ok(Settings {
            name,
            program,
            args,
            timeout: Duration::from_secs(timeout_secs),
            ttl: cli.ttl.or(file.ttl).unwrap_or(0),
            source: cli.source.or(file.source).unwrap_or_default(),
            handlers,
            json_file: cli.json_file,
            sink,
        })
    }

    /// Program and arguments joined with single spaces, as reported to the agent.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
