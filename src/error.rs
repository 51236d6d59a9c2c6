//! Error types for the wrapper.
//!
//! Every variant is a failure of the wrapper, not of the wrapped command. A
//! command that exits non-zero, is killed by a signal or times out is a
//! successful run that reports a non-OK status.

use std::net::SocketAddr;

use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug)]
pub enum WrapperError {
    /// Required arguments are missing.
    #[error("{0}")]
    Usage(String),

    /// The command could not be started at all.
    #[error("Command not found: {program} ({source})")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed for a reason other than its exit status.
    #[error("Failed waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The fragment is not valid JSON or not a JSON object.
    #[error("Invalid JSON in {origin}: {reason}")]
    MalformedFragment { origin: String, reason: String },

    /// The fragment file could not be read.
    #[error("Failed to read JSON file {origin}: {source}")]
    UnreadableFragment {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// The record could not be encoded as JSON.
    #[error("Failed to encode check result: {0}")]
    Encode(#[from] serde_json::Error),

    /// Sending the record to the agent failed.
    #[error("Problem sending JSON to socket {addr}: {reason}")]
    Delivery { addr: SocketAddr, reason: String },

    /// Writing the dry-run record to stdout failed.
    #[error("Problem writing JSON to stdout: {0}")]
    Stdout(#[source] std::io::Error),

    /// The TOML defaults file is unreadable or invalid.
    #[error("{0}")]
    Config(String),
}

impl WrapperError {
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapperError::Usage(_) => exit_codes::USAGE,
            WrapperError::Spawn { .. } | WrapperError::Wait { .. } => exit_codes::FATAL,
            WrapperError::MalformedFragment { .. }
            | WrapperError::UnreadableFragment { .. }
            | WrapperError::Encode(_) => exit_codes::FORMAT_FAILURE,
            WrapperError::Delivery { .. } | WrapperError::Stdout(_) => {
                exit_codes::DELIVERY_FAILURE
            }
            WrapperError::Config(_) => exit_codes::CONFIG_FAILURE,
        }
    }

    /// Usage errors are shown together with the help text.
    pub fn wants_help(&self) -> bool {
        matches!(self, WrapperError::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, WrapperError>;
