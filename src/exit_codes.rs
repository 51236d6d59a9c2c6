//! Process exit codes for the wrapper itself.
//!
//! The wrapped command's normalized status travels inside the JSON record and
//! never shows up here.

/// The record was produced and delivered (or printed).
pub const SUCCESS: i32 = 0;

/// The command could not be spawned, or waiting on it failed.
pub const FATAL: i32 = 1;

/// Missing check name or command. Matches clap's own parse-error code.
pub const USAGE: i32 = 2;

/// The record could not be sent to the monitoring agent.
pub const DELIVERY_FAILURE: i32 = 3;

/// The JSON document could not be produced: the fragment is unreadable or not
/// a JSON object, or encoding failed.
pub const FORMAT_FAILURE: i32 = 4;

/// The TOML defaults file could not be read or is invalid.
pub const CONFIG_FAILURE: i32 = 5;
