//! Turns a [`CheckResult`] into the JSON document handed to delivery.
//!
//! Without a fragment the record is serialized as is. With a fragment, the
//! record is applied as a patch over the fragment's object: the record's keys
//! replace same-named keys, every other key passes through in its original
//! position.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, WrapperError};
use crate::types::CheckResult;

/// An externally supplied JSON document and where it came from.
#[derive(Debug)]
pub struct Fragment {
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// Read a fragment file. Parsing is deferred to [`assemble`].
pub fn read_fragment(path: &Path) -> Result<Fragment> {
    let origin = path.display().to_string();
    match std::fs::read(path) {
        Ok(bytes) => Ok(Fragment { origin, bytes }),
        Err(source) => Err(WrapperError::UnreadableFragment { origin, source }),
    }
}

/// Serialize `result`, merged over `fragment` when one is given.
pub fn assemble(result: &CheckResult, fragment: Option<&Fragment>) -> Result<Vec<u8>> {
    let Some(fragment) = fragment else {
        return Ok(serde_json::to_vec(result)?);
    };
    let mut document = parse_fragment(fragment)?;
    overlay(&mut document, to_object(result)?);
    Ok(serde_json::to_vec(&document)?)
}

/// The record as a key/value map, with default-valued optionals already absent.
fn to_object(result: &CheckResult) -> Result<Map<String, Value>> {
    match serde_json::to_value(result)? {
        Value::Object(map) => Ok(map),
        other => Err(WrapperError::Encode(serde::ser::Error::custom(format!(
            "check result serialized to {}",
            kind(&other)
        )))),
    }
}

fn parse_fragment(fragment: &Fragment) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_slice(&fragment.bytes).map_err(|e| WrapperError::MalformedFragment {
            origin: fragment.origin.clone(),
            reason: e.to_string(),
        })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(WrapperError::MalformedFragment {
            origin: fragment.origin.clone(),
            reason: format!("expected a JSON object, found {}", kind(&other)),
        }),
    }
}

fn overlay(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        base.insert(key, value);
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
