use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::exec;
use crate::payload;
use crate::types::CheckResult;

/// Run the configured command once and return the JSON document to deliver.
pub async fn run_check(settings: &Settings) -> Result<Vec<u8>> {
    let outcome = exec::execute(&settings.program, &settings.args, settings.timeout).await?;
    debug!(
        program = %settings.program,
        exit_code = ?outcome.exit_code,
        status = %outcome.status,
        timed_out = outcome.timed_out,
        duration = ?outcome.duration,
        "check command finished"
    );

    let result = CheckResult {
        name: settings.name.clone(),
        command: settings.command_line(),
        status: outcome.status,
        output: outcome.output,
        ttl: settings.ttl,
        source: settings.source.clone(),
        handlers: settings.handlers.clone(),
    };

    let fragment = settings
        .json_file
        .as_deref()
        .map(payload::read_fragment)
        .transpose()?;
    payload::assemble(&result, fragment.as_ref())
}
