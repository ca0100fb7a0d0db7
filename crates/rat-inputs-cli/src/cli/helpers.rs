use rat_inputs_core::domain::RatError;
use rat_inputs_core::inputs::{ControlsConfig, InputError};
use rat_inputs_core::serialization::{read_json, write_json, JsonFileError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`), so stdout
/// stays clean for JSON output.
pub(super) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// A file that cannot be read is a system error; one that reads but does
/// not parse is bad input, reported under `parse_placeholder`.
fn json_file_error(error: JsonFileError, parse_placeholder: &'static str) -> RatError {
    let message = error.to_string();
    match error {
        JsonFileError::Read { .. } => RatError::io_system("IO.READ_INPUT", message),
        JsonFileError::Parse { .. } => RatError::input_validation(parse_placeholder, message),
        JsonFileError::Encode { .. } => RatError::internal("RUN.ENCODE_OUTPUT", message),
        JsonFileError::Write { .. } => RatError::io_system("IO.WRITE_OUTPUT", message),
    }
}

pub(super) fn load_json_input<T: DeserializeOwned>(
    path: &Path,
    parse_placeholder: &'static str,
) -> Result<T, RatError> {
    read_json(path).map_err(|error| json_file_error(error, parse_placeholder))
}

/// Controls file when given, all defaults otherwise.
pub(super) fn load_controls(path: Option<&Path>) -> Result<ControlsConfig, RatError> {
    let Some(path) = path else {
        return Ok(ControlsConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|source| {
        RatError::io_system(
            "IO.READ_INPUT",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;
    ControlsConfig::from_json_str(&text).map_err(|error| RatError::from(InputError::from(error)))
}

pub(super) fn write_json_output<T: Serialize>(path: &Path, value: &T) -> Result<(), RatError> {
    write_json(path, value).map_err(|error| json_file_error(error, "RUN.ENCODE_OUTPUT"))?;
    info!(path = %path.display(), "wrote output");
    Ok(())
}
