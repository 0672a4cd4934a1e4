// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::GeneratorParams;
use crate::config::validate::validate_params;
use crate::errors::Result;

/// Load generator parameters from a TOML file.
///
/// This only performs TOML deserialization; missing keys keep their
/// defaults and unknown keys are rejected. Use [`load_and_validate`] to also
/// check ranges.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<GeneratorParams> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let params: GeneratorParams = toml::from_str(&contents)?;
    debug!(path = %path.display(), "generator parameters read");

    Ok(params)
}

/// Load parameters from path, validate them and derive dependent values.
///
/// This is the entry point the rest of the crate uses before a generation run.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GeneratorParams> {
    let mut params = load_from_path(&path)?;
    validate_params(&params)?;
    params.configure();
    Ok(params)
}

/// Same as [`load_and_validate`] for an in-memory TOML document.
pub fn parse_and_validate(contents: &str) -> Result<GeneratorParams> {
    let mut params: GeneratorParams = toml::from_str(contents)?;
    validate_params(&params)?;
    params.configure();
    Ok(params)
}

/// Default parameter file looked up when none is given on the command line.
pub fn default_params_path() -> PathBuf {
    PathBuf::from("dagsched.toml")
}
