// src/config/mod.rs

//! Generator parameter loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed parameter model (`model.rs`).
//! - Load a parameter file from disk (`loader.rs`).
//! - Validate ranges and derive dependent values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::GeneratorParams;
pub use validate::validate_params;
