// src/io/mod.rs

//! Loading and saving tasks.
//!
//! - [`dot`]: the DOT-like single-task text form.
//! - [`document`]: JSON task-set documents.
//! - [`validate`]: acyclicity check applied to everything loaded.

pub mod document;
pub mod dot;
pub mod validate;

use std::path::Path;

use crate::dag::DagTask;
use crate::errors::Result;

pub use document::{read_task_set, write_task_set};
pub use dot::{parse_dot, read_task_from_dot, save_as_dot, to_dot};
pub use validate::validate_acyclic;

/// Load the tasks stored at `path`, choosing the format by extension:
/// `.json` is a task-set document, anything else is read as DOT.
pub fn read_tasks(path: impl AsRef<Path>) -> Result<Vec<DagTask>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        read_task_set(path)
    } else {
        Ok(vec![read_task_from_dot(path)?])
    }
}
