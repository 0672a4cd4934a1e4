// src/dag/mod.rs

//! DAG task model and analysis.
//!
//! - [`subtask`] holds the vertex type and its local timing recurrences.
//! - [`task`] contains the [`DagTask`] aggregate that owns the vertex arena.
//! - [`query`] provides reachability, topological ordering and transitive
//!   reduction.
//! - [`timing`] computes offsets, deadlines, length, workload and volumes.
//! - [`report`] renders a task for the console.

pub mod query;
pub mod report;
pub mod subtask;
pub mod task;
pub mod timing;

pub use subtask::{SubTask, SubTaskMode};
pub use task::{DagTask, compare_deadline, compare_period, compare_utilization};
