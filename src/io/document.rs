// src/io/document.rs

//! Structured task-set documents (JSON).
//!
//! ```json
//! { "tasks": [ { "t": 10, "d": 9,
//!   "vertices": [ { "id": 7, "c": 2, "s": 0, "p": 1 } ],
//!   "edges": [ { "from": 7, "to": 8 } ] } ] }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dag::{DagTask, SubTask};
use crate::errors::{DagError, Result};
use crate::io::validate::validate_acyclic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSetDocument {
    pub tasks: Vec<TaskDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    pub t: f64,
    pub d: f64,
    #[serde(default)]
    pub vertices: Vec<VertexDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexDocument {
    pub id: i64,
    pub c: f64,
    /// Processor type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u32>,
    /// Assigned core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub from: i64,
    pub to: i64,
}

/// Build a task from its document form.
///
/// External ids are remapped to `0..n` in document order. Problems are
/// reported as parse errors whose `line` is the 1-based position of the
/// offending vertex or edge entry.
pub fn task_from_document(doc: &TaskDocument) -> Result<DagTask> {
    let mut task = DagTask::new(doc.t, doc.d);
    let mut ids: HashMap<i64, usize> = HashMap::new();

    for (pos, v) in doc.vertices.iter().enumerate() {
        if ids.contains_key(&v.id) {
            return Err(DagError::ParseError {
                line: pos + 1,
                message: format!("vertex id {} declared twice", v.id),
            });
        }
        if !(v.c >= 0.0) {
            return Err(DagError::ParseError {
                line: pos + 1,
                message: format!("vertex {} has negative WCET {}", v.id, v.c),
            });
        }
        let dense = task.push_vertex(SubTask {
            c: v.c,
            gamma: v.s.unwrap_or(0),
            core: v.p.unwrap_or(0),
            ..SubTask::default()
        })?;
        ids.insert(v.id, dense);
    }

    for (pos, e) in doc.edges.iter().enumerate() {
        let lookup = |id: i64| {
            ids.get(&id).copied().ok_or_else(|| DagError::ParseError {
                line: pos + 1,
                message: format!("edge {} -> {} references unknown vertex {id}", e.from, e.to),
            })
        };
        let (from, to) = (lookup(e.from)?, lookup(e.to)?);
        task.add_edge(from, to).map_err(|err| DagError::ParseError {
            line: pos + 1,
            message: err.to_string(),
        })?;
    }

    validate_acyclic(&task)?;
    Ok(task)
}

/// Document form of a task; vertex ids are the dense indices.
pub fn task_to_document(task: &DagTask) -> TaskDocument {
    TaskDocument {
        t: task.period(),
        d: task.deadline(),
        vertices: task
            .vertices()
            .iter()
            .map(|v| VertexDocument {
                id: v.id as i64,
                c: v.c,
                s: Some(v.gamma),
                p: Some(v.core),
            })
            .collect(),
        edges: task
            .edges()
            .into_iter()
            .map(|(from, to)| EdgeDocument {
                from: from as i64,
                to: to as i64,
            })
            .collect(),
    }
}

pub fn parse_task_set(input: &str) -> Result<Vec<DagTask>> {
    let doc: TaskSetDocument = serde_json::from_str(input)?;
    let tasks = doc
        .tasks
        .iter()
        .map(task_from_document)
        .collect::<Result<Vec<_>>>()?;
    debug!(tasks = tasks.len(), "task set parsed");
    Ok(tasks)
}

pub fn read_task_set(path: impl AsRef<Path>) -> Result<Vec<DagTask>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let tasks = parse_task_set(&contents)?;
    info!(path = %path.display(), tasks = tasks.len(), "task set loaded");
    Ok(tasks)
}

pub fn task_set_to_json(tasks: &[DagTask]) -> Result<String> {
    let doc = TaskSetDocument {
        tasks: tasks.iter().map(task_to_document).collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn write_task_set(tasks: &[DagTask], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, task_set_to_json(tasks)?)?;
    info!(path = %path.display(), tasks = tasks.len(), "task set written");
    Ok(())
}
