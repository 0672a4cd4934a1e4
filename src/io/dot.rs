// src/io/dot.rs

//! Reading and writing the DOT-like text form of a single task.
//!
//! ```text
//! digraph Task {
//! i [shape=box, label="D=9 T=10"];
//! 0 [label="2(0, p:0)",shape=diamond];
//! 1 [label="3(1, p:1)"];
//! 0 -> 1;
//! }
//! ```
//!
//! The loader is line oriented. External node ids may be any word; they are
//! remapped to dense indices in order of appearance.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::dag::{DagTask, SubTask, SubTaskMode};
use crate::errors::{DagError, Result};
use crate::io::validate::validate_acyclic;

struct DotPatterns {
    edge: Regex,
    node: Regex,
    wcet: Regex,
    core: Regex,
    proc_type: Regex,
    deadline: Regex,
    period: Regex,
}

impl DotPatterns {
    fn compile() -> Result<Self> {
        let re = |pattern: &str| Regex::new(pattern).map_err(anyhow::Error::from);
        Ok(Self {
            edge: re(r"^(\w+)\s*->\s*(\w+)\s*(?:\[.*\])?\s*;?$")?,
            node: re(r"^(\w+)\s*\[(.*)\]\s*;?$")?,
            wcet: re(r"^\s*([0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)")?,
            core: re(r"p:\s*([0-9]+)")?,
            proc_type: re(r"s:\s*([0-9]+)")?,
            deadline: re(r"D=\s*([0-9]+(?:\.[0-9]+)?)")?,
            period: re(r"T=\s*([0-9]+(?:\.[0-9]+)?)")?,
        })
    }
}

/// One classified input line.
#[derive(Debug, PartialEq)]
enum DotLine {
    Framing,
    Info { deadline: Option<f64>, period: Option<f64> },
    Node { id: String, vertex: SubTask },
    Edge { from: String, to: String },
}

/// Split `key=value` attributes on commas that are not inside quotes.
fn split_attributes(body: &str) -> Vec<(String, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in body.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let value = value.trim().trim_matches('"').to_string();
            Some((key.trim().to_string(), value))
        })
        .collect()
}

fn parse_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn classify(patterns: &DotPatterns, raw: &str, line: usize) -> Result<DotLine> {
    let text = raw.trim();
    if text.is_empty()
        || text == "{"
        || text == "}"
        || text.starts_with("digraph")
        || text.starts_with("//")
    {
        return Ok(DotLine::Framing);
    }

    if text.contains("->") {
        let caps = patterns.edge.captures(text).ok_or_else(|| DagError::ParseError {
            line,
            message: format!("malformed edge `{text}`"),
        })?;
        return Ok(DotLine::Edge {
            from: caps[1].to_string(),
            to: caps[2].to_string(),
        });
    }

    let caps = patterns.node.captures(text).ok_or_else(|| DagError::ParseError {
        line,
        message: format!("unrecognized line `{text}`"),
    })?;
    let id = caps[1].to_string();
    let attributes = split_attributes(&caps[2]);
    let label = attributes
        .iter()
        .find(|(k, _)| k == "label")
        .map(|(_, v)| v.as_str())
        .unwrap_or("");

    if id == "i" || label.contains("D=") || label.contains("T=") {
        return Ok(DotLine::Info {
            deadline: parse_number(&patterns.deadline, label),
            period: parse_number(&patterns.period, label),
        });
    }

    let c = parse_number(&patterns.wcet, label).ok_or_else(|| DagError::ParseError {
        line,
        message: format!("node `{id}` has no WCET in its label"),
    })?;
    let mut vertex = SubTask {
        c,
        ..SubTask::default()
    };
    if let Some(core) = parse_number(&patterns.core, label) {
        vertex.core = core as u32;
    }
    if let Some(gamma) = parse_number(&patterns.proc_type, label) {
        vertex.gamma = gamma as u32;
    }
    vertex.mode = match attributes.iter().find(|(k, _)| k == "shape") {
        Some((_, shape)) if shape == "diamond" => SubTaskMode::CondSource,
        Some((_, shape)) if shape == "box" => SubTaskMode::CondSink,
        _ => SubTaskMode::Normal,
    };

    Ok(DotLine::Node { id, vertex })
}

/// Parse a task from DOT text.
///
/// Edges may appear before the nodes they reference. The returned task is
/// checked for cycles and has its conditional-internal vertices re-tagged;
/// no metric is computed yet.
pub fn parse_dot(input: &str) -> Result<DagTask> {
    let patterns = DotPatterns::compile()?;

    let mut task = DagTask::default();
    let mut ids: HashMap<String, usize> = HashMap::new();
    let mut edges: Vec<(usize, String, String)> = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        match classify(&patterns, raw, line)? {
            DotLine::Framing => {}
            DotLine::Info { deadline, period } => {
                if let Some(d) = deadline {
                    task.set_deadline(d);
                }
                if let Some(t) = period {
                    task.set_period(t);
                }
            }
            DotLine::Node { id, vertex } => {
                if ids.contains_key(&id) {
                    return Err(DagError::ParseError {
                        line,
                        message: format!("node `{id}` declared twice"),
                    });
                }
                let dense = task.push_vertex(vertex)?;
                ids.insert(id, dense);
            }
            DotLine::Edge { from, to } => edges.push((line, from, to)),
        }
    }

    for (line, from, to) in edges {
        let lookup = |name: &str| {
            ids.get(name).copied().ok_or_else(|| DagError::ParseError {
                line,
                message: format!("edge references unknown node `{name}`"),
            })
        };
        let (f, t) = (lookup(&from)?, lookup(&to)?);
        task.add_edge(f, t).map_err(|e| DagError::ParseError {
            line,
            message: e.to_string(),
        })?;
    }

    validate_acyclic(&task)?;
    task.restore_conditional_modes();

    debug!(
        vertices = task.len(),
        edges = task.edges().len(),
        "task parsed from DOT"
    );
    Ok(task)
}

pub fn read_task_from_dot(path: impl AsRef<Path>) -> Result<DagTask> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let task = parse_dot(&contents)?;
    info!(path = %path.display(), vertices = task.len(), "task loaded");
    Ok(task)
}

/// Render a task as DOT text.
pub fn to_dot(task: &DagTask) -> String {
    let mut out = String::new();
    out.push_str("digraph Task {\n");
    let _ = writeln!(
        out,
        "i [shape=box, label=\"D={} T={}\"];",
        task.deadline(),
        task.period()
    );

    for v in task.vertices() {
        let _ = write!(out, "{} [label=\"{}({}, p:{})\"", v.id, v.c, v.id, v.core);
        match v.mode {
            SubTaskMode::CondSource => out.push_str(",shape=diamond"),
            SubTaskMode::CondSink => out.push_str(",shape=box"),
            _ => {}
        }
        out.push_str("];\n");
    }

    for (from, to) in task.edges() {
        let _ = writeln!(out, "{from} -> {to};");
    }
    out.push('}');
    out
}

pub fn save_as_dot(task: &DagTask, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_dot(task))?;
    info!(path = %path.display(), "task written as DOT");
    Ok(())
}
