// src/io/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::DagTask;
use crate::errors::{DagError, Result};

/// Reject a loaded task whose edges form a cycle.
///
/// Loaders build the arena edge by edge without checking reachability, so
/// every loaded graph goes through here before it is handed out.
pub fn validate_acyclic(task: &DagTask) -> Result<()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for v in task.vertices() {
        graph.add_node(v.id);
    }
    for (from, to) in task.edges() {
        graph.add_edge(from, to, ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagError::DagCycle(format!(
            "cycle detected in task graph involving vertex {}",
            cycle.node_id()
        ))),
    }
}
