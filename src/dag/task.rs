// src/dag/task.rs

//! The [`DagTask`] aggregate: owns the vertex arena plus task-level metrics.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use crate::dag::subtask::{SubTask, SubTaskMode};
use crate::errors::{DagError, Result};

/// A recurring real-time job modelled as a DAG of sub-jobs.
///
/// Vertices live in a dense arena; `vertices[i].id == i` always holds for
/// vertices added through this API. Derived metrics are memoized as
/// `Option`s and dropped whenever the structure or the execution times change.
#[derive(Debug, Clone, Default)]
pub struct DagTask {
    pub(crate) vertices: Vec<SubTask>,

    /// Period.
    pub(crate) t: f64,
    /// Relative deadline.
    pub(crate) d: f64,
    /// Critical-path length.
    pub(crate) length: Option<f64>,
    pub(crate) vol: Option<f64>,
    /// Worst-case workload.
    pub(crate) wcw: Option<f64>,
    pub(crate) delta: Option<f64>,
    pub(crate) u: Option<f64>,

    /// Topological order; empty until computed.
    pub(crate) ord_ids: Vec<usize>,
    /// Volume per processor type.
    pub(crate) typed_vol: BTreeMap<u32, f64>,
    /// Volume per assigned core.
    pub(crate) p_vol: BTreeMap<u32, f64>,

    /// Response time, filled in by external analyses.
    pub r: f64,
}

impl DagTask {
    pub fn new(period: f64, deadline: f64) -> Self {
        Self {
            t: period,
            d: deadline,
            ..Self::default()
        }
    }

    /// Append a vertex with execution time `c` and return its id.
    ///
    /// Negative or NaN execution times are a `StructureError`.
    pub fn add_vertex(&mut self, c: f64) -> Result<usize> {
        let id = self.vertices.len();
        check_wcet(id, c)?;
        self.vertices.push(SubTask::new(id, c));
        self.invalidate();
        Ok(id)
    }

    /// Append a prepared vertex. Its id is overwritten with its position and
    /// any adjacency it carries is dropped; use [`DagTask::add_edge`] to link it.
    pub fn push_vertex(&mut self, mut vertex: SubTask) -> Result<usize> {
        let id = self.vertices.len();
        check_wcet(id, vertex.c)?;
        vertex.id = id;
        vertex.pred.clear();
        vertex.succ.clear();
        self.vertices.push(vertex);
        self.invalidate();
        Ok(id)
    }

    /// Add the precedence edge `from -> to`, keeping `succ`/`pred` consistent.
    ///
    /// Self-loops, unknown ids and duplicate edges are rejected. Acyclicity is
    /// not checked here; callers building arbitrary graphs should validate
    /// with [`DagTask::topological_sort`].
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<()> {
        let n = self.vertices.len();
        if from >= n || to >= n {
            return Err(DagError::StructureError(format!(
                "edge {from} -> {to} references a vertex outside 0..{n}"
            )));
        }
        if from == to {
            return Err(DagError::StructureError(format!(
                "self-loop on vertex {from}"
            )));
        }
        if self.vertices[from].succ.contains(&to) {
            return Err(DagError::StructureError(format!(
                "duplicate edge {from} -> {to}"
            )));
        }

        self.vertices[from].succ.push(to);
        self.vertices[to].pred.push(from);
        self.invalidate();
        trace!(from, to, "edge added");
        Ok(())
    }

    /// Remove the edge `from -> to` from both adjacency lists.
    ///
    /// Returns `false` when the edge did not exist.
    pub fn remove_edge(&mut self, from: usize, to: usize) -> bool {
        let Some(src) = self.vertices.get_mut(from) else {
            return false;
        };
        let before = src.succ.len();
        src.succ.retain(|&s| s != to);
        if src.succ.len() == before {
            return false;
        }
        if let Some(dst) = self.vertices.get_mut(to) {
            dst.pred.retain(|&p| p != from);
        }
        self.invalidate();
        true
    }

    /// Replace the whole vertex arena.
    ///
    /// The ids must be dense (`vertices[i].id == i`), execution times must be
    /// non-negative, every adjacency index must be in range, adjacency lists
    /// hold no self-loops or repeated entries, and every `succ` entry must be
    /// mirrored by exactly one `pred` entry (and vice versa).
    pub fn set_vertices(&mut self, vertices: Vec<SubTask>) -> Result<()> {
        let n = vertices.len();
        for (i, v) in vertices.iter().enumerate() {
            if v.id != i {
                return Err(DagError::StructureError(format!(
                    "vertex at position {i} has id {}",
                    v.id
                )));
            }
            check_wcet(i, v.c)?;
            check_adjacency(i, &v.succ, "successor")?;
            check_adjacency(i, &v.pred, "predecessor")?;
            for &s in &v.succ {
                if s >= n || !vertices[s].pred.contains(&i) {
                    return Err(DagError::StructureError(format!(
                        "successor link {i} -> {s} has no matching predecessor link"
                    )));
                }
            }
            for &p in &v.pred {
                if p >= n || !vertices[p].succ.contains(&i) {
                    return Err(DagError::StructureError(format!(
                        "predecessor link {p} -> {i} has no matching successor link"
                    )));
                }
            }
        }

        self.vertices = vertices;
        self.invalidate();
        Ok(())
    }

    /// Release every vertex and all derived data.
    pub fn clear_vertices(&mut self) {
        self.vertices.clear();
        self.invalidate();
    }

    /// Drop the topological order and every memoized metric.
    pub(crate) fn invalidate(&mut self) {
        self.ord_ids.clear();
        self.length = None;
        self.vol = None;
        self.wcw = None;
        self.delta = None;
        self.u = None;
        self.typed_vol.clear();
        self.p_vol.clear();
    }

    pub fn vertices(&self) -> &[SubTask] {
        &self.vertices
    }

    pub fn vertex(&self, id: usize) -> Option<&SubTask> {
        self.vertices.get(id)
    }

    fn existing_mut(&mut self, id: usize) -> Result<&mut SubTask> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| DagError::StructureError(format!("no vertex with id {id}")))
    }

    /// Set the execution time of vertex `id`, dropping memoized metrics.
    pub fn set_wcet(&mut self, id: usize, c: f64) -> Result<()> {
        check_wcet(id, c)?;
        self.existing_mut(id)?.c = c;
        self.invalidate();
        Ok(())
    }

    pub fn set_mode(&mut self, id: usize, mode: SubTaskMode) -> Result<()> {
        self.existing_mut(id)?.mode = mode;
        self.invalidate();
        Ok(())
    }

    /// Set the processor type of vertex `id`; typed volumes are recomputed.
    pub fn set_gamma(&mut self, id: usize, gamma: u32) -> Result<()> {
        self.existing_mut(id)?.gamma = gamma;
        self.typed_vol.clear();
        Ok(())
    }

    pub fn set_core(&mut self, id: usize, core: u32) -> Result<()> {
        self.existing_mut(id)?.core = core;
        self.p_vol.clear();
        Ok(())
    }

    pub fn set_prio(&mut self, id: usize, prio: u32) -> Result<()> {
        self.existing_mut(id)?.prio = prio;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn period(&self) -> f64 {
        self.t
    }

    pub fn deadline(&self) -> f64 {
        self.d
    }

    pub fn set_period(&mut self, period: f64) {
        self.t = period;
        self.u = None;
    }

    pub fn set_deadline(&mut self, deadline: f64) {
        self.d = deadline;
        self.delta = None;
    }

    /// Critical-path length, if computed.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    pub fn volume(&self) -> Option<f64> {
        self.vol
    }

    pub fn worst_case_workload(&self) -> Option<f64> {
        self.wcw
    }

    pub fn utilization(&self) -> Option<f64> {
        self.u
    }

    pub fn density(&self) -> Option<f64> {
        self.delta
    }

    pub fn typed_volume(&self) -> &BTreeMap<u32, f64> {
        &self.typed_vol
    }

    pub fn p_volume(&self) -> &BTreeMap<u32, f64> {
        &self.p_vol
    }

    /// Topological order, empty if it was never computed or was invalidated.
    pub fn topological_order(&self) -> &[usize] {
        &self.ord_ids
    }
}

fn check_wcet(id: usize, c: f64) -> Result<()> {
    // also rejects NaN
    if !(c >= 0.0) {
        return Err(DagError::StructureError(format!(
            "vertex {id} has negative execution time {c}"
        )));
    }
    Ok(())
}

fn check_adjacency(id: usize, links: &[usize], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(links.len());
    for &l in links {
        if l == id || !seen.insert(l) {
            return Err(DagError::StructureError(format!(
                "vertex {id} lists {kind} {l} more than once or as itself"
            )));
        }
    }
    Ok(())
}

/// Order two tasks by relative deadline (ascending).
pub fn compare_deadline(a: &DagTask, b: &DagTask) -> Ordering {
    a.deadline().total_cmp(&b.deadline())
}

/// Order two tasks by period (ascending).
pub fn compare_period(a: &DagTask, b: &DagTask) -> Ordering {
    a.period().total_cmp(&b.period())
}

/// Order two tasks by utilization (ascending); tasks whose utilization was
/// never computed sort first.
pub fn compare_utilization(a: &DagTask, b: &DagTask) -> Ordering {
    let ua = a.utilization().unwrap_or(0.0);
    let ub = b.utilization().unwrap_or(0.0);
    ua.total_cmp(&ub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_keeps_adjacency_consistent() {
        let mut task = DagTask::new(10.0, 10.0);
        let a = task.add_vertex(1.0).unwrap();
        let b = task.add_vertex(2.0).unwrap();
        task.add_edge(a, b).unwrap();

        assert_eq!(task.vertex(a).unwrap().succ, vec![b]);
        assert_eq!(task.vertex(b).unwrap().pred, vec![a]);
    }

    #[test]
    fn add_edge_rejects_bad_edges() {
        let mut task = DagTask::new(10.0, 10.0);
        let a = task.add_vertex(1.0).unwrap();
        let b = task.add_vertex(2.0).unwrap();
        task.add_edge(a, b).unwrap();

        assert!(matches!(task.add_edge(a, b), Err(DagError::StructureError(_))));
        assert!(matches!(task.add_edge(a, a), Err(DagError::StructureError(_))));
        assert!(matches!(task.add_edge(a, 7), Err(DagError::StructureError(_))));
    }

    #[test]
    fn remove_edge_updates_both_sides() {
        let mut task = DagTask::new(10.0, 10.0);
        let a = task.add_vertex(1.0).unwrap();
        let b = task.add_vertex(2.0).unwrap();
        task.add_edge(a, b).unwrap();

        assert!(task.remove_edge(a, b));
        assert!(!task.remove_edge(a, b));
        assert!(task.vertex(a).unwrap().succ.is_empty());
        assert!(task.vertex(b).unwrap().pred.is_empty());
    }

    #[test]
    fn set_vertices_rejects_one_sided_links() {
        let mut a = SubTask::new(0, 1.0);
        let b = SubTask::new(1, 1.0);
        a.succ.push(1);

        let mut task = DagTask::new(1.0, 1.0);
        assert!(matches!(
            task.set_vertices(vec![a, b]),
            Err(DagError::StructureError(_))
        ));
    }

    #[test]
    fn negative_execution_times_are_rejected() {
        let mut task = DagTask::new(10.0, 10.0);
        assert!(matches!(task.add_vertex(-1.0), Err(DagError::StructureError(_))));
        assert!(matches!(task.add_vertex(f64::NAN), Err(DagError::StructureError(_))));
        assert!(task.is_empty());

        let a = task.add_vertex(0.0).unwrap();
        assert!(matches!(task.set_wcet(a, -2.0), Err(DagError::StructureError(_))));
        assert_eq!(task.vertex(a).unwrap().c, 0.0);

        let pushed = task.push_vertex(SubTask::new(0, -3.0));
        assert!(matches!(pushed, Err(DagError::StructureError(_))));
        assert!(matches!(
            task.set_vertices(vec![SubTask::new(0, -1.0)]),
            Err(DagError::StructureError(_))
        ));
    }

    #[test]
    fn metadata_setters_leave_adjacency_alone() {
        let mut task = DagTask::new(10.0, 10.0);
        let a = task.add_vertex(1.0).unwrap();
        let b = task.add_vertex(2.0).unwrap();
        task.add_edge(a, b).unwrap();

        task.set_gamma(a, 2).unwrap();
        task.set_core(a, 3).unwrap();
        task.set_prio(a, 4).unwrap();
        task.set_mode(b, SubTaskMode::CondSink).unwrap();

        let v = task.vertex(a).unwrap();
        assert_eq!((v.gamma, v.core, v.prio), (2, 3, 4));
        assert_eq!(v.succ, vec![b]);
        assert_eq!(task.vertex(b).unwrap().mode, SubTaskMode::CondSink);
        assert!(matches!(task.set_gamma(9, 1), Err(DagError::StructureError(_))));
    }

    #[test]
    fn clone_is_independent() {
        let mut task = DagTask::new(10.0, 10.0);
        let a = task.add_vertex(1.0).unwrap();
        let b = task.add_vertex(2.0).unwrap();
        task.add_edge(a, b).unwrap();

        let mut copy = task.clone();
        copy.set_wcet(a, 5.0).unwrap();
        copy.remove_edge(a, b);

        assert_eq!(task.vertex(a).unwrap().c, 1.0);
        assert_eq!(task.vertex(a).unwrap().succ, vec![b]);
    }

    #[test]
    fn comparators_order_by_attribute() {
        let mut tasks = vec![DagTask::new(30.0, 5.0), DagTask::new(10.0, 20.0)];

        tasks.sort_by(compare_period);
        assert_eq!(tasks[0].period(), 10.0);

        tasks.sort_by(compare_deadline);
        assert_eq!(tasks[0].deadline(), 5.0);

        tasks.sort_by(|a, b| compare_deadline(b, a));
        assert_eq!(tasks[0].deadline(), 20.0);
    }
}
