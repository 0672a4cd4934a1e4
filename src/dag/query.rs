// src/dag/query.rs

//! Reachability, ancestor/descendant sets, topological ordering and
//! transitive reduction over the vertex arena.
//!
//! All traversals are iterative (explicit stack + visited set), so stack
//! depth does not grow with the graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use tracing::{debug, trace};

use crate::dag::subtask::SubTaskMode;
use crate::dag::task::DagTask;
use crate::errors::{DagError, Result};

impl DagTask {
    /// `true` if `of` is reachable from `candidate` through one or more edges.
    pub fn is_ancestor_of(&self, candidate: usize, of: usize) -> bool {
        let mut stack: Vec<usize> = match self.vertices.get(candidate) {
            Some(v) => v.succ.clone(),
            None => return false,
        };
        let mut visited: HashSet<usize> = HashSet::new();

        while let Some(id) = stack.pop() {
            if id == of {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.extend(self.vertices[id].succ.iter().copied());
        }
        false
    }

    /// `true` if `candidate` is reachable from `of`.
    pub fn is_descendant_of(&self, candidate: usize, of: usize) -> bool {
        self.is_ancestor_of(of, candidate)
    }

    /// Every vertex from which `v` is reachable (excluding `v`).
    pub fn ancestors(&self, v: usize) -> HashSet<usize> {
        self.reachable(v, false)
    }

    /// Every vertex reachable from `v` (excluding `v`).
    pub fn descendants(&self, v: usize) -> HashSet<usize> {
        self.reachable(v, true)
    }

    fn reachable(&self, start: usize, forward: bool) -> HashSet<usize> {
        let next = move |id: usize| {
            let v = &self.vertices[id];
            if forward { &v.succ } else { &v.pred }
        };

        let mut seen: HashSet<usize> = HashSet::new();
        if start >= self.vertices.len() {
            return seen;
        }

        let mut stack: Vec<usize> = next(start).clone();
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(next(id).iter().copied());
            }
        }
        seen
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.vertices
            .get(from)
            .is_some_and(|v| v.succ.contains(&to))
    }

    /// All edges as `(from, to)` pairs, grouped by source vertex.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.vertices
            .iter()
            .flat_map(|v| v.succ.iter().map(move |&s| (v.id, s)))
            .collect()
    }

    /// Vertices without predecessors, in id order.
    pub fn sources(&self) -> Vec<usize> {
        self.vertices
            .iter()
            .filter(|v| v.is_source())
            .map(|v| v.id)
            .collect()
    }

    /// Vertices without successors, in id order.
    pub fn sinks(&self) -> Vec<usize> {
        self.vertices
            .iter()
            .filter(|v| v.is_sink())
            .map(|v| v.id)
            .collect()
    }

    pub fn check_index_and_ids_are_equal(&self) -> bool {
        self.vertices.iter().enumerate().all(|(i, v)| v.id == i)
    }

    /// Compute the topological order (Kahn's algorithm).
    ///
    /// Among vertices that are ready at the same time the lowest id goes
    /// first, so the order is a pure function of the edge set.
    pub fn topological_sort(&mut self) -> Result<()> {
        self.ord_ids.clear();

        if !self.check_index_and_ids_are_equal() {
            return Err(DagError::StructureError(
                "ids and indexes do not correspond, can't use computed topological order"
                    .to_string(),
            ));
        }

        let n = self.vertices.len();
        let mut in_degree: Vec<usize> = self.vertices.iter().map(|v| v.pred.len()).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for &s in &self.vertices[id].succ {
                let left = in_degree.get(s).and_then(|d| d.checked_sub(1));
                let Some(left) = left else {
                    return Err(DagError::StructureError(format!(
                        "edge {id} -> {s} is not mirrored by the predecessor list of vertex {s}"
                    )));
                };
                in_degree[s] = left;
                if left == 0 {
                    ready.push(Reverse(s));
                }
            }
        }

        if order.len() != n {
            return Err(DagError::StructureError(format!(
                "topological order covers {} of {} vertices; the graph is not acyclic",
                order.len(),
                n
            )));
        }

        trace!(?order, "topological order computed");
        self.ord_ids = order;
        Ok(())
    }

    /// Compute the topological order if it is absent.
    pub fn ensure_topological_order(&mut self) -> Result<()> {
        if self.ord_ids.is_empty() || self.ord_ids.len() != self.vertices.len() {
            self.topological_sort()?;
        }
        Ok(())
    }

    /// Remove every edge `(u, w)` for which another path `u -> ... -> w`
    /// exists.
    pub fn transitive_reduction(&mut self) {
        let mut removed = 0usize;

        for i in 0..self.vertices.len() {
            let mut succ_desc: HashSet<usize> = HashSet::new();
            for &s in &self.vertices[i].succ {
                succ_desc.extend(self.descendants(s));
            }

            let to_remove: Vec<usize> = self.vertices[i]
                .succ
                .iter()
                .copied()
                .filter(|s| succ_desc.contains(s))
                .collect();

            for r in to_remove {
                self.vertices[i].succ.retain(|&s| s != r);
                self.vertices[r].pred.retain(|&p| p != i);
                removed += 1;
            }
        }

        if removed > 0 {
            self.invalidate();
        }
        debug!(removed, "transitive reduction done");
    }

    /// The join vertex of a conditional source: the common descendant of all
    /// of its branches that precedes every other common descendant.
    pub fn matching_sink(&self, source: usize) -> Option<usize> {
        let v = self.vertices.get(source)?;
        if v.mode != SubTaskMode::CondSource || v.succ.is_empty() {
            return None;
        }

        let mut common: Option<HashSet<usize>> = None;
        for &s in &v.succ {
            let mut reach = self.descendants(s);
            reach.insert(s);
            common = Some(match common {
                None => reach,
                Some(acc) => acc.intersection(&reach).copied().collect(),
            });
        }

        let common = common?;
        let mut candidates: Vec<usize> = common.iter().copied().collect();
        candidates.sort_unstable();
        candidates.into_iter().find(|&m| {
            !common
                .iter()
                .any(|&other| other != m && self.is_ancestor_of(other, m))
        })
    }

    /// Mark every `Normal` vertex that lies strictly between a conditional
    /// source and its matching sink as `CondInternal`.
    ///
    /// Used after loading a graph whose format only records the fork and join
    /// vertices. Returns the number of vertices retagged.
    pub fn restore_conditional_modes(&mut self) -> usize {
        let mut inside: HashSet<usize> = HashSet::new();
        for s in 0..self.vertices.len() {
            let Some(m) = self.matching_sink(s) else {
                continue;
            };
            let before_join = self.ancestors(m);
            inside.extend(
                self.descendants(s)
                    .into_iter()
                    .filter(|v| *v != m && before_join.contains(v)),
            );
        }

        let mut retagged = 0usize;
        for id in inside {
            let v = &mut self.vertices[id];
            if v.mode == SubTaskMode::Normal {
                v.mode = SubTaskMode::CondInternal;
                retagged += 1;
            }
        }
        trace!(retagged, "conditional-internal modes restored");
        retagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::subtask::SubTask;

    /// 0 -> 1 -> 3, 0 -> 2 -> 3, 0 -> 3
    fn diamond_with_shortcut() -> DagTask {
        let mut task = DagTask::new(10.0, 10.0);
        for c in [1.0, 2.0, 3.0, 4.0] {
            task.add_vertex(c).unwrap();
        }
        task.add_edge(0, 1).unwrap();
        task.add_edge(0, 2).unwrap();
        task.add_edge(1, 3).unwrap();
        task.add_edge(2, 3).unwrap();
        task.add_edge(0, 3).unwrap();
        task
    }

    #[test]
    fn reachability_queries() {
        let task = diamond_with_shortcut();
        assert!(task.is_ancestor_of(0, 3));
        assert!(task.is_ancestor_of(1, 3));
        assert!(!task.is_ancestor_of(3, 0));
        assert!(!task.is_ancestor_of(1, 2));
        assert!(!task.is_ancestor_of(2, 2));
        assert!(task.is_descendant_of(3, 1));

        assert_eq!(task.ancestors(3), HashSet::from([0, 1, 2]));
        assert_eq!(task.descendants(0), HashSet::from([1, 2, 3]));
        assert!(task.descendants(3).is_empty());
    }

    #[test]
    fn topological_sort_breaks_ties_by_lowest_id() {
        let mut task = diamond_with_shortcut();
        task.topological_sort().unwrap();
        assert_eq!(task.topological_order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn topological_sort_detects_cycles() {
        let mut task = DagTask::new(1.0, 1.0);
        task.add_vertex(1.0).unwrap();
        task.add_vertex(1.0).unwrap();
        task.add_edge(0, 1).unwrap();
        task.add_edge(1, 0).unwrap();

        assert!(matches!(
            task.topological_sort(),
            Err(DagError::StructureError(_))
        ));
        assert!(task.topological_order().is_empty());
    }

    #[test]
    fn set_vertices_rejects_repeated_successor() {
        let mut a = SubTask::new(0, 1.0);
        let mut b = SubTask::new(1, 1.0);
        a.succ = vec![1, 1];
        b.pred = vec![0];

        let mut task = DagTask::new(1.0, 1.0);
        assert!(matches!(
            task.set_vertices(vec![a, b]),
            Err(DagError::StructureError(_))
        ));
        assert!(task.is_empty());
    }

    #[test]
    fn topological_sort_reports_unmirrored_adjacency() {
        let mut a = SubTask::new(0, 1.0);
        let mut b = SubTask::new(1, 1.0);
        a.succ = vec![1, 1];
        b.pred = vec![0];

        let mut task = DagTask::new(1.0, 1.0);
        task.vertices = vec![a, b];
        assert!(matches!(
            task.topological_sort(),
            Err(DagError::StructureError(_))
        ));
        assert!(task.topological_order().is_empty());

        // successor index outside the arena
        task.vertices[0].succ = vec![5];
        task.vertices[1].pred.clear();
        assert!(matches!(
            task.topological_sort(),
            Err(DagError::StructureError(_))
        ));
    }

    #[test]
    fn transitive_reduction_drops_shortcut_only() {
        let mut task = diamond_with_shortcut();
        task.transitive_reduction();

        assert!(!task.has_edge(0, 3));
        assert!(task.has_edge(0, 1));
        assert!(task.has_edge(2, 3));
        assert!(!task.vertex(3).unwrap().pred.contains(&0));
        assert_eq!(task.edges().len(), 4);
    }

    #[test]
    fn mutation_invalidates_order() {
        let mut task = diamond_with_shortcut();
        task.topological_sort().unwrap();
        task.remove_edge(0, 3);
        assert!(task.topological_order().is_empty());
    }

    #[test]
    fn matching_sink_of_conditional_fork() {
        let mut task = diamond_with_shortcut();
        task.remove_edge(0, 3);
        task.set_mode(0, SubTaskMode::CondSource).unwrap();
        assert_eq!(task.matching_sink(0), Some(3));
        assert_eq!(task.matching_sink(1), None);
    }

    #[test]
    fn restore_conditional_modes_tags_branch_vertices() {
        let mut task = diamond_with_shortcut();
        task.remove_edge(0, 3);
        task.set_mode(0, SubTaskMode::CondSource).unwrap();
        task.set_mode(3, SubTaskMode::CondSink).unwrap();

        assert_eq!(task.restore_conditional_modes(), 2);
        assert_eq!(task.vertex(1).unwrap().mode, SubTaskMode::CondInternal);
        assert_eq!(task.vertex(2).unwrap().mode, SubTaskMode::CondInternal);
        assert_eq!(task.vertex(3).unwrap().mode, SubTaskMode::CondSink);
    }
}
