// src/dag/timing.rs

//! Timing analysis: local offsets/deadlines, EFT/LST, critical-path length,
//! worst-case workload under conditional branching, volumes, utilization and
//! density.
//!
//! Every pass that walks the graph in precedence order computes the
//! topological order first if it is missing.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::subtask::SubTaskMode;
use crate::dag::task::DagTask;
use crate::errors::{DagError, Result};

impl DagTask {
    /// Forward pass: local offset of every vertex.
    pub fn compute_local_offsets(&mut self) -> Result<()> {
        self.ensure_topological_order()?;

        for i in 0..self.ord_ids.len() {
            let idx = self.ord_ids[i];
            let offset = self.vertices[idx].local_offset(&self.vertices)?;
            self.vertices[idx].local_o = Some(offset);
        }
        Ok(())
    }

    /// Backward pass: local deadline of every vertex against the task deadline.
    pub fn compute_local_deadlines(&mut self) -> Result<()> {
        self.ensure_topological_order()?;

        let deadline = self.d;
        for i in (0..self.ord_ids.len()).rev() {
            let idx = self.ord_ids[i];
            let local_d = self.vertices[idx].local_deadline(&self.vertices, deadline)?;
            self.vertices[idx].local_d = Some(local_d);
        }
        Ok(())
    }

    pub fn compute_efts(&mut self) -> Result<()> {
        self.compute_local_offsets()?;
        for v in self.vertices.iter_mut() {
            v.eft = Some(v.earliest_finishing_time()?);
        }
        Ok(())
    }

    pub fn compute_lsts(&mut self) -> Result<()> {
        self.compute_local_deadlines()?;
        for v in self.vertices.iter_mut() {
            v.lst = Some(v.latest_starting_time()?);
        }
        Ok(())
    }

    /// Longest WCET-weighted chain ending at each vertex.
    pub fn compute_acc_workload(&mut self) -> Result<()> {
        self.ensure_topological_order()?;

        for i in 0..self.ord_ids.len() {
            let idx = self.ord_ids[i];
            let mut max_acc_pred: f64 = 0.0;
            for &p in &self.vertices[idx].pred {
                let acc = self.vertices[p].acc_work.ok_or(DagError::UnsetField {
                    field: "acc_work",
                    vertex: p,
                })?;
                max_acc_pred = max_acc_pred.max(acc);
            }
            self.vertices[idx].acc_work = Some(self.vertices[idx].c + max_acc_pred);
        }
        Ok(())
    }

    /// Critical-path length `L`, ignoring conditional exclusivity.
    pub fn compute_length(&mut self) -> Result<f64> {
        self.compute_acc_workload()?;

        let length = self
            .vertices
            .iter()
            .filter_map(|v| v.acc_work)
            .fold(0.0, f64::max);
        self.length = Some(length);
        debug!(length, "critical-path length computed");
        Ok(length)
    }

    /// Sum of every execution time (both sides of every conditional).
    pub fn compute_volume(&mut self) -> f64 {
        let vol = self.vertices.iter().map(|v| v.c).sum();
        self.vol = Some(vol);
        vol
    }

    /// Worst-case workload: the heaviest run-time realizable execution, where
    /// each conditional source contributes only its heaviest branch.
    ///
    /// Walks the graph backwards, building for every vertex the set of
    /// vertices on its worst-case continuation. On equal branch sums the first
    /// successor in `succ` order is kept. Every source is released, so with
    /// several sources the workload covers the union of their continuations.
    pub fn compute_worst_case_workload(&mut self) -> Result<f64> {
        self.ensure_topological_order()?;

        if self.ord_ids.is_empty() {
            self.wcw = Some(0.0);
            return Ok(0.0);
        }

        let mut paths: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.vertices.len()];
        for &idx in self.ord_ids.iter().rev() {
            let mut path = BTreeSet::from([idx]);
            let v = &self.vertices[idx];

            if v.mode == SubTaskMode::CondSource {
                let mut best: Option<(usize, f64)> = None;
                for &s in &v.succ {
                    let sum: f64 = paths[s].iter().map(|&k| self.vertices[k].c).sum();
                    if best.is_none_or(|(_, max_sum)| sum > max_sum) {
                        best = Some((s, sum));
                    }
                }
                if let Some((s, _)) = best {
                    path.extend(paths[s].iter().copied());
                }
            } else {
                for &s in &v.succ {
                    path.extend(paths[s].iter().copied());
                }
            }

            paths[idx] = path;
        }

        let sources: Vec<usize> = self
            .ord_ids
            .iter()
            .copied()
            .filter(|&i| self.vertices[i].pred.is_empty())
            .collect();
        let mut covered = BTreeSet::new();
        for &src in &sources {
            covered.extend(paths[src].iter().copied());
        }

        let wcw = covered.iter().map(|&k| self.vertices[k].c).sum();
        self.wcw = Some(wcw);
        debug!(wcw, sources = sources.len(), "worst-case workload computed");
        Ok(wcw)
    }

    /// Volume grouped by processor type.
    pub fn compute_typed_volume(&mut self) {
        self.typed_vol.clear();
        for v in &self.vertices {
            *self.typed_vol.entry(v.gamma).or_insert(0.0) += v.c;
        }
    }

    /// Volume grouped by assigned core.
    pub fn compute_p_volume(&mut self) {
        self.p_vol.clear();
        for v in &self.vertices {
            *self.p_vol.entry(v.core).or_insert(0.0) += v.c;
        }
    }

    /// `u = wcw / t`, computing the worst-case workload first if needed.
    pub fn compute_utilization(&mut self) -> Result<f64> {
        if self.t <= 0.0 {
            return Err(DagError::ConfigError(format!(
                "period must be positive to compute utilization (got {})",
                self.t
            )));
        }
        let wcw = match self.wcw {
            Some(wcw) => wcw,
            None => self.compute_worst_case_workload()?,
        };
        let u = wcw / self.t;
        self.u = Some(u);
        Ok(u)
    }

    /// `delta = L / d`, computing the length first if needed.
    pub fn compute_density(&mut self) -> Result<f64> {
        if self.d <= 0.0 {
            return Err(DagError::ConfigError(format!(
                "deadline must be positive to compute density (got {})",
                self.d
            )));
        }
        let length = match self.length {
            Some(length) => length,
            None => self.compute_length()?,
        };
        let delta = length / self.d;
        self.delta = Some(delta);
        Ok(delta)
    }

    /// Every source-to-sink path as a sequence of vertex ids.
    ///
    /// Paths are listed source by source, following `succ` order at each fork.
    pub fn compute_all_paths(&self) -> Vec<Vec<usize>> {
        let mut all_paths = Vec::new();

        for source in self.sources() {
            let mut stack: Vec<Vec<usize>> = vec![vec![source]];
            while let Some(path) = stack.pop() {
                let Some(&last) = path.last() else {
                    continue;
                };
                let succ = &self.vertices[last].succ;
                if succ.is_empty() {
                    all_paths.push(path);
                    continue;
                }
                for &s in succ.iter().rev() {
                    let mut next = path.clone();
                    next.push(s);
                    stack.push(next);
                }
            }
        }

        all_paths
    }

    /// Run every analysis pass: length, volumes, worst-case workload, local
    /// windows, and (when period/deadline are set) utilization and density.
    pub fn analyze(&mut self) -> Result<()> {
        for v in self.vertices.iter_mut() {
            v.reset_timing();
        }
        self.topological_sort()?;

        self.compute_length()?;
        self.compute_volume();
        self.compute_typed_volume();
        self.compute_p_volume();
        self.compute_worst_case_workload()?;
        self.compute_efts()?;
        self.compute_lsts()?;

        if self.t > 0.0 {
            self.compute_utilization()?;
        }
        if self.d > 0.0 {
            self.compute_density()?;
        }

        debug!(
            vertices = self.vertices.len(),
            length = ?self.length,
            wcw = ?self.wcw,
            vol = ?self.vol,
            "task analyzed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(costs: &[f64], deadline: f64) -> DagTask {
        let mut task = DagTask::new(deadline, deadline);
        for &c in costs {
            task.add_vertex(c).unwrap();
        }
        for i in 1..costs.len() {
            task.add_edge(i - 1, i).unwrap();
        }
        task
    }

    #[test]
    fn acc_workload_follows_heaviest_predecessor() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3
        let mut task = DagTask::new(20.0, 20.0);
        for c in [1.0, 5.0, 2.0, 1.0] {
            task.add_vertex(c).unwrap();
        }
        task.add_edge(0, 1).unwrap();
        task.add_edge(0, 2).unwrap();
        task.add_edge(1, 3).unwrap();
        task.add_edge(2, 3).unwrap();

        assert_eq!(task.compute_length().unwrap(), 7.0);
        assert_eq!(task.vertex(3).unwrap().acc_work, Some(7.0));
        assert_eq!(task.vertex(2).unwrap().acc_work, Some(3.0));
    }

    #[test]
    fn empty_task_has_zero_metrics() {
        let mut task = DagTask::new(1.0, 1.0);
        assert_eq!(task.compute_length().unwrap(), 0.0);
        assert_eq!(task.compute_worst_case_workload().unwrap(), 0.0);
        assert_eq!(task.compute_volume(), 0.0);
    }

    #[test]
    fn utilization_and_density_compute_prerequisites() {
        let mut task = chain(&[2.0, 3.0, 4.0], 18.0);
        assert_eq!(task.compute_utilization().unwrap(), 0.5);
        assert_eq!(task.worst_case_workload(), Some(9.0));
        assert_eq!(task.compute_density().unwrap(), 0.5);
        assert_eq!(task.length(), Some(9.0));
    }

    #[test]
    fn utilization_requires_positive_period() {
        let mut task = chain(&[1.0], 0.0);
        assert!(matches!(
            task.compute_utilization(),
            Err(DagError::ConfigError(_))
        ));
    }

    #[test]
    fn worst_case_tie_keeps_first_branch() {
        // 0 (cond source) -> {1, 2} -> 3
        let mut task = DagTask::new(10.0, 10.0);
        for c in [1.0, 4.0, 4.0, 1.0] {
            task.add_vertex(c).unwrap();
        }
        task.set_mode(0, SubTaskMode::CondSource).unwrap();
        task.set_mode(3, SubTaskMode::CondSink).unwrap();
        task.add_edge(0, 2).unwrap();
        task.add_edge(0, 1).unwrap();
        task.add_edge(1, 3).unwrap();
        task.add_edge(2, 3).unwrap();

        assert_eq!(task.compute_worst_case_workload().unwrap(), 6.0);
    }

    #[test]
    fn worst_case_counts_every_source() {
        let mut task = DagTask::new(200.0, 200.0);
        task.add_vertex(1.0).unwrap();
        task.add_vertex(100.0).unwrap();
        task.analyze().unwrap();
        assert_eq!(task.worst_case_workload(), Some(101.0));

        // two roots feeding a conditional fork whose heavier branch is shared
        let mut task = DagTask::new(200.0, 200.0);
        for c in [1.0, 2.0, 5.0, 3.0, 9.0, 1.0] {
            task.add_vertex(c).unwrap();
        }
        for (a, b) in [(0, 2), (1, 2), (2, 3), (2, 4), (3, 5), (4, 5)] {
            task.add_edge(a, b).unwrap();
        }
        task.set_mode(2, SubTaskMode::CondSource).unwrap();
        task.set_mode(5, SubTaskMode::CondSink).unwrap();
        assert_eq!(task.compute_worst_case_workload().unwrap(), 1.0 + 2.0 + 5.0 + 9.0 + 1.0);
    }

    #[test]
    fn all_paths_of_diamond() {
        let mut task = DagTask::new(10.0, 10.0);
        for c in [1.0, 1.0, 1.0, 1.0] {
            task.add_vertex(c).unwrap();
        }
        task.add_edge(0, 1).unwrap();
        task.add_edge(0, 2).unwrap();
        task.add_edge(1, 3).unwrap();
        task.add_edge(2, 3).unwrap();

        assert_eq!(task.compute_all_paths(), vec![vec![0, 1, 3], vec![0, 2, 3]]);
    }

    #[test]
    fn typed_and_partitioned_volumes_group_costs() {
        let mut task = chain(&[2.0, 3.0, 4.0], 9.0);
        task.set_gamma(0, 1).unwrap();
        task.set_gamma(2, 1).unwrap();
        task.set_core(1, 3).unwrap();

        task.compute_typed_volume();
        task.compute_p_volume();

        assert_eq!(task.typed_volume().get(&1), Some(&6.0));
        assert_eq!(task.typed_volume().get(&0), Some(&3.0));
        assert_eq!(task.p_volume().get(&3), Some(&3.0));
        assert_eq!(task.p_volume().get(&0), Some(&6.0));
    }
}
