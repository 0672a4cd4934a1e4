// src/generator.rs

//! Random DAG synthesis following the series-parallel expansion of Melani et
//! al., plus the post-passes that turn the skeleton into a task:
//! extra precedence edges, WCET assignment and scheduling parameters.
//!
//! The random source is always passed in explicitly; two runs with the same
//! seeded [`StdRng`] produce identical tasks.

use std::collections::{HashMap, HashSet};

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::config::GeneratorParams;
use crate::dag::{DagTask, SubTask, SubTaskMode};
use crate::errors::{DagError, Result};
use crate::types::DagType;

/// What a branch of a fork turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreationState {
    Conditional,
    Parallel,
    Terminal,
}

impl CreationState {
    /// Order matches [`GeneratorParams::creation_weights`].
    const ALL: [CreationState; 3] = [
        CreationState::Conditional,
        CreationState::Parallel,
        CreationState::Terminal,
    ];
}

/// Build the random source for a generation run.
pub fn rng_from_params(params: &GeneratorParams) -> StdRng {
    match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Recursive series-parallel expansion.
pub struct SeriesParallelGenerator<'a, R: Rng> {
    params: &'a GeneratorParams,
    states: WeightedIndex<f64>,
    rng: &'a mut R,
}

impl<'a, R: Rng> SeriesParallelGenerator<'a, R> {
    pub fn new(params: &'a GeneratorParams, rng: &'a mut R) -> Result<Self> {
        let states = WeightedIndex::new(params.creation_weights()).map_err(|e| {
            DagError::ConfigError(format!("invalid branch creation weights: {e}"))
        })?;
        Ok(Self { params, states, rng })
    }

    /// Base call: create the outer source and sink, open the outermost fork
    /// and expand it recursively.
    ///
    /// `task` must be empty; the source gets id 0 and the sink id 1.
    pub fn expand(&mut self, task: &mut DagTask) -> Result<()> {
        if !task.is_empty() {
            return Err(DagError::StructureError(format!(
                "series-parallel expansion needs an empty task (found {} vertices)",
                task.len()
            )));
        }

        let depth = self.params.rec_depth as i32;
        let source = task.push_vertex(SubTask {
            depth,
            ..SubTask::default()
        })?;
        let sink = task.push_vertex(SubTask {
            depth: -depth,
            ..SubTask::default()
        })?;

        let conditional = self.rng.random::<f64>() < self.params.prob_s_cond;
        let branches = self.draw_branches(conditional);
        debug!(conditional, branches, depth, "opening outermost fork");

        self.expand_between(task, source, sink, depth - 1, branches, conditional, false)?;

        info!(vertices = task.len(), "series-parallel skeleton generated");
        Ok(())
    }

    fn draw_branches(&mut self, conditional: bool) -> u32 {
        let max = if conditional {
            self.params.max_cond_branches
        } else {
            self.params.max_par_branches
        };
        self.rng.random_range(2..=max.max(2))
    }

    fn draw_state(&mut self, depth: i32) -> CreationState {
        if depth <= 0 {
            return CreationState::Terminal;
        }
        CreationState::ALL[self.states.sample(&mut *self.rng)]
    }

    /// Fill the fork `source -> ... -> sink` with `branches` branches.
    ///
    /// `within_cond` tells whether an enclosing fork is conditional; every
    /// vertex created under a conditional fork is `CondInternal`.
    #[allow(clippy::too_many_arguments)]
    fn expand_between(
        &mut self,
        task: &mut DagTask,
        source: usize,
        sink: usize,
        depth: i32,
        branches: u32,
        conditional: bool,
        within_cond: bool,
    ) -> Result<()> {
        let inner_cond = conditional || within_cond;
        let mode = if inner_cond {
            SubTaskMode::CondInternal
        } else {
            SubTaskMode::Normal
        };

        let hor_space = f64::from(self.params.max_branches()).powi(depth.max(0));
        let step = hor_space / f64::from(branches.saturating_sub(1).max(1));
        let w1 = task.vertices[source].width - hor_space / 2.0;
        let w2 = task.vertices[sink].width - hor_space / 2.0;

        for i in 0..branches {
            let offset = step * f64::from(i);
            match self.draw_state(depth) {
                CreationState::Terminal => {
                    let v = task.push_vertex(SubTask {
                        depth,
                        width: w1 + offset,
                        mode,
                        ..SubTask::default()
                    })?;
                    task.add_edge(source, v)?;
                    task.add_edge(v, sink)?;
                    trace!(vertex = v, source, sink, "terminal branch");
                }
                state @ (CreationState::Parallel | CreationState::Conditional) => {
                    let sub_source = task.push_vertex(SubTask {
                        depth,
                        width: w1 + offset,
                        mode,
                        ..SubTask::default()
                    })?;
                    let sub_sink = task.push_vertex(SubTask {
                        depth: -depth,
                        width: w2 + offset,
                        mode,
                        ..SubTask::default()
                    })?;
                    task.add_edge(source, sub_source)?;
                    task.add_edge(sub_sink, sink)?;

                    let nested_cond = state == CreationState::Conditional;
                    let nested_branches = self.draw_branches(nested_cond);
                    trace!(
                        sub_source,
                        sub_sink,
                        nested_cond,
                        nested_branches,
                        "nested fork"
                    );
                    self.expand_between(
                        task,
                        sub_source,
                        sub_sink,
                        depth - 1,
                        nested_branches,
                        nested_cond,
                        inner_cond,
                    )?;
                }
            }
        }

        if conditional && branches > 0 {
            task.vertices[source].mode = SubTaskMode::CondSource;
            task.vertices[sink].mode = SubTaskMode::CondSink;
        }
        Ok(())
    }
}

impl DagTask {
    /// Add extra precedence edges `v -> w`, each with probability `prob`.
    ///
    /// A pair is eligible when `v` sits deeper in the layout than `w`, `v` is
    /// not a conditional source, neither vertex already reaches the other, and
    /// both sit in the same branch of every enclosing conditional fork (with
    /// identical conditional-source predecessors). Added edges therefore never
    /// join mutually exclusive branches and never close a cycle.
    ///
    /// Returns the number of edges added.
    pub fn make_it_dag<R: Rng>(&mut self, prob: f64, rng: &mut R) -> Result<usize> {
        let n = self.vertices.len();
        let sinks: HashMap<usize, usize> = (0..n)
            .filter_map(|s| self.matching_sink(s).map(|m| (s, m)))
            .collect();
        let contexts: Vec<Vec<(usize, usize)>> = (0..n)
            .map(|v| self.conditional_context(v, &sinks))
            .collect();
        let cond_preds: Vec<Vec<usize>> = self
            .vertices
            .iter()
            .map(|v| v.cond_pred(&self.vertices))
            .collect();

        let mut added = 0usize;
        for v in 0..n {
            for w in 0..n {
                if v == w {
                    continue;
                }
                let (vv, ww) = (&self.vertices[v], &self.vertices[w]);
                if vv.depth > ww.depth
                    && vv.mode != SubTaskMode::CondSource
                    && cond_preds[v] == cond_preds[w]
                    && contexts[v] == contexts[w]
                    && !self.is_ancestor_of(v, w)
                    && !self.is_ancestor_of(w, v)
                    && rng.random::<f64>() < prob
                {
                    self.add_edge(v, w)?;
                    added += 1;
                }
            }
        }

        debug!(added, prob, "extra precedence edges added");
        Ok(added)
    }

    /// `(conditional source, branch head)` for every conditional fork that
    /// encloses `v`, sorted by source id.
    fn conditional_context(&self, v: usize, sinks: &HashMap<usize, usize>) -> Vec<(usize, usize)> {
        let ancestors: HashSet<usize> = self.ancestors(v);
        let mut sources: Vec<usize> = ancestors
            .iter()
            .copied()
            .filter(|&a| self.vertices[a].mode == SubTaskMode::CondSource)
            .collect();
        sources.sort_unstable();

        let mut context = Vec::new();
        for s in sources {
            let Some(&m) = sinks.get(&s) else {
                continue;
            };
            if m == v || ancestors.contains(&m) {
                continue;
            }
            if let Some(&head) = self.vertices[s]
                .succ
                .iter()
                .find(|&&b| b == v || ancestors.contains(&b))
            {
                context.push((s, head));
            }
        }
        context
    }

    /// Draw every vertex's WCET uniformly from the integers in `[min, max]`.
    pub fn assign_wcet<R: Rng>(&mut self, min: f64, max: f64, rng: &mut R) -> Result<()> {
        let lo = min.ceil() as i64;
        let hi = max.floor() as i64;
        if lo > hi || lo < 0 {
            return Err(DagError::ConfigError(format!(
                "no non-negative integer WCET within [{min}, {max}]"
            )));
        }

        for v in self.vertices.iter_mut() {
            v.c = rng.random_range(lo..=hi) as f64;
        }
        self.invalidate();
        Ok(())
    }

    /// Draw a processor type in `0..types` for every vertex.
    pub fn assign_types<R: Rng>(&mut self, types: u32, rng: &mut R) {
        let types = types.max(1);
        for v in self.vertices.iter_mut() {
            v.gamma = rng.random_range(0..types);
        }
        self.typed_vol.clear();
    }

    pub fn assign_fixed_sched_parameters(&mut self, period: f64, deadline: f64) {
        self.set_period(period);
        self.set_deadline(deadline);
    }

    /// Period and deadline both set to `ceil(wcw / u)`.
    pub fn assign_sched_parameters_uunifast(&mut self, u: f64) -> Result<()> {
        if u <= 0.0 {
            return Err(DagError::ConfigError(format!(
                "target utilization must be > 0 (got {u})"
            )));
        }
        let wcw = match self.wcw {
            Some(wcw) => wcw,
            None => self.compute_worst_case_workload()?,
        };
        let period = (wcw / u).ceil();
        self.assign_fixed_sched_parameters(period, period);
        Ok(())
    }

    /// Period drawn from `[L, wcw / beta]`, deadline from `[L, period]`.
    pub fn assign_sched_parameters<R: Rng>(&mut self, beta: f64, rng: &mut R) -> Result<()> {
        let (length, wcw) = self.length_and_wcw(beta)?;

        let period = uniform_or_min(length, wcw / beta, rng);
        let deadline = uniform_or_min(length, period, rng);
        self.assign_fixed_sched_parameters(period, deadline);
        Ok(())
    }

    /// Like [`DagTask::assign_sched_parameters`], but the deadline is drawn
    /// from `[L, 2 * period]` and may exceed the period.
    pub fn assign_arbitrary_sched_parameters<R: Rng>(
        &mut self,
        beta: f64,
        rng: &mut R,
    ) -> Result<()> {
        let (length, wcw) = self.length_and_wcw(beta)?;

        let period = uniform_or_min(length, wcw / beta, rng);
        let deadline = uniform_or_min(length, 2.0 * period, rng);
        self.assign_fixed_sched_parameters(period, deadline);
        Ok(())
    }

    fn length_and_wcw(&mut self, beta: f64) -> Result<(f64, f64)> {
        if beta <= 0.0 {
            return Err(DagError::ConfigError(format!("beta must be > 0 (got {beta})")));
        }
        let length = match self.length {
            Some(length) => length,
            None => self.compute_length()?,
        };
        let wcw = match self.wcw {
            Some(wcw) => wcw,
            None => self.compute_worst_case_workload()?,
        };
        Ok((length, wcw))
    }
}

fn uniform_or_min<R: Rng>(min: f64, max: f64, rng: &mut R) -> f64 {
    if max > min {
        rng.random_range(min..=max)
    } else {
        min
    }
}

/// Full generation pipeline for one task: skeleton, extra edges, WCETs,
/// processor types (typed DAGs), transitive reduction and analysis.
///
/// Period and deadline are left at zero; assign them afterwards.
pub fn generate_task<R: Rng>(params: &GeneratorParams, rng: &mut R) -> Result<DagTask> {
    let mut task = DagTask::default();
    SeriesParallelGenerator::new(params, rng)?.expand(&mut task)?;

    task.make_it_dag(params.add_prob, rng)?;
    task.assign_wcet(params.c_min, params.c_max, rng)?;
    if params.dag_type == DagType::Tdag {
        task.assign_types(params.diff_proc_types, rng);
    }
    task.transitive_reduction();
    task.analyze()?;

    debug!(
        vertices = task.len(),
        edges = task.edges().len(),
        "task generated"
    );
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GeneratorParams {
        GeneratorParams {
            rec_depth: 3,
            p_cond: 0.3,
            p_par: 0.3,
            p_term: 0.4,
            prob_s_cond: 0.5,
            dag_type: DagType::Cdag,
            ..GeneratorParams::default()
        }
    }

    #[test]
    fn skeleton_has_single_source_and_sink() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(7);
        let mut task = DagTask::default();
        SeriesParallelGenerator::new(&params, &mut rng)
            .unwrap()
            .expand(&mut task)
            .unwrap();

        assert_eq!(task.sources(), vec![0]);
        assert_eq!(task.sinks(), vec![1]);
        assert!(task.len() >= 4);
    }

    #[test]
    fn depth_zero_forces_terminal_branches() {
        let params = GeneratorParams {
            rec_depth: 1,
            max_par_branches: 3,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut task = DagTask::default();
        SeriesParallelGenerator::new(&params, &mut rng)
            .unwrap()
            .expand(&mut task)
            .unwrap();

        let branches = task.vertex(0).unwrap().succ.len();
        assert_eq!(task.len(), 2 + branches);
        assert!(task.vertices()[2..].iter().all(|v| v.pred == vec![0] && v.succ == vec![1]));
    }

    #[test]
    fn conditional_fork_tags_modes() {
        let params = GeneratorParams {
            rec_depth: 1,
            prob_s_cond: 1.0,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut task = DagTask::default();
        SeriesParallelGenerator::new(&params, &mut rng)
            .unwrap()
            .expand(&mut task)
            .unwrap();

        assert_eq!(task.vertex(0).unwrap().mode, SubTaskMode::CondSource);
        assert_eq!(task.vertex(1).unwrap().mode, SubTaskMode::CondSink);
        assert!(task.vertices()[2..].iter().all(|v| v.mode == SubTaskMode::CondInternal));
    }

    #[test]
    fn expand_rejects_non_empty_task() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(3);
        let mut task = DagTask::default();
        task.add_vertex(1.0).unwrap();
        let result = SeriesParallelGenerator::new(&params, &mut rng)
            .unwrap()
            .expand(&mut task);
        assert!(matches!(result, Err(DagError::StructureError(_))));
    }

    /// 0 -> {2, 3}, 2 -> 1, 3 -> {5, 6} -> 4 -> 1, depths set as the
    /// series-parallel expansion would.
    fn nested_fork(inner_conditional: bool) -> DagTask {
        let (fork, join, inside) = match inner_conditional {
            true => (
                SubTaskMode::CondSource,
                SubTaskMode::CondSink,
                SubTaskMode::CondInternal,
            ),
            false => (SubTaskMode::Normal, SubTaskMode::Normal, SubTaskMode::Normal),
        };
        let mut task = DagTask::default();
        for (depth, mode) in [
            (2, SubTaskMode::Normal),
            (-2, SubTaskMode::Normal),
            (1, SubTaskMode::Normal),
            (1, fork),
            (-1, join),
            (0, inside),
            (0, inside),
        ] {
            task.push_vertex(SubTask {
                depth,
                mode,
                ..SubTask::default()
            })
            .unwrap();
        }
        for (a, b) in [(0, 2), (2, 1), (0, 3), (4, 1), (3, 5), (3, 6), (5, 4), (6, 4)] {
            task.add_edge(a, b).unwrap();
        }
        task
    }

    #[test]
    fn make_it_dag_links_parallel_branches() {
        let mut task = nested_fork(false);
        let before = task.edges().len();
        let mut rng = StdRng::seed_from_u64(1);

        let added = task.make_it_dag(1.0, &mut rng).unwrap();
        assert!(added > 0);
        assert_eq!(task.edges().len(), before + added);
        assert!(task.has_edge(2, 5));
        task.topological_sort().unwrap();

        let mut untouched = nested_fork(false);
        assert_eq!(untouched.make_it_dag(0.0, &mut rng).unwrap(), 0);
    }

    #[test]
    fn make_it_dag_keeps_conditional_branches_exclusive() {
        let mut task = nested_fork(true);
        let mut rng = StdRng::seed_from_u64(1);

        let added = task.make_it_dag(1.0, &mut rng).unwrap();
        assert_eq!(added, 1);
        assert!(task.has_edge(2, 4));

        assert_eq!(task.vertex(3).unwrap().succ, vec![5, 6]);
        assert_eq!(task.vertex(5).unwrap().pred, vec![3]);
        assert_eq!(task.vertex(6).unwrap().pred, vec![3]);
        assert!(!task.has_edge(5, 6) && !task.has_edge(6, 5));
        task.topological_sort().unwrap();
    }

    #[test]
    fn assign_wcet_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let task_params = params();
        let mut task = generate_task(&task_params, &mut rng).unwrap();
        task.assign_wcet(3.0, 5.0, &mut rng).unwrap();
        assert!(task.vertices().iter().all(|v| (3.0..=5.0).contains(&v.c)));
        assert_eq!(task.length(), None);
    }

    #[test]
    fn assign_wcet_rejects_empty_range() {
        let mut task = DagTask::default();
        task.add_vertex(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            task.assign_wcet(5.0, 3.0, &mut rng),
            Err(DagError::ConfigError(_))
        ));
    }

    #[test]
    fn uunifast_parameters_round_up() {
        let mut task = DagTask::default();
        task.add_vertex(7.0).unwrap();
        task.assign_sched_parameters_uunifast(0.5).unwrap();
        assert_eq!(task.period(), 14.0);
        assert_eq!(task.deadline(), 14.0);

        task.assign_sched_parameters_uunifast(0.3).unwrap();
        assert_eq!(task.period(), 24.0);
    }

    #[test]
    fn beta_parameters_are_feasible() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut task = generate_task(&params(), &mut rng).unwrap();
        task.assign_sched_parameters(0.1, &mut rng).unwrap();

        let length = task.length().unwrap();
        assert!(task.deadline() >= length);
        assert!(task.deadline() <= task.period());
        assert!(task.period() <= task.worst_case_workload().unwrap() / 0.1);
    }

    #[test]
    fn same_seed_same_task() {
        let params = params();
        let a = generate_task(&params, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate_task(&params, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.vertices(), b.vertices());
    }
}
