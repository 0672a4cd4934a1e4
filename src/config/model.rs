// src/config/model.rs

use serde::{Deserialize, Serialize};

use crate::types::{
    AlgorithmType, DagType, DeadlineType, GenerationType, SchedulingType, WorkloadType,
};

/// Parameters of the random DAG generator, as read from a flat TOML file.
///
/// Every key is optional:
///
/// ```toml
/// max_cond_branches = 3
/// max_par_branches = 4
/// rec_depth = 3
/// p_cond = 0.2
/// p_par = 0.3
/// p_term = 0.5
/// dag_type = "cdag"
/// seed = 42
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorParams {
    /// Maximum number of branches of a conditional fork.
    pub max_cond_branches: u32,
    /// Maximum number of branches of a parallel fork.
    pub max_par_branches: u32,
    /// Maximum recursion depth of the series-parallel expansion.
    pub rec_depth: u32,

    /// Weight of opening a nested conditional fork on a branch.
    pub p_cond: f64,
    /// Weight of opening a nested parallel fork on a branch.
    pub p_par: f64,
    /// Weight of closing a branch with a single vertex.
    pub p_term: f64,

    /// Minimum sub-task WCET.
    pub c_min: f64,
    /// Maximum sub-task WCET.
    pub c_max: f64,

    /// Probability of adding an extra edge between two eligible vertices.
    pub add_prob: f64,
    /// Probability that the outermost fork is conditional.
    pub prob_s_cond: f64,
    /// Total utilization of a generated task set.
    pub u_tot: f64,
    pub beta: f64,

    pub save_rate: u32,

    pub u_min: f64,
    pub u_max: f64,
    pub step_u: f64,
    /// Number of processors.
    pub m: u32,

    pub n_min: u32,
    pub n_max: u32,
    pub n_tasks: u32,
    pub step_n: u32,

    pub m_min: u32,
    pub m_max: u32,
    pub step_m: u32,

    pub taskset_per_var_factor: u32,
    pub n_tasksets: u32,

    /// Number of distinct processor types (typed DAGs).
    pub diff_proc_types: u32,
    pub min_proc_per_type: u32,
    pub max_proc_per_type: u32,

    pub gen_type: GenerationType,
    pub deadline_type: DeadlineType,
    pub sched_type: SchedulingType,
    pub algorithm: AlgorithmType,
    pub workload: WorkloadType,
    pub dag_type: DagType,

    /// Seed of the generator's random source; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            max_cond_branches: 2,
            max_par_branches: 6,
            rec_depth: 2,
            p_cond: 0.0,
            p_par: 0.2,
            p_term: 0.8,
            c_min: 1.0,
            c_max: 100.0,
            add_prob: 0.1,
            prob_s_cond: 0.5,
            u_tot: 1.0,
            beta: 0.1,
            save_rate: 25,
            u_min: 0.0,
            u_max: 8.0,
            step_u: 0.25,
            m: 8,
            n_min: 11,
            n_max: 20,
            n_tasks: 0,
            step_n: 1,
            m_min: 2,
            m_max: 30,
            step_m: 1,
            taskset_per_var_factor: 1,
            n_tasksets: 1,
            diff_proc_types: 1,
            min_proc_per_type: 1,
            max_proc_per_type: 1,
            gen_type: GenerationType::default(),
            deadline_type: DeadlineType::default(),
            sched_type: SchedulingType::default(),
            algorithm: AlgorithmType::default(),
            workload: WorkloadType::default(),
            dag_type: DagType::default(),
            seed: None,
        }
    }
}

impl GeneratorParams {
    /// Weights of the per-branch creation states, in
    /// `[conditional, parallel, terminal]` order.
    pub fn creation_weights(&self) -> [f64; 3] {
        [self.p_cond, self.p_par, self.p_term]
    }

    /// Larger of the two branch bounds; drives the layout spacing.
    pub fn max_branches(&self) -> u32 {
        self.max_cond_branches.max(self.max_par_branches)
    }
}
