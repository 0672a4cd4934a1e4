// src/taskset.rs

//! Ordered collections of DAG tasks and their generation.

use rand::Rng;
use tracing::{debug, info};

use crate::config::GeneratorParams;
use crate::dag::{DagTask, compare_deadline, compare_period, compare_utilization};
use crate::errors::{DagError, Result};
use crate::generator::generate_task;
use crate::types::DeadlineType;

/// Split a total utilization `u_tot` into `n` random shares (UUniFast,
/// Bini and Buttazzo). The shares are unbiased and sum to `u_tot`.
pub fn uunifast<R: Rng>(n: usize, u_tot: f64, rng: &mut R) -> Vec<f64> {
    let mut shares = Vec::with_capacity(n);
    if n == 0 {
        return shares;
    }

    let mut sum = u_tot;
    for i in 1..n {
        let next = sum * rng.random::<f64>().powf(1.0 / (n - i) as f64);
        shares.push(sum - next);
        sum = next;
    }
    shares.push(sum);
    shares
}

#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<DagTask>,
}

impl TaskSet {
    pub fn new(tasks: Vec<DagTask>) -> Self {
        Self { tasks }
    }

    /// Generate a task set according to `params`.
    ///
    /// The task count is `n_tasks` when set, else `n_min`. Period and deadline
    /// of every task follow `deadline_type`: implicit deadlines share `u_tot`
    /// through [`uunifast`], constrained deadlines use the beta strategy and
    /// arbitrary deadlines may exceed the period. Every task is fully analyzed.
    pub fn generate<R: Rng>(params: &GeneratorParams, rng: &mut R) -> Result<Self> {
        let n = match params.n_tasks {
            0 => params.n_min as usize,
            n => n as usize,
        };
        if n == 0 {
            return Err(DagError::ConfigError(
                "a task set needs at least one task".to_string(),
            ));
        }

        let shares = match params.deadline_type {
            DeadlineType::Implicit => uunifast(n, params.u_tot, rng),
            _ => Vec::new(),
        };

        let mut tasks = Vec::with_capacity(n);
        for i in 0..n {
            let mut task = generate_task(params, rng)?;
            match params.deadline_type {
                DeadlineType::Implicit => {
                    let u = shares.get(i).copied().unwrap_or(params.u_tot);
                    task.assign_sched_parameters_uunifast(u.max(f64::EPSILON))?;
                }
                DeadlineType::Constrained => task.assign_sched_parameters(params.beta, rng)?,
                DeadlineType::Arbitrary => {
                    task.assign_arbitrary_sched_parameters(params.beta, rng)?
                }
            }
            task.analyze()?;
            debug!(
                task = i,
                period = task.period(),
                deadline = task.deadline(),
                "task scheduled"
            );
            tasks.push(task);
        }

        let mut set = Self { tasks };
        let utilization = set.total_utilization()?;
        info!(tasks = set.len(), utilization, "task set generated");
        Ok(set)
    }

    pub fn tasks(&self) -> &[DagTask] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [DagTask] {
        &mut self.tasks
    }

    pub fn into_tasks(self) -> Vec<DagTask> {
        self.tasks
    }

    pub fn push(&mut self, task: DagTask) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Sum of the task utilizations, computing any that are missing.
    pub fn total_utilization(&mut self) -> Result<f64> {
        let mut total = 0.0;
        for task in self.tasks.iter_mut() {
            total += match task.utilization() {
                Some(u) => u,
                None => task.compute_utilization()?,
            };
        }
        Ok(total)
    }

    pub fn sort_by_deadline(&mut self, descending: bool) {
        if descending {
            self.tasks.sort_by(|a, b| compare_deadline(b, a));
        } else {
            self.tasks.sort_by(compare_deadline);
        }
    }

    pub fn sort_by_period(&mut self, descending: bool) {
        if descending {
            self.tasks.sort_by(|a, b| compare_period(b, a));
        } else {
            self.tasks.sort_by(compare_period);
        }
    }

    pub fn sort_by_utilization(&mut self, descending: bool) {
        if descending {
            self.tasks.sort_by(|a, b| compare_utilization(b, a));
        } else {
            self.tasks.sort_by(compare_utilization);
        }
    }
}

/// Number of processors of each type for a typed platform, each drawn from
/// `[min_proc_per_type, max_proc_per_type]`.
pub fn typed_proc<R: Rng>(params: &GeneratorParams, rng: &mut R) -> Vec<u32> {
    let lo = params.min_proc_per_type;
    let hi = params.max_proc_per_type.max(lo);
    (0..params.diff_proc_types)
        .map(|_| rng.random_range(lo..=hi))
        .collect()
}
