#![allow(dead_code)]

use dagsched::config::GeneratorParams;
use dagsched::dag::{DagTask, SubTaskMode};
use dagsched::types::{DagType, DeadlineType};

/// Builder for `DagTask` to simplify test setup.
///
/// Vertices get dense ids in insertion order; edges are checked by
/// `DagTask::add_edge` and panic on misuse.
pub struct DagTaskBuilder {
    task: DagTask,
}

impl DagTaskBuilder {
    pub fn new(period: f64, deadline: f64) -> Self {
        Self {
            task: DagTask::new(period, deadline),
        }
    }

    /// Append vertices with the given WCETs.
    pub fn vertices(mut self, costs: &[f64]) -> Self {
        for &c in costs {
            self.task
                .add_vertex(c)
                .expect("builder WCET should be non-negative");
        }
        self
    }

    pub fn edge(mut self, from: usize, to: usize) -> Self {
        self.task
            .add_edge(from, to)
            .expect("builder edge should be valid");
        self
    }

    pub fn edges(mut self, edges: &[(usize, usize)]) -> Self {
        for &(from, to) in edges {
            self = self.edge(from, to);
        }
        self
    }

    pub fn mode(mut self, id: usize, mode: SubTaskMode) -> Self {
        self.task
            .set_mode(id, mode)
            .expect("builder vertex should exist");
        self
    }

    /// Chain `costs[0] -> costs[1] -> ...` appended after the existing vertices.
    pub fn chain(mut self, costs: &[f64]) -> Self {
        let first = self.task.len();
        self = self.vertices(costs);
        for i in 1..costs.len() {
            self = self.edge(first + i - 1, first + i);
        }
        self
    }

    /// `source -> {branches...} -> sink` with `source` a conditional fork.
    ///
    /// Vertex 0 is the source, 1..=n the branches, n + 1 the sink.
    pub fn conditional_fork(source: f64, branches: &[f64], sink: f64, deadline: f64) -> Self {
        let n = branches.len();
        let mut b = Self::new(deadline, deadline).vertices(&[source]).vertices(branches);
        b = b.vertices(&[sink]);
        for i in 1..=n {
            b = b.edge(0, i).edge(i, n + 1);
        }
        b = b.mode(0, SubTaskMode::CondSource).mode(n + 1, SubTaskMode::CondSink);
        for i in 1..=n {
            b = b.mode(i, SubTaskMode::CondInternal);
        }
        b
    }

    pub fn build(self) -> DagTask {
        self.task
    }
}

/// Builder for `GeneratorParams`.
pub struct ParamsBuilder {
    params: GeneratorParams,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: GeneratorParams::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    pub fn rec_depth(mut self, depth: u32) -> Self {
        self.params.rec_depth = depth;
        self
    }

    pub fn weights(mut self, p_cond: f64, p_par: f64, p_term: f64) -> Self {
        self.params.p_cond = p_cond;
        self.params.p_par = p_par;
        self.params.p_term = p_term;
        self
    }

    pub fn branches(mut self, max_cond: u32, max_par: u32) -> Self {
        self.params.max_cond_branches = max_cond;
        self.params.max_par_branches = max_par;
        self
    }

    pub fn add_prob(mut self, prob: f64) -> Self {
        self.params.add_prob = prob;
        self
    }

    pub fn prob_s_cond(mut self, prob: f64) -> Self {
        self.params.prob_s_cond = prob;
        self
    }

    pub fn wcet(mut self, c_min: f64, c_max: f64) -> Self {
        self.params.c_min = c_min;
        self.params.c_max = c_max;
        self
    }

    pub fn dag_type(mut self, dag_type: DagType) -> Self {
        self.params.dag_type = dag_type;
        self
    }

    pub fn deadline_type(mut self, deadline_type: DeadlineType) -> Self {
        self.params.deadline_type = deadline_type;
        self
    }

    pub fn n_tasks(mut self, n: u32) -> Self {
        self.params.n_tasks = n;
        self
    }

    /// Validate and derive dependent values, as the CLI does.
    pub fn build(self) -> GeneratorParams {
        let mut params = self.params;
        dagsched::config::validate_params(&params)
            .expect("Failed to build valid params from builder");
        params.configure();
        params
    }

    /// Return the parameters as set, without validation or derivation.
    pub fn build_raw(self) -> GeneratorParams {
        self.params
    }
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
