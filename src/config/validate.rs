// src/config/validate.rs

use tracing::debug;

use crate::config::model::GeneratorParams;
use crate::errors::{DagError, Result};
use crate::types::{DagType, GenerationType, WorkloadType};

/// Check that the parameters describe a generator that can actually run.
pub fn validate_params(params: &GeneratorParams) -> Result<()> {
    validate_branches(params)?;
    validate_probabilities(params)?;
    validate_wcet(params)?;
    validate_sched(params)?;
    validate_sweeps(params)?;
    Ok(())
}

fn validate_branches(params: &GeneratorParams) -> Result<()> {
    if params.max_cond_branches < 2 {
        return Err(DagError::ConfigError(format!(
            "max_cond_branches must be >= 2 (got {})",
            params.max_cond_branches
        )));
    }
    if params.max_par_branches < 2 {
        return Err(DagError::ConfigError(format!(
            "max_par_branches must be >= 2 (got {})",
            params.max_par_branches
        )));
    }
    Ok(())
}

fn validate_probabilities(params: &GeneratorParams) -> Result<()> {
    let weights = params.creation_weights();
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(DagError::ConfigError(format!(
            "p_cond, p_par and p_term must be non-negative (got {:?})",
            weights
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(DagError::ConfigError(
            "p_cond + p_par + p_term must be > 0".to_string(),
        ));
    }

    for (name, p) in [("add_prob", params.add_prob), ("prob_s_cond", params.prob_s_cond)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(DagError::ConfigError(format!(
                "{name} must be within [0, 1] (got {p})"
            )));
        }
    }
    Ok(())
}

fn validate_wcet(params: &GeneratorParams) -> Result<()> {
    if params.c_min < 0.0 || params.c_min > params.c_max {
        return Err(DagError::ConfigError(format!(
            "WCET bounds must satisfy 0 <= c_min <= c_max (got c_min = {}, c_max = {})",
            params.c_min, params.c_max
        )));
    }
    Ok(())
}

fn validate_sched(params: &GeneratorParams) -> Result<()> {
    if params.beta <= 0.0 {
        return Err(DagError::ConfigError(format!(
            "beta must be > 0 (got {})",
            params.beta
        )));
    }
    if params.u_tot <= 0.0 {
        return Err(DagError::ConfigError(format!(
            "u_tot must be > 0 (got {})",
            params.u_tot
        )));
    }
    Ok(())
}

fn validate_sweeps(params: &GeneratorParams) -> Result<()> {
    if params.n_min > params.n_max {
        return Err(DagError::ConfigError(format!(
            "n_min must be <= n_max (got {} > {})",
            params.n_min, params.n_max
        )));
    }
    if params.m_min > params.m_max {
        return Err(DagError::ConfigError(format!(
            "m_min must be <= m_max (got {} > {})",
            params.m_min, params.m_max
        )));
    }
    if params.gen_type == GenerationType::VaryingU && params.step_u <= 0.0 {
        return Err(DagError::ConfigError(format!(
            "step_u must be > 0 when sweeping utilization (got {})",
            params.step_u
        )));
    }
    if params.min_proc_per_type > params.max_proc_per_type {
        return Err(DagError::ConfigError(format!(
            "min_proc_per_type must be <= max_proc_per_type (got {} > {})",
            params.min_proc_per_type, params.max_proc_per_type
        )));
    }
    Ok(())
}

impl GeneratorParams {
    /// Derive the values that depend on other keys.
    ///
    /// - `n_tasksets` follows the swept dimension of `gen_type`.
    /// - Only conditional DAGs keep a non-zero conditional probability.
    /// - A single-DAG workload has exactly one task.
    pub fn configure(&mut self) {
        self.n_tasksets = match self.gen_type {
            GenerationType::VaryingN => {
                self.taskset_per_var_factor * (self.n_max.saturating_sub(self.n_min) + 1)
            }
            GenerationType::VaryingU => {
                let steps = ((self.u_max - self.u_min) / self.step_u).max(0.0) as u32;
                self.taskset_per_var_factor * steps
            }
            GenerationType::VaryingM => {
                self.m_min = self.u_tot.floor() as u32;
                self.taskset_per_var_factor * (self.m_max.saturating_sub(self.m_min) + 1)
            }
        };

        if self.dag_type != DagType::Cdag {
            self.p_cond = 0.0;
            self.prob_s_cond = 0.0;
        }

        if self.workload == WorkloadType::SingleDag {
            self.n_tasks = 1;
        }

        debug!(
            n_tasksets = self.n_tasksets,
            dag_type = ?self.dag_type,
            "generator parameters configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_params(&GeneratorParams::default()).unwrap();
    }

    #[test]
    fn rejects_single_branch_forks() {
        let params = GeneratorParams {
            max_par_branches: 1,
            ..GeneratorParams::default()
        };
        match validate_params(&params) {
            Err(DagError::ConfigError(msg)) => assert!(msg.contains("max_par_branches")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_all_zero_weights() {
        let params = GeneratorParams {
            p_cond: 0.0,
            p_par: 0.0,
            p_term: 0.0,
            ..GeneratorParams::default()
        };
        assert!(matches!(
            validate_params(&params),
            Err(DagError::ConfigError(_))
        ));
    }

    #[test]
    fn configure_zeroes_conditionals_for_plain_dags() {
        let mut params = GeneratorParams {
            p_cond: 0.3,
            prob_s_cond: 0.7,
            ..GeneratorParams::default()
        };
        params.configure();
        assert_eq!(params.p_cond, 0.0);
        assert_eq!(params.prob_s_cond, 0.0);
        assert_eq!(params.n_tasksets, 10);
    }

    #[test]
    fn configure_keeps_conditionals_for_cdags() {
        let mut params = GeneratorParams {
            p_cond: 0.3,
            dag_type: DagType::Cdag,
            workload: WorkloadType::SingleDag,
            ..GeneratorParams::default()
        };
        params.configure();
        assert_eq!(params.p_cond, 0.3);
        assert_eq!(params.n_tasks, 1);
    }
}
