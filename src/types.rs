use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which parameter a batch of generated task sets sweeps over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationType {
    /// Vary the number of tasks between `n_min` and `n_max`.
    #[default]
    VaryingN,
    /// Vary the total utilization between `u_min` and `u_max`.
    VaryingU,
    /// Vary the number of processors between `m_min` and `m_max`.
    VaryingM,
}

/// Relation between relative deadline and period of generated tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    /// `L <= d <= t`.
    #[default]
    Constrained,
    /// `d == t`.
    Implicit,
    /// `d` may exceed `t`.
    Arbitrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingType {
    #[default]
    Global,
    Partitioned,
    Federated,
    Sota,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    /// Fixed task priority.
    #[default]
    Ftp,
    /// Earliest deadline first.
    Edf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadType {
    SingleDag,
    #[default]
    Taskset,
}

/// Flavour of DAG produced by the generator.
///
/// - `Dag`: plain parallel DAG, conditional probabilities are forced to zero.
/// - `Cdag`: conditional DAG.
/// - `Tdag`: typed DAG, every vertex gets a processor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DagType {
    #[default]
    Dag,
    Cdag,
    Tdag,
}

impl FromStr for DagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dag" => Ok(DagType::Dag),
            "cdag" => Ok(DagType::Cdag),
            "tdag" => Ok(DagType::Tdag),
            other => Err(format!(
                "invalid dag_type: {other} (expected \"dag\", \"cdag\" or \"tdag\")"
            )),
        }
    }
}

impl FromStr for DeadlineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constrained" => Ok(DeadlineType::Constrained),
            "implicit" => Ok(DeadlineType::Implicit),
            "arbitrary" => Ok(DeadlineType::Arbitrary),
            other => Err(format!(
                "invalid deadline_type: {other} (expected \"constrained\", \"implicit\" or \"arbitrary\")"
            )),
        }
    }
}
