// src/dag/subtask.rs

//! The vertex type of a DAG task and its local timing recurrences.

use serde::{Deserialize, Serialize};

use crate::errors::{DagError, Result};

/// Structural role of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskMode {
    #[default]
    Normal,
    /// Lies strictly between a conditional source and its matching sink.
    CondInternal,
    /// Branch point: exactly one outgoing branch executes at run time.
    CondSource,
    /// Join point of the branches opened by a conditional source.
    CondSink,
}

/// A single sub-job of a DAG task.
///
/// `pred` and `succ` hold indices into the owning [`DagTask`](crate::dag::DagTask)
/// vertex arena. Timing fields are `None` until the analyzer fills them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubTask {
    pub id: usize,
    /// Generation-time layout coordinate.
    pub depth: i32,
    /// Generation-time layout coordinate.
    pub width: f64,
    /// Processor type.
    pub gamma: u32,
    /// Assigned core.
    pub core: u32,
    pub prio: u32,

    /// Worst-case execution time.
    pub c: f64,
    pub acc_work: Option<f64>,
    /// Response time of the sub-job.
    pub r: f64,
    pub local_o: Option<f64>,
    pub local_d: Option<f64>,
    pub eft: Option<f64>,
    pub lst: Option<f64>,

    pub mode: SubTaskMode,

    pub succ: Vec<usize>,
    pub pred: Vec<usize>,
}

impl SubTask {
    pub fn new(id: usize, c: f64) -> Self {
        Self {
            id,
            c,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: SubTaskMode) -> Self {
        self.mode = mode;
        self
    }

    /// Ids of the direct predecessors that are conditional sources.
    pub fn cond_pred(&self, vertices: &[SubTask]) -> Vec<usize> {
        self.pred
            .iter()
            .copied()
            .filter(|&p| vertices[p].mode == SubTaskMode::CondSource)
            .collect()
    }

    /// Earliest start relative to activation: 0 for a vertex without
    /// predecessors, otherwise the latest finish among the predecessors.
    ///
    /// Every predecessor must already carry a local offset.
    pub fn local_offset(&self, vertices: &[SubTask]) -> Result<f64> {
        let mut offset: f64 = 0.0;
        for &p in &self.pred {
            let pred = &vertices[p];
            let pred_o = pred.local_o.ok_or(DagError::UnsetField {
                field: "local_o",
                vertex: pred.id,
            })?;
            offset = offset.max(pred_o + pred.c);
        }
        Ok(offset)
    }

    /// Latest finish relative to activation: the task deadline for a vertex
    /// without successors, otherwise the earliest latest-start among the
    /// successors.
    ///
    /// Every successor must already carry a local deadline.
    pub fn local_deadline(&self, vertices: &[SubTask], task_deadline: f64) -> Result<f64> {
        if self.succ.is_empty() {
            return Ok(task_deadline);
        }

        let mut deadline = f64::INFINITY;
        for &s in &self.succ {
            let succ = &vertices[s];
            let succ_d = succ.local_d.ok_or(DagError::UnsetField {
                field: "local_d",
                vertex: succ.id,
            })?;
            deadline = deadline.min(succ_d - succ.c);
        }
        Ok(deadline)
    }

    pub fn earliest_finishing_time(&self) -> Result<f64> {
        let local_o = self.local_o.ok_or(DagError::UnsetField {
            field: "local_o",
            vertex: self.id,
        })?;
        Ok(local_o + self.c)
    }

    pub fn latest_starting_time(&self) -> Result<f64> {
        let local_d = self.local_d.ok_or(DagError::UnsetField {
            field: "local_d",
            vertex: self.id,
        })?;
        Ok(local_d - self.c)
    }

    /// Clear every derived timing field.
    pub fn reset_timing(&mut self) {
        self.acc_work = None;
        self.local_o = None;
        self.local_d = None;
        self.eft = None;
        self.lst = None;
    }

    pub fn is_source(&self) -> bool {
        self.pred.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.succ.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Vec<SubTask> {
        let mut a = SubTask::new(0, 2.0);
        let mut b = SubTask::new(1, 3.0);
        a.succ.push(1);
        b.pred.push(0);
        vec![a, b]
    }

    #[test]
    fn offset_of_vertex_without_predecessors_is_zero() {
        let v = pair();
        assert_eq!(v[0].local_offset(&v).unwrap(), 0.0);
    }

    #[test]
    fn offset_requires_predecessor_offsets() {
        let v = pair();
        match v[1].local_offset(&v) {
            Err(DagError::UnsetField { field, vertex }) => {
                assert_eq!(field, "local_o");
                assert_eq!(vertex, 0);
            }
            other => panic!("expected UnsetField, got {other:?}"),
        }
    }

    #[test]
    fn deadline_of_sink_is_task_deadline() {
        let mut v = pair();
        v[1].local_d = Some(v[1].local_deadline(&v, 10.0).unwrap());
        assert_eq!(v[1].local_d, Some(10.0));
        assert_eq!(v[0].local_deadline(&v, 10.0).unwrap(), 7.0);
    }

    #[test]
    fn eft_and_lst_fail_when_prerequisite_missing() {
        let v = SubTask::new(3, 1.0);
        assert!(matches!(
            v.earliest_finishing_time(),
            Err(DagError::UnsetField { field: "local_o", vertex: 3 })
        ));
        assert!(matches!(
            v.latest_starting_time(),
            Err(DagError::UnsetField { field: "local_d", vertex: 3 })
        ));
    }

    #[test]
    fn cond_pred_lists_only_conditional_sources() {
        let mut v = vec![
            SubTask::new(0, 1.0).with_mode(SubTaskMode::CondSource),
            SubTask::new(1, 1.0),
            SubTask::new(2, 1.0),
        ];
        v[2].pred = vec![0, 1];
        assert_eq!(v[2].cond_pred(&v), vec![0]);
    }
}
