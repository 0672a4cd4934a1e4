// src/dag/report.rs

//! Human-readable dump of a [`DagTask`].

use std::fmt;

use crate::dag::task::DagTask;

const RULE: &str = "----------------------------------------------------";

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn join_ids(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for DagTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "deadline : {}", self.deadline())?;
        writeln!(f, "period : {}", self.period())?;
        writeln!(f, "length : {}", fmt_opt(self.length()))?;
        writeln!(f, "volume : {}", fmt_opt(self.volume()))?;
        writeln!(f, "wcw : {}", fmt_opt(self.worst_case_workload()))?;
        writeln!(f, "utilization : {}", fmt_opt(self.utilization()))?;
        writeln!(f, "density : {}", fmt_opt(self.density()))?;

        writeln!(f, "vertices :")?;
        for v in self.vertices() {
            writeln!(
                f,
                "\t v_{} - c: {} \tsucc: {} \tprec: {} \tcore: {} \tlocal O: {} \tlocal D: {}",
                v.id,
                v.c,
                join_ids(&v.succ),
                join_ids(&v.pred),
                v.core,
                fmt_opt(v.local_o),
                fmt_opt(v.local_d),
            )?;
        }

        if !self.topological_order().is_empty() {
            writeln!(f, "Topological order: {}", join_ids(self.topological_order()))?;
        }

        writeln!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_vertices_and_order() {
        let mut task = DagTask::new(9.0, 9.0);
        task.add_vertex(2.0).unwrap();
        task.add_vertex(3.0).unwrap();
        task.add_edge(0, 1).unwrap();
        task.analyze().unwrap();

        let out = task.to_string();
        assert!(out.contains("deadline : 9"));
        assert!(out.contains("length : 5"));
        assert!(out.contains("v_0 - c: 2"));
        assert!(out.contains("Topological order: 0 1"));
    }
}
