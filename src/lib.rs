// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod generator;
pub mod io;
pub mod logging;
pub mod taskset;
pub mod types;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{AnalyzeArgs, CliArgs, Command, GenerateArgs};
use crate::config::loader::default_params_path;
use crate::config::{GeneratorParams, load_from_path, validate_params};
use crate::generator::rng_from_params;
use crate::taskset::TaskSet;

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Generate(gen_args) => run_generate(&gen_args),
        Command::Analyze(analyze_args) => run_analyze(&analyze_args),
    }
}

/// Resolve generator parameters: file (explicit or default), CLI overrides,
/// then validation and derived values.
pub fn resolve_params(args: &GenerateArgs) -> Result<GeneratorParams> {
    let mut params = match &args.params {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_params_path();
            if default_path.exists() {
                load_from_path(&default_path)?
            } else {
                debug!("no parameter file, using built-in defaults");
                GeneratorParams::default()
            }
        }
    };

    if let Some(seed) = args.seed {
        params.seed = Some(seed);
    }
    if let Some(dag_type) = args.dag_type {
        params.dag_type = dag_type;
    }
    if let Some(deadline_type) = args.deadline_type {
        params.deadline_type = deadline_type;
    }

    validate_params(&params)?;
    params.configure();
    Ok(params)
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let params = resolve_params(args)?;
    let mut rng = rng_from_params(&params);

    let mut set = TaskSet::generate(&params, &mut rng)?;
    let total_u = set.total_utilization()?;

    if let Some(path) = &args.out {
        if let Some(first) = set.tasks().first() {
            io::save_as_dot(first, path)?;
        }
    }
    if let Some(path) = &args.json {
        io::write_task_set(set.tasks(), path)?;
    }

    if args.print {
        for task in set.tasks() {
            print!("{task}");
        }
    }

    println!(
        "generated {} task(s), total utilization {:.4}",
        set.len(),
        total_u
    );
    for (i, task) in set.tasks().iter().enumerate() {
        println!(
            "  task {i}: {} vertices, L={}, vol={}, wcw={}, T={}, D={}",
            task.len(),
            task.length().unwrap_or(0.0),
            task.volume().unwrap_or(0.0),
            task.worst_case_workload().unwrap_or(0.0),
            task.period(),
            task.deadline()
        );
    }

    info!(tasks = set.len(), total_u, "generation complete");
    Ok(())
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let tasks = analyze_file(&args.file)?;

    for task in &tasks {
        print!("{task}");
        if args.paths {
            for path in task.compute_all_paths() {
                let ids: Vec<String> = path.iter().map(|id| id.to_string()).collect();
                println!("path: {}", ids.join(" -> "));
            }
        }
    }
    Ok(())
}

/// Load every task stored in `path` and run the full analysis on each.
pub fn analyze_file(path: &Path) -> Result<Vec<dag::DagTask>> {
    let mut tasks = io::read_tasks(path)?;
    for task in tasks.iter_mut() {
        task.analyze()?;
    }
    info!(path = %path.display(), tasks = tasks.len(), "analysis complete");
    Ok(tasks)
}
