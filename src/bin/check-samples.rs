// SPDX-License-Identifier: Apache-2.0

//! Standalone checker: re-validates a previously written result matrix
//! against the constraint file it was generated from. Exits nonzero if any
//! vector fails.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use hyperwalk::constraints::load_problem;
use hyperwalk::matrix_io::read_matrix;
use hyperwalk::validate::validate;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Matrix file to check, one point per row.
    matrix_file: PathBuf,

    /// Constraint file the matrix was generated from.
    constraint_file: PathBuf,
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();
    let args = Args::parse();

    let problem = load_problem(&args.constraint_file)
        .with_context(|| format!("loading constraints from {}", args.constraint_file.display()))?;
    let points = read_matrix(&args.matrix_file)
        .with_context(|| format!("reading matrix from {}", args.matrix_file.display()))?;

    println!(
        "Checking {} vector(s) from {} against constraints from {}.",
        points.len(),
        args.matrix_file.display(),
        args.constraint_file.display()
    );

    let report = validate(&points, &problem.constraints);
    if report.passed() {
        println!("All vectors are within the unit hypercube and obey constraints.");
        Ok(())
    } else {
        println!(
            "Check failed. Failure at entries: {:?}",
            report.failed_indices
        );
        std::process::exit(1);
    }
}
