// SPDX-License-Identifier: Apache-2.0

//! Command line driver: constraint file → adaptive random walk → result
//! matrix, with a post-generation validation pass.

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hyperwalk::constraints::load_problem;
use hyperwalk::matrix_io::{write_matrix, OutputFormat, DEFAULT_FORMAT};
use hyperwalk::sample::{sample, ResetMode, SamplerConfig, DEFAULT_BASE_SCALE};
use hyperwalk::validate::validate;

fn parse_decay(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("invalid decay {:?}", s))?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "decay must lie in the open interval (0, 1); got {}",
            value
        ))
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// Input file declaring the dimensionality, seed point and constraints.
    input_file: PathBuf,

    /// Output file to export generated points to, one point per row.
    output_file: PathBuf,

    /// Number of points to generate.
    n_results: usize,

    /// Formatting of the output, printf style: %[width][.precision](f|e|E).
    #[clap(short = 'f', long, default_value = DEFAULT_FORMAT)]
    format: String,

    /// Decay of random walk step size per failure. Higher values slow point
    /// generation but increase point spread.
    #[clap(short = 'd', long, value_parser = parse_decay, default_value_t = 0.99)]
    decay: f64,

    /// Number of random walk steps to attempt per point. Higher values speed
    /// up point generation but also cause points to be more clustered.
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..), default_value_t = 20)]
    steps: u32,

    /// Mode to reset random walk step length. 'zero' resets the step length
    /// on a success; 'decrement' decrements the failure counter by 1.
    /// 'decrement' is significantly faster, but also generates significantly
    /// more correlated samples.
    #[clap(short = 'r', long, value_enum, default_value_t = ResetMode::Zero)]
    reset: ResetMode,

    /// If enabled, keeps track of the sampling portion of runtime and
    /// reports it.
    #[clap(short = 'b', long)]
    benchmark: bool,

    /// Random seed
    #[clap(short = 'S', long, value_parser, default_value_t = 1)]
    seed: u64,

    /// Consecutive abandoned walks tolerated before the run gives up.
    #[clap(long, default_value_t = 1000)]
    stall_limit: usize,

    /// Write sampling statistics as JSON to this path.
    #[clap(long, value_parser)]
    stats_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();

    let cli = CliArgs::parse();
    log::info!("driver args: {:?}", cli);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        println!("\nCtrl+C received, attempting to shut down gracefully...");
    })
    .expect("Error setting Ctrl-C handler");

    let problem = load_problem(&cli.input_file)
        .with_context(|| format!("loading constraints from {}", cli.input_file.display()))?;

    println!(
        "Generating {} points, subject to constraints from {}, and writing the results to {}.",
        cli.n_results,
        cli.input_file.display(),
        cli.output_file.display()
    );

    let format = match cli.format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(e) => {
            log::warn!("could not parse output format {:?}: {}", cli.format, e);
            println!("Error reading format. Defaulting to standard formatting of %10.10f");
            OutputFormat::default()
        }
    };

    let config = SamplerConfig {
        n_results: cli.n_results,
        decay: cli.decay,
        steps: cli.steps,
        reset: cli.reset,
        base_scale: DEFAULT_BASE_SCALE,
        stall_limit: cli.stall_limit,
    };
    let mut rng = Pcg64Mcg::seed_from_u64(cli.seed);

    let run = sample(&config, &problem, &mut rng, &running)
        .with_context(|| format!("generating {} point(s)", cli.n_results))?;

    if cli.benchmark {
        let secs = run.stats.sampling_time_micros as f64 / 1e6;
        let points_per_sec = if secs > 0.0 {
            run.points.len() as f64 / secs
        } else {
            0.0
        };
        println!(
            "Sampling portion of runtime: {:.3} s ({} proposals, {:.2} points/s)",
            secs, run.stats.proposals, points_per_sec
        );
    }

    write_matrix(&cli.output_file, &run.points, &format)
        .with_context(|| format!("writing results to {}", cli.output_file.display()))?;
    println!(
        "Results comprised of {} vectors written to {}",
        run.points.len(),
        cli.output_file.display()
    );

    println!("Running final check on generated vectors, ensuring all are within the unit hypercube and obey constraints.");
    let report = validate(&run.points, &problem.constraints);
    if report.passed() {
        println!("Final check completed successfully. All points are within the unit hypercube and obey constraints.");
    } else {
        println!(
            "Final check failed. Failure at entries: {:?}",
            report.failed_indices
        );
    }

    if let Some(stats_path) = &cli.stats_out {
        let stats_json = serde_json::to_string_pretty(&run.stats)?;
        std::fs::write(stats_path, stats_json)
            .with_context(|| format!("writing stats to {}", stats_path.display()))?;
        println!("Sampling stats written to {}", stats_path.display());
    }

    Ok(())
}
