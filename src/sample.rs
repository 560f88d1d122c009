// SPDX-License-Identifier: Apache-2.0

//! The adaptive random-walk sampler: proposal, step-scale control and the
//! generation loop.
//!
//! Points are generated one at a time by perturbing the last accepted point
//! (the seed, for the first point). Consecutive rejections shrink the
//! perturbation scale geometrically, trading exploration breadth for a
//! higher acceptance probability; acceptances reset the scale per the
//! configured [`ResetMode`]. A walk whose failure counter reaches the
//! configured `steps` bound is abandoned and retried from the same anchor,
//! and generation as a whole fails once `stall_limit` consecutive walks
//! abandon with no acceptance in between.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use rand::Rng;
use serde::Serialize;

use crate::constraints::{ConstraintSet, Problem};

/// Step scale a fresh walk starts from, in hypercube units.
pub const DEFAULT_BASE_SCALE: f64 = 1.0;

const PROGRESS_PRINT_POINT_INTERVAL: usize = 1000;
const PROGRESS_PRINT_TIME_INTERVAL_SECS: u64 = 10;

/// Step-length reset policy applied when a proposal is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResetMode {
    /// Full reset: the failure counter returns to zero and the scale to the
    /// base value. Slower point generation, less correlated samples.
    Zero,
    /// Partial reset: the failure counter drops by one and the scale is
    /// recomputed from it. Significantly faster, but the walk stays narrow
    /// once it has narrowed, so samples are more spatially correlated.
    Decrement,
}

/// Immutable sampler configuration. Validated before sampling begins.
#[derive(Clone, Copy, Debug)]
pub struct SamplerConfig {
    /// Number of points to generate.
    pub n_results: usize,
    /// Multiplicative step-scale decay per consecutive failure, in (0, 1).
    pub decay: f64,
    /// Failure budget per walk: the walk is abandoned when the failure
    /// counter reaches this bound without an acceptance.
    pub steps: u32,
    pub reset: ResetMode,
    pub base_scale: f64,
    /// Consecutive abandoned walks tolerated before generation fails.
    pub stall_limit: usize,
}

impl SamplerConfig {
    /// Configuration with the stock knob settings for `n_results` points.
    pub fn new(n_results: usize) -> Self {
        Self {
            n_results,
            decay: 0.99,
            steps: 20,
            reset: ResetMode::Zero,
            base_scale: DEFAULT_BASE_SCALE,
            stall_limit: 1000,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_results == 0 {
            return Err(ConfigError::NResultsZero);
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(ConfigError::DecayOutOfRange(self.decay));
        }
        if self.steps == 0 {
            return Err(ConfigError::StepsZero);
        }
        if !(self.base_scale.is_finite() && self.base_scale > 0.0) {
            return Err(ConfigError::BadBaseScale(self.base_scale));
        }
        if self.stall_limit == 0 {
            return Err(ConfigError::StallLimitZero);
        }
        Ok(())
    }
}

/// Errors from [`SamplerConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    NResultsZero,
    DecayOutOfRange(f64),
    StepsZero,
    BadBaseScale(f64),
    StallLimitZero,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NResultsZero => write!(f, "n_results must be positive"),
            ConfigError::DecayOutOfRange(value) => {
                write!(f, "decay must lie in the open interval (0, 1); got {}", value)
            }
            ConfigError::StepsZero => write!(f, "steps must be positive"),
            ConfigError::BadBaseScale(value) => {
                write!(f, "base_scale must be positive and finite; got {}", value)
            }
            ConfigError::StallLimitZero => write!(f, "stall_limit must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// What happened to a single proposed candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalOutcome {
    Accepted(Vec<f64>),
    /// A coordinate left the unit hypercube; the constraints were never
    /// evaluated.
    OutOfBounds,
    /// In bounds, but the constraint set rejected the candidate.
    Infeasible,
}

/// Proposes one candidate by perturbing each coordinate of `current` with an
/// independent uniform draw on `[-scale, +scale]`, then screens it: the
/// hypercube bound first (constraints are never evaluated out of domain),
/// the constraint set second. Neither `current` nor `scale` is mutated.
pub fn propose(
    rng: &mut impl Rng,
    current: &[f64],
    scale: f64,
    constraints: &ConstraintSet,
) -> ProposalOutcome {
    let mut candidate = Vec::with_capacity(current.len());
    for &coord in current {
        candidate.push(coord + rng.gen_range(-scale..=scale));
    }
    if candidate.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return ProposalOutcome::OutOfBounds;
    }
    if constraints.apply(&candidate) {
        ProposalOutcome::Accepted(candidate)
    } else {
        ProposalOutcome::Infeasible
    }
}

/// Step-scale and failure-count state of the walk.
///
/// The state persists across accepted points; that is what makes the two
/// reset modes observably different. `Zero` restores the base scale on
/// every acceptance regardless of history, while `Decrement` keeps most of
/// the accumulated decay, so a walk that has narrowed into feasible
/// territory stays narrow and keeps accepting quickly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WalkState {
    scale: f64,
    failures: u32,
}

impl WalkState {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            scale: config.base_scale,
            failures: 0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// True once the failure counter has used up the per-walk budget.
    pub fn exhausted(&self, config: &SamplerConfig) -> bool {
        self.failures >= config.steps
    }

    pub fn on_rejection(&mut self, config: &SamplerConfig) {
        self.failures += 1;
        self.recompute_scale(config);
    }

    pub fn on_acceptance(&mut self, config: &SamplerConfig) {
        match config.reset {
            ResetMode::Zero => {
                self.failures = 0;
                self.scale = config.base_scale;
            }
            ResetMode::Decrement => {
                self.failures = self.failures.saturating_sub(1);
                self.recompute_scale(config);
            }
        }
    }

    /// Fresh walk from the same anchor, used after an abandonment.
    pub fn reset(&mut self, config: &SamplerConfig) {
        self.failures = 0;
        self.scale = config.base_scale;
    }

    fn recompute_scale(&mut self, config: &SamplerConfig) {
        let exponent = i32::try_from(self.failures).unwrap_or(i32::MAX);
        self.scale = config.base_scale * config.decay.powi(exponent);
    }
}

/// Counters collected over a sampling run.
#[derive(Debug, Default, Serialize)]
pub struct SampleStats {
    pub proposals: usize,
    pub accepted: usize,
    pub rejected_out_of_bounds: usize,
    pub rejected_infeasible: usize,
    pub walks_abandoned: usize,
    /// Wall time spent strictly inside the sampling loop.
    pub sampling_time_micros: u128,
}

/// A completed generation run: points in acceptance order, plus counters.
#[derive(Debug)]
pub struct SampleRun {
    pub points: Vec<Vec<f64>>,
    pub stats: SampleStats,
}

/// Errors that terminate a sampling run before it produces a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    Config(ConfigError),
    SeedArityMismatch { expected: usize, actual: usize },
    SeedOutOfBounds { index: usize, value: f64 },
    SeedInfeasible,
    /// `stall_limit` consecutive walks abandoned with no acceptance in
    /// between; the feasible region may be unreachable at the configured
    /// step budget.
    ProgressStall { walks_abandoned: usize },
    /// The cancellation token was cleared.
    Interrupted,
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::Config(e) => write!(f, "invalid sampler configuration: {}", e),
            SampleError::SeedArityMismatch { expected, actual } => {
                write!(f, "seed point has {} coordinate(s), expected {}", actual, expected)
            }
            SampleError::SeedOutOfBounds { index, value } => {
                write!(
                    f,
                    "seed coordinate x{} = {} lies outside the unit hypercube",
                    index, value
                )
            }
            SampleError::SeedInfeasible => {
                write!(f, "seed point does not satisfy the declared constraints")
            }
            SampleError::ProgressStall { walks_abandoned } => {
                write!(
                    f,
                    "{} consecutive walks abandoned with no acceptance; giving up",
                    walks_abandoned
                )
            }
            SampleError::Interrupted => write!(f, "sampling was interrupted"),
        }
    }
}

impl std::error::Error for SampleError {}

/// Generates exactly `config.n_results` points satisfying the problem's
/// bounds and constraints, walking from the declared seed.
///
/// The RNG is owned by the caller, so seeded runs are reproducible. The
/// `running` token is checked once per walk; clearing it makes the run fail
/// with [`SampleError::Interrupted`] instead of returning a short result
/// set.
pub fn sample(
    config: &SamplerConfig,
    problem: &Problem,
    rng: &mut impl Rng,
    running: &AtomicBool,
) -> Result<SampleRun, SampleError> {
    config.validate().map_err(SampleError::Config)?;
    check_seed(problem)?;

    let mut points: Vec<Vec<f64>> = Vec::with_capacity(config.n_results);
    let mut stats = SampleStats::default();
    let mut current = problem.seed.clone();
    let mut walk = WalkState::new(config);
    let mut stalled_walks = 0usize;

    let start_time = Instant::now();
    let mut last_print_time = Instant::now();
    let mut last_print_points = 0usize;

    'points: while points.len() < config.n_results {
        if !running.load(Ordering::SeqCst) {
            return Err(SampleError::Interrupted);
        }

        if points.len() - last_print_points >= PROGRESS_PRINT_POINT_INTERVAL
            || last_print_time.elapsed() > Duration::from_secs(PROGRESS_PRINT_TIME_INTERVAL_SECS)
        {
            let elapsed_secs = start_time.elapsed().as_secs_f64();
            let points_per_sec = if elapsed_secs > 0.0 {
                points.len() as f64 / elapsed_secs
            } else {
                0.0
            };
            println!(
                "[sample] points: {}/{} | Proposals: {} | Rejected (bounds/constraint): {}/{} | Abandoned: {} | Scale: {:.3e} | Points/s: {:.2}",
                points.len(),
                config.n_results,
                stats.proposals,
                stats.rejected_out_of_bounds,
                stats.rejected_infeasible,
                stats.walks_abandoned,
                walk.scale(),
                points_per_sec,
            );
            let _ = std::io::stdout().flush();
            last_print_time = Instant::now();
            last_print_points = points.len();
        }

        // One walk from the current anchor.
        loop {
            if walk.exhausted(config) {
                stats.walks_abandoned += 1;
                stalled_walks += 1;
                if stalled_walks >= config.stall_limit {
                    return Err(SampleError::ProgressStall {
                        walks_abandoned: stalled_walks,
                    });
                }
                log::debug!(
                    "walk abandoned after {} failures; retrying from the current anchor",
                    walk.failures()
                );
                walk.reset(config);
                continue 'points;
            }
            stats.proposals += 1;
            match propose(rng, &current, walk.scale(), &problem.constraints) {
                ProposalOutcome::Accepted(candidate) => {
                    walk.on_acceptance(config);
                    stats.accepted += 1;
                    stalled_walks = 0;
                    log::trace!(
                        "accepted point {} after {} proposals total",
                        points.len(),
                        stats.proposals
                    );
                    current = candidate.clone();
                    points.push(candidate);
                    break;
                }
                ProposalOutcome::OutOfBounds => {
                    stats.rejected_out_of_bounds += 1;
                    walk.on_rejection(config);
                }
                ProposalOutcome::Infeasible => {
                    stats.rejected_infeasible += 1;
                    walk.on_rejection(config);
                }
            }
        }
    }

    stats.sampling_time_micros = start_time.elapsed().as_micros();
    Ok(SampleRun { points, stats })
}

fn check_seed(problem: &Problem) -> Result<(), SampleError> {
    if problem.seed.len() != problem.dims {
        return Err(SampleError::SeedArityMismatch {
            expected: problem.dims,
            actual: problem.seed.len(),
        });
    }
    for (index, &value) in problem.seed.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(SampleError::SeedOutOfBounds { index, value });
        }
    }
    if !problem.constraints.apply(&problem.seed) {
        return Err(SampleError::SeedInfeasible);
    }
    Ok(())
}
