//! # Stationary Distribution
//!
//! Power iteration over a [`SparseMarkovChain`], cooperative with a host.
//!
//! [`PowerIteration`] is the host-driven form: each `step()` performs one
//! matrix-vector product and returns the max-abs change. The driver
//! [`find_stationary_distribution`] runs steps until convergence or the
//! iteration cap, handing control to a [`Scheduler`] every `yield_after_ms`
//! of wall-clock time. A scheduler that breaks cancels the run; the
//! best-so-far vector is still returned.
//!
//! With teleport probability `alpha` and seed vector `s`, one step computes
//! `pi' = (1 - alpha) * P * pi + alpha * s`. `alpha = 0` is plain `pi' = P * pi`.

use super::chain::SparseMarkovChain;
use crate::primitives::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_MAX_ITERATIONS, DEFAULT_YIELD_AFTER_MS};
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// =============================================================================
// OPTIONS AND REPORTS
// =============================================================================

/// Stopping and yielding rules for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagerankOptions {
    pub convergence_threshold: f64,
    pub max_iterations: u32,
    pub yield_after_ms: u64,
}

impl Default for PagerankOptions {
    fn default() -> Self {
        Self {
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            yield_after_ms: DEFAULT_YIELD_AFTER_MS,
        }
    }
}

/// Optional teleportation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PagerankParams {
    /// Teleport target distribution; uniform when `None`.
    pub seed: Option<Vec<f64>>,
    /// Teleport probability in `[0, 1]`.
    pub alpha: f64,
}

/// How a solver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceReport {
    pub converged: bool,
    pub cancelled: bool,
    /// Max-abs change of the final step.
    pub delta: f64,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagerankResult {
    pub pi: Vec<f64>,
    pub report: ConvergenceReport,
}

// =============================================================================
// SCHEDULING
// =============================================================================

/// Host hook called at yield points.
pub trait Scheduler {
    /// Return `Break` to cancel the run.
    fn checkpoint(&mut self, progress: &ConvergenceReport) -> ControlFlow<()>;
}

/// Never yields anything back; runs to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl Scheduler for NoYield {
    fn checkpoint(&mut self, _progress: &ConvergenceReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Shared cancel switch, observed at every yield point.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Scheduler for CancellationFlag {
    fn checkpoint(&mut self, progress: &ConvergenceReport) -> ControlFlow<()> {
        tracing::debug!(
            "power iteration: {} iterations, delta {:e}",
            progress.iterations,
            progress.delta
        );
        if self.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

// =============================================================================
// POWER ITERATION
// =============================================================================

/// Resumable power iteration state.
#[derive(Debug, Clone)]
pub struct PowerIteration<'c> {
    chain: &'c SparseMarkovChain,
    pi: Vec<f64>,
    next: Vec<f64>,
    seed: Vec<f64>,
    alpha: f64,
    iterations: u32,
}

fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        Vec::new()
    } else {
        vec![1.0 / n as f64; n]
    }
}

impl<'c> PowerIteration<'c> {
    /// Start from `initial`, which must have one entry per state.
    pub fn new(
        chain: &'c SparseMarkovChain,
        initial: Vec<f64>,
        params: &PagerankParams,
    ) -> Result<Self, CredError> {
        let n = chain.len();
        if initial.len() != n {
            return Err(CredError::Parameter(format!(
                "initial distribution has {} entries for {} states",
                initial.len(),
                n
            )));
        }
        if !(0.0..=1.0).contains(&params.alpha) {
            return Err(CredError::Parameter(format!(
                "teleport probability must be in [0, 1], got {}",
                params.alpha
            )));
        }
        let seed = match &params.seed {
            Some(seed) if seed.len() != n => {
                return Err(CredError::Parameter(format!(
                    "seed vector has {} entries for {} states",
                    seed.len(),
                    n
                )));
            }
            Some(seed) => seed.clone(),
            None => uniform(n),
        };
        Ok(Self {
            chain,
            pi: initial,
            next: vec![0.0; n],
            seed,
            alpha: params.alpha,
            iterations: 0,
        })
    }

    /// Start from the uniform distribution.
    pub fn uniform(chain: &'c SparseMarkovChain, params: &PagerankParams) -> Result<Self, CredError> {
        Self::new(chain, uniform(chain.len()), params)
    }

    /// One matrix-vector product. Returns `max_i |pi'_i - pi_i|`.
    pub fn step(&mut self) -> f64 {
        for ((out, column), seed) in self.next.iter_mut().zip(&self.chain.columns).zip(&self.seed) {
            let mut sum = 0.0;
            for (&neighbor, &weight) in column.neighbors.iter().zip(&column.weights) {
                sum += weight * self.pi.get(neighbor as usize).copied().unwrap_or_default();
            }
            *out = if self.alpha > 0.0 {
                (1.0 - self.alpha) * sum + self.alpha * seed
            } else {
                sum
            };
        }
        let delta = self
            .next
            .iter()
            .zip(&self.pi)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        std::mem::swap(&mut self.pi, &mut self.next);
        self.iterations = self.iterations.saturating_add(1);
        delta
    }

    #[must_use]
    pub fn distribution(&self) -> &[f64] {
        &self.pi
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[must_use]
    pub fn into_distribution(self) -> Vec<f64> {
        self.pi
    }
}

/// Run power iteration from the uniform distribution until the change drops
/// to `convergence_threshold` or `max_iterations` is reached.
///
/// Non-convergence and cancellation are reported, never raised.
pub fn find_stationary_distribution(
    chain: &SparseMarkovChain,
    params: &PagerankParams,
    options: &PagerankOptions,
    scheduler: &mut impl Scheduler,
) -> Result<PagerankResult, CredError> {
    let mut iteration = PowerIteration::uniform(chain, params)?;
    let yield_after = Duration::from_millis(options.yield_after_ms);
    let mut last_yield = Instant::now();
    let mut report = ConvergenceReport {
        converged: false,
        cancelled: false,
        delta: f64::INFINITY,
        iterations: 0,
    };

    while iteration.iterations() < options.max_iterations {
        report.delta = iteration.step();
        report.iterations = iteration.iterations();
        if report.delta <= options.convergence_threshold {
            report.converged = true;
            break;
        }
        if last_yield.elapsed() >= yield_after {
            if scheduler.checkpoint(&report).is_break() {
                report.cancelled = true;
                break;
            }
            last_yield = Instant::now();
        }
    }

    if report.converged {
        tracing::info!(
            "power iteration converged after {} iterations (delta {:e})",
            report.iterations,
            report.delta
        );
    } else {
        tracing::warn!(
            "power iteration stopped without converging after {} iterations (delta {:e}, cancelled: {})",
            report.iterations,
            report.delta,
            report.cancelled
        );
    }
    Ok(PagerankResult {
        pi: iteration.into_distribution(),
        report,
    })
}
