//! # Cred Parameters
//!
//! Every tunable of a cred computation, with defaults.

use crate::interval::IntervalLength;
use crate::markov::pagerank::PagerankOptions;
use crate::markov::process_graph::TransitionProbabilities;
use crate::primitives::{
    DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_GAMMA_BACKWARD,
    DEFAULT_GAMMA_FORWARD, DEFAULT_MAX_ITERATIONS, DEFAULT_SYNTHETIC_LOOP_WEIGHT,
    DEFAULT_YIELD_AFTER_MS,
};
use crate::CredError;
use serde::{Deserialize, Serialize};

/// Parameters of a cred computation. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredParams {
    /// Contribution radiation probability.
    pub alpha: f64,
    /// Epoch payout probability.
    pub beta: f64,
    pub gamma_forward: f64,
    pub gamma_backward: f64,
    /// Self-loop mass added to every row of the chain.
    pub synthetic_loop_weight: f64,
    pub convergence_threshold: f64,
    pub max_iterations: u32,
    pub yield_after_ms: u64,
    pub interval_length: IntervalLength,
}

impl Default for CredParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma_forward: DEFAULT_GAMMA_FORWARD,
            gamma_backward: DEFAULT_GAMMA_BACKWARD,
            synthetic_loop_weight: DEFAULT_SYNTHETIC_LOOP_WEIGHT,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            yield_after_ms: DEFAULT_YIELD_AFTER_MS,
            interval_length: IntervalLength::default(),
        }
    }
}

impl CredParams {
    pub fn validate(&self) -> Result<(), CredError> {
        self.transition_probabilities().validate()?;
        if !self.synthetic_loop_weight.is_finite() || self.synthetic_loop_weight < 0.0 {
            return Err(CredError::Parameter(format!(
                "syntheticLoopWeight must be finite and non-negative, got {}",
                self.synthetic_loop_weight
            )));
        }
        if self.convergence_threshold.is_nan() || self.convergence_threshold <= 0.0 {
            return Err(CredError::Parameter(format!(
                "convergenceThreshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn transition_probabilities(&self) -> TransitionProbabilities {
        TransitionProbabilities {
            alpha: self.alpha,
            beta: self.beta,
            gamma_forward: self.gamma_forward,
            gamma_backward: self.gamma_backward,
        }
    }

    #[must_use]
    pub fn pagerank_options(&self) -> PagerankOptions {
        PagerankOptions {
            convergence_threshold: self.convergence_threshold,
            max_iterations: self.max_iterations,
            yield_after_ms: self.yield_after_ms,
        }
    }
}
