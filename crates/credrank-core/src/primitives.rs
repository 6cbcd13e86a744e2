//! # Engine Primitives
//!
//! Hardcoded runtime constants for the credrank engine.
//!
//! These values are compiled into the binary. Tunable parameters live in
//! [`crate::params::CredParams`]; the constants here are their defaults and
//! the fixed limits the engine enforces regardless of configuration.

/// Length of one week in milliseconds.
pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Offset of the first week boundary after the Unix epoch.
///
/// 1970-01-01 was a Thursday; weeks start on Sunday 00:00 UTC, three days later.
pub const WEEK_ORIGIN_MS: i64 = 3 * 24 * 60 * 60 * 1000;

/// Default probability of radiating back to the seed from contributions and epochs.
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Default probability of an epoch paying out to its accumulator.
pub const DEFAULT_BETA: f64 = 0.4;

/// Default forward webbing probability between consecutive epochs.
pub const DEFAULT_GAMMA_FORWARD: f64 = 0.1;

/// Default backward webbing probability between consecutive epochs.
pub const DEFAULT_GAMMA_BACKWARD: f64 = 0.1;

/// Default self-loop weight added to every node of a Markov chain.
pub const DEFAULT_SYNTHETIC_LOOP_WEIGHT: f64 = 1e-3;

/// Default maximum per-entry change at which the power iteration stops.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-7;

/// Default cap on power iteration steps.
pub const DEFAULT_MAX_ITERATIONS: u32 = 255;

/// Default wall-clock period between cooperative yields.
pub const DEFAULT_YIELD_AFTER_MS: u64 = 30;

/// Tolerance for the row-stochastic self-check of a Markov process graph.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

// =============================================================================
// RESERVED ADDRESS PREFIXES
// =============================================================================

/// Leading component of every address the engine synthesizes itself.
pub const CORE_NAMESPACE: &str = "credrank";

/// Second component of Markov process graph machinery addresses.
pub const CORE_MODULE: &str = "core";

/// Second component of dependency mint addresses.
pub const DEPENDENCY_MODULE: &str = "dependency";

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Magic bytes for the binary weighted-graph snapshot.
pub const MAGIC_BYTES: &[u8; 4] = b"CRED";

/// Current binary snapshot format version.
pub const FORMAT_VERSION: u8 = 1;
