//! # Credrank CLI Module
//!
//! This module implements the CLI interface for credrank.
//!
//! ## Available Commands
//!
//! - `score` - Compute cred for a weighted graph
//! - `check` - Validate a weighted graph and report its size
//! - `intervals` - Show the scoring intervals of a graph
//! - `participants` - List the participants declared plugins find in a graph
//! - `pack` - Convert a weighted graph between JSON and binary snapshots
//! - `hash` - Compute the BLAKE3 content hash of a weighted graph
//!
//! ## Exit Codes
//!
//! Every failure maps to one code per error family (see [`exit_code`]).
//! A score run that stops before converging exits 0 with a warning unless
//! `--require-convergence` is given.

mod commands;

use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use credrank_core::{CredError, CredParams, ErrorKind};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Credrank - contribution-credit scoring
///
/// Scores a weighted contribution graph with a time-partitioned random walk
/// and reports cred per node, per edge and per participant.
#[derive(Parser, Debug)]
#[command(name = "credrank")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with a [params] table
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute cred
    Score {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON array of plugin declarations
        #[arg(short, long)]
        plugins: Option<PathBuf>,

        /// JSON budget
        #[arg(long)]
        budget: Option<PathBuf>,

        /// JSON array of dependency mint policies
        #[arg(long)]
        dependencies: Option<PathBuf>,

        /// Where to write the cred result (compat JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the cred graph (compat JSON)
        #[arg(long)]
        cred_graph: Option<PathBuf>,

        /// Fail with exit code 20 when the solver does not converge
        #[arg(long)]
        require_convergence: bool,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Validate a weighted graph
    Check {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON array of plugin declarations to validate alongside
        #[arg(short, long)]
        plugins: Option<PathBuf>,
    },

    /// Show scoring intervals
    Intervals {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List participants
    Participants {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON array of plugin declarations
        #[arg(short, long)]
        plugins: PathBuf,
    },

    /// Convert a weighted graph between formats
    Pack {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (binary, json)
        #[arg(short = 't', long, default_value = "binary")]
        format: String,
    },

    /// Compute BLAKE3 content hash of a weighted graph
    Hash {
        /// Weighted graph (compat JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Command-line overrides of the configured parameters.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Contribution radiation probability
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Epoch payout probability
    #[arg(long)]
    pub beta: Option<f64>,

    /// Webbing probability to the next epoch
    #[arg(long)]
    pub gamma_forward: Option<f64>,

    /// Webbing probability to the previous epoch
    #[arg(long)]
    pub gamma_backward: Option<f64>,

    /// Self-loop weight added to every chain row
    #[arg(long)]
    pub synthetic_loop_weight: Option<f64>,

    /// Max-abs change at which iteration stops
    #[arg(long)]
    pub convergence_threshold: Option<f64>,

    /// Iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

impl ParamArgs {
    /// Overlay the given flags onto `params`.
    #[must_use]
    pub fn apply(&self, mut params: CredParams) -> CredParams {
        let overrides = [
            (&mut params.alpha, self.alpha),
            (&mut params.beta, self.beta),
            (&mut params.gamma_forward, self.gamma_forward),
            (&mut params.gamma_backward, self.gamma_backward),
            (&mut params.synthetic_loop_weight, self.synthetic_loop_weight),
            (&mut params.convergence_threshold, self.convergence_threshold),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(max_iterations) = self.max_iterations {
            params.max_iterations = max_iterations;
        }
        params
    }
}

// =============================================================================
// OUTCOME AND EXIT CODES
// =============================================================================

/// Exit code of a score run that did not converge under `--require-convergence`.
pub const EXIT_NOT_CONVERGED: i32 = 20;

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotConverged,
}

impl Outcome {
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotConverged => EXIT_NOT_CONVERGED,
        }
    }
}

/// Process exit code for an error family.
#[must_use]
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidAddress => 10,
        ErrorKind::Conflict => 11,
        ErrorKind::Invariant => 12,
        ErrorKind::ConcurrentModification => 13,
        ErrorKind::WeightConfig => 14,
        ErrorKind::Parameter => 15,
        ErrorKind::MissingReference => 16,
        ErrorKind::Serialization => 17,
        ErrorKind::Io => 18,
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<Outcome, CredError> {
    let config = Config::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    let report = match cli.command {
        Commands::Score {
            input,
            plugins,
            budget,
            dependencies,
            output,
            cred_graph,
            require_convergence,
            params,
        } => {
            let request = ScoreRequest {
                input,
                plugins,
                budget,
                dependencies,
                output,
                cred_graph,
                params: params.apply(config.params),
            };
            let (report, converged) = cmd_score(request, json_mode).await?;
            println!("{}", report);
            if !converged {
                tracing::warn!("cred scores did not converge; results are approximate");
                if require_convergence {
                    return Ok(Outcome::NotConverged);
                }
            }
            return Ok(Outcome::Success);
        }
        Commands::Check { input, plugins } => cmd_check(&input, plugins.as_deref(), json_mode)?,
        Commands::Intervals { input } => cmd_intervals(&input, config.params, json_mode)?,
        Commands::Participants { input, plugins } => {
            cmd_participants(&input, &plugins, json_mode)?
        }
        Commands::Pack {
            input,
            output,
            format,
        } => cmd_pack(&input, &output, &format)?,
        Commands::Hash { input } => cmd_hash(&input, json_mode)?,
    };
    println!("{}", report);
    Ok(Outcome::Success)
}
