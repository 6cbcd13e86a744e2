//! # Credrank Driver
//!
//! Command-line driver around `credrank-core`: loads weighted graphs and
//! their sidecar files, runs the scoring pipeline and writes results.

pub mod cli;
pub mod config;
