//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command returns the report to print; `execute` does the printing.

use credrank_core::{
    CancellationFlag, CredError, CredParams, CredrankInput, PluginDeclaration, WeightedGraph,
    WeightedGraphJson, compute_cred, content_hash, from_compat_json, graph_intervals,
    participants_from_graph,
    formats::MAX_PERSISTENCE_PAYLOAD_SIZE,
    primitives::MAGIC_BYTES,
    to_compat_json, weighted_graph_from_bytes, weighted_graph_to_bytes,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a weighted graph file (500 MB).
const MAX_GRAPH_FILE_SIZE: u64 = MAX_PERSISTENCE_PAYLOAD_SIZE as u64;

/// Maximum size of a plugin, budget or dependency file (10 MB).
const MAX_SIDECAR_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CredError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CredError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CredError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CredError> {
    let canonical = path.canonicalize().map_err(|e| {
        CredError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CredError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve `path` against its canonical parent directory, which must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, CredError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CredError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CredError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CredError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_validated(path: &Path, max_size: u64) -> Result<Vec<u8>, CredError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read(&validated)
        .map_err(|e| CredError::Io(format!("Read {}: {}", path.display(), e)))
}

fn write_validated(path: &Path, contents: &[u8]) -> Result<PathBuf, CredError> {
    let validated = validate_output_path(path)?;
    std::fs::write(&validated, contents)
        .map_err(|e| CredError::Io(format!("Write {}: {}", validated.display(), e)))?;
    Ok(validated)
}

fn pretty(value: &serde_json::Value) -> Result<String, CredError> {
    Ok(serde_json::to_string_pretty(value)?)
}

// =============================================================================
// LOADERS
// =============================================================================

/// Load a weighted graph from a binary snapshot or compat JSON.
///
/// Files starting with the snapshot magic bytes are decoded as binary.
pub fn load_weighted_graph(path: &Path) -> Result<WeightedGraph, CredError> {
    let bytes = read_validated(path, MAX_GRAPH_FILE_SIZE)?;
    if bytes.starts_with(MAGIC_BYTES) {
        tracing::debug!("decoding binary snapshot {}", path.display());
        return weighted_graph_from_bytes(&bytes);
    }
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    let json: WeightedGraphJson = from_compat_json(value)?;
    WeightedGraph::from_json(&json)
}

/// Load a plain JSON sidecar (plugin declarations, budget, dependency policies).
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CredError> {
    let bytes = read_validated(path, MAX_SIDECAR_FILE_SIZE)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn load_plugins(path: Option<&Path>) -> Result<Vec<PluginDeclaration>, CredError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let plugins: Vec<PluginDeclaration> = load_json(path)?;
    for plugin in &plugins {
        plugin.validate()?;
    }
    Ok(plugins)
}

// =============================================================================
// SCORE COMMAND
// =============================================================================

/// File arguments and resolved parameters of a score run.
#[derive(Debug, Clone, Default)]
pub struct ScoreRequest {
    pub input: PathBuf,
    pub plugins: Option<PathBuf>,
    pub budget: Option<PathBuf>,
    pub dependencies: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub cred_graph: Option<PathBuf>,
    pub params: CredParams,
}

impl ScoreRequest {
    fn load(&self) -> Result<CredrankInput, CredError> {
        let weighted_graph = load_weighted_graph(&self.input)?;
        let plugins = load_plugins(self.plugins.as_deref())?;
        let budget = self.budget.as_deref().map(load_json).transpose()?;
        let dependencies = match self.dependencies.as_deref() {
            Some(path) => load_json(path)?,
            None => Vec::new(),
        };
        Ok(CredrankInput {
            weighted_graph,
            plugins,
            budget,
            dependencies,
            params: self.params,
        })
    }
}

/// Compute cred. Returns the report and whether the solver converged.
///
/// The solver runs on the blocking pool; Ctrl+C cancels it at the next yield
/// point and the best distribution so far is still written.
pub async fn cmd_score(request: ScoreRequest, json_mode: bool) -> Result<(String, bool), CredError> {
    request.params.validate()?;
    let input = request.load()?;

    tracing::info!(
        "scoring {} with {} plugin(s)",
        request.input.display(),
        input.plugins.len()
    );

    let flag = CancellationFlag::new();
    let watcher = {
        let flag = flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after the current iteration");
                flag.cancel();
            }
        })
    };

    let mut scheduler = flag;
    let joined = tokio::task::spawn_blocking(move || compute_cred(&input, &mut scheduler)).await;
    watcher.abort();
    let output = joined.map_err(|e| CredError::Invariant(format!("scoring task failed: {}", e)))??;

    if let Some(path) = &request.output {
        let text = pretty(&to_compat_json(&output.result)?)?;
        let written = write_validated(path, text.as_bytes())?;
        tracing::info!("wrote cred result to {}", written.display());
    }
    if let Some(path) = &request.cred_graph {
        let text = pretty(&to_compat_json(&output.cred_graph.to_json())?)?;
        let written = write_validated(path, text.as_bytes())?;
        tracing::info!("wrote cred graph to {}", written.display());
    }

    let mut participants = output
        .cred_graph
        .participants()
        .collect::<Result<Vec<_>, _>>()?;
    participants.sort_by(|a, b| b.cred.total_cmp(&a.cred).then_with(|| a.address.cmp(&b.address)));
    let report = output.report;

    if json_mode {
        let rows: Vec<serde_json::Value> = participants
            .iter()
            .map(|p| {
                serde_json::json!({
                    "address": p.address.to_parts(),
                    "description": p.description,
                    "id": p.id.to_string(),
                    "cred": p.cred,
                })
            })
            .collect();
        let out = serde_json::json!({
            "converged": report.converged,
            "cancelled": report.cancelled,
            "iterations": report.iterations,
            "delta": report.delta,
            "nodes": output.cred_graph.mpg().node_count(),
            "participants": rows,
        });
        return Ok((pretty(&out)?, report.converged));
    }

    let mut out = String::new();
    out.push_str("Credrank Scores\n");
    out.push_str("===============\n");
    out.push_str(&format!(
        "Iterations: {} (delta {:e}, {})\n",
        report.iterations,
        report.delta,
        if report.converged {
            "converged"
        } else if report.cancelled {
            "cancelled"
        } else {
            "not converged"
        }
    ));
    out.push_str(&format!("Participants: {}\n", participants.len()));
    for participant in &participants {
        out.push_str(&format!(
            "  {:>12.6}  {}\n",
            participant.cred, participant.description
        ));
    }
    Ok((out.trim_end().to_string(), report.converged))
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Load and validate a weighted graph, plus optional plugin declarations.
pub fn cmd_check(input: &Path, plugins: Option<&Path>, json_mode: bool) -> Result<String, CredError> {
    let weighted = load_weighted_graph(input)?;
    weighted.graph.check_invariants()?;
    let declarations = load_plugins(plugins)?;
    let participants = participants_from_graph(&weighted.graph, &declarations);
    let dangling = weighted
        .graph
        .edges(&credrank_core::EdgesOptions::all())
        .filter(|e| weighted.graph.is_dangling_edge(&e.address) == Some(true))
        .count();

    if json_mode {
        let out = serde_json::json!({
            "valid": true,
            "nodes": weighted.graph.node_count(),
            "edges": weighted.graph.edge_count(),
            "dangling_edges": dangling,
            "plugins": declarations.len(),
            "participants": participants.len(),
        });
        return pretty(&out);
    }

    Ok(format!(
        "Graph OK\n  Nodes:          {}\n  Edges:          {}\n  Dangling Edges: {}\n  Plugins:        {}\n  Participants:   {}",
        weighted.graph.node_count(),
        weighted.graph.edge_count(),
        dangling,
        declarations.len(),
        participants.len()
    ))
}

// =============================================================================
// INTERVALS COMMAND
// =============================================================================

/// Show the intervals a graph is scored over.
pub fn cmd_intervals(input: &Path, params: CredParams, json_mode: bool) -> Result<String, CredError> {
    let weighted = load_weighted_graph(input)?;
    let intervals = graph_intervals(&weighted.graph, params.interval_length)?;

    if json_mode {
        return pretty(&serde_json::to_value(&intervals)?);
    }

    let mut out = format!("Intervals: {}\n", intervals.len());
    for (i, interval) in intervals.iter().enumerate() {
        out.push_str(&format!(
            "  {:>4}  [{}, {})\n",
            i, interval.start_time_ms, interval.end_time_ms
        ));
    }
    Ok(out.trim_end().to_string())
}

// =============================================================================
// PARTICIPANTS COMMAND
// =============================================================================

/// List the participants the declared user types find in a graph.
pub fn cmd_participants(input: &Path, plugins: &Path, json_mode: bool) -> Result<String, CredError> {
    let weighted = load_weighted_graph(input)?;
    let declarations = load_plugins(Some(plugins))?;
    let participants = participants_from_graph(&weighted.graph, &declarations);

    if json_mode {
        return pretty(&serde_json::to_value(&participants)?);
    }

    let mut out = format!("Participants: {}\n", participants.len());
    for participant in &participants {
        out.push_str(&format!("  {}  {}\n", participant.id, participant.description));
    }
    Ok(out.trim_end().to_string())
}

// =============================================================================
// PACK COMMAND
// =============================================================================

/// Re-encode a weighted graph as a binary snapshot or compat JSON.
pub fn cmd_pack(input: &Path, output: &Path, format: &str) -> Result<String, CredError> {
    let weighted = load_weighted_graph(input)?;
    let bytes = match format {
        "binary" => weighted_graph_to_bytes(&weighted)?,
        "json" => pretty(&to_compat_json(&weighted.to_json())?)?.into_bytes(),
        _ => {
            return Err(CredError::Parameter(format!(
                "Unknown format: {} (expected binary or json)",
                format
            )));
        }
    };
    let written = write_validated(output, &bytes)?;
    Ok(format!(
        "Packed {} nodes, {} edges into {} ({} bytes)",
        weighted.graph.node_count(),
        weighted.graph.edge_count(),
        written.display(),
        bytes.len()
    ))
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// BLAKE3 content hash of a weighted graph; identical for both encodings.
pub fn cmd_hash(input: &Path, json_mode: bool) -> Result<String, CredError> {
    let weighted = load_weighted_graph(input)?;
    let hash = content_hash(&weighted)?;

    if json_mode {
        let out = serde_json::json!({
            "algorithm": "blake3",
            "hash": hash,
            "nodes": weighted.graph.node_count(),
            "edges": weighted.graph.edge_count(),
        });
        return pretty(&out);
    }

    Ok(format!("BLAKE3: {}", hash))
}
