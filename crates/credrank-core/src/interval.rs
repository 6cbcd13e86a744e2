//! # Time Intervals
//!
//! Half-open `[start, end)` intervals and the contiguous sequences that
//! partition a graph's timeline.
//!
//! Bucketing rule: timestamp `t` falls in the unique interval with
//! `start <= t < end`, so a timestamp exactly on a boundary belongs to the
//! later interval.

use crate::graph::{EdgesOptions, Graph};
use crate::primitives::{WEEK_MS, WEEK_ORIGIN_MS};
use crate::{CredError, Edge, Node, TimestampMs};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// INTERVAL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time_ms: TimestampMs,
    pub end_time_ms: TimestampMs,
}

impl Interval {
    /// Create an interval; `end` must be after `start`.
    pub fn new(start_time_ms: TimestampMs, end_time_ms: TimestampMs) -> Result<Self, CredError> {
        if end_time_ms <= start_time_ms {
            return Err(CredError::Parameter(format!(
                "interval end {} is not after start {}",
                end_time_ms, start_time_ms
            )));
        }
        Ok(Self {
            start_time_ms,
            end_time_ms,
        })
    }

    #[must_use]
    pub fn contains(&self, timestamp_ms: TimestampMs) -> bool {
        self.start_time_ms <= timestamp_ms && timestamp_ms < self.end_time_ms
    }
}

/// Check that a sequence is non-degenerate and contiguous.
pub fn validate_intervals(intervals: &[Interval]) -> Result<(), CredError> {
    if let Some(bad) = intervals.iter().find(|i| i.end_time_ms <= i.start_time_ms) {
        return Err(CredError::Parameter(format!(
            "empty interval [{}, {})",
            bad.start_time_ms, bad.end_time_ms
        )));
    }
    if let Some(pair) = intervals
        .windows(2)
        .find(|pair| pair[0].end_time_ms != pair[1].start_time_ms)
    {
        return Err(CredError::Parameter(format!(
            "intervals not contiguous: {} then {}",
            pair[0].end_time_ms, pair[1].start_time_ms
        )));
    }
    Ok(())
}

/// Index of the interval containing `timestamp_ms`, if any.
///
/// `intervals` must be contiguous.
#[must_use]
pub fn bucket_index(intervals: &[Interval], timestamp_ms: TimestampMs) -> Option<usize> {
    let index = intervals.partition_point(|i| i.end_time_ms <= timestamp_ms);
    intervals
        .get(index)
        .filter(|i| i.contains(timestamp_ms))
        .map(|_| index)
}

// =============================================================================
// INTERVAL LENGTH
// =============================================================================

/// Supported partition widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalLength {
    #[default]
    Weekly,
}

impl IntervalLength {
    /// Width in milliseconds.
    #[must_use]
    pub fn width_ms(self) -> i64 {
        match self {
            Self::Weekly => WEEK_MS,
        }
    }

    /// A timestamp that falls on a boundary.
    #[must_use]
    pub fn origin_ms(self) -> i64 {
        match self {
            Self::Weekly => WEEK_ORIGIN_MS,
        }
    }

    /// Contiguous cover of `[start, end]` at this width.
    pub fn intervals(
        self,
        start_ms: TimestampMs,
        end_ms: TimestampMs,
    ) -> Result<Vec<Interval>, CredError> {
        fixed_intervals(start_ms, end_ms, self.width_ms(), self.origin_ms())
    }
}

impl fmt::Display for IntervalLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

impl FromStr for IntervalLength {
    type Err = CredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            other => Err(CredError::Parameter(format!(
                "interval length not supported: {:?}",
                other
            ))),
        }
    }
}

// =============================================================================
// INTERVAL SEQUENCES
// =============================================================================

/// Contiguous intervals of `width_ms`, aligned so that `origin_ms` is a
/// boundary, covering `[start_ms, end_ms]`.
///
/// The first interval starts at the boundary at or before `start_ms`.
/// Intervals are emitted while their start is `<= end_ms`, so an `end_ms`
/// exactly on a boundary gets its own trailing interval.
pub fn fixed_intervals(
    start_ms: TimestampMs,
    end_ms: TimestampMs,
    width_ms: i64,
    origin_ms: i64,
) -> Result<Vec<Interval>, CredError> {
    if width_ms <= 0 {
        return Err(CredError::Parameter(format!(
            "interval width must be positive, got {}",
            width_ms
        )));
    }
    if end_ms < start_ms {
        return Ok(Vec::new());
    }
    let overflow = || CredError::Parameter("interval bounds overflow".to_string());

    let offset = start_ms.checked_sub(origin_ms).ok_or_else(overflow)?;
    let mut start = offset
        .div_euclid(width_ms)
        .checked_mul(width_ms)
        .and_then(|aligned| origin_ms.checked_add(aligned))
        .ok_or_else(overflow)?;
    let mut intervals = Vec::new();
    while start <= end_ms {
        let end = start.checked_add(width_ms).ok_or_else(overflow)?;
        intervals.push(Interval {
            start_time_ms: start,
            end_time_ms: end,
        });
        start = end;
    }
    Ok(intervals)
}

/// Weekly intervals covering `[start_ms, end_ms]`.
pub fn week_intervals(start_ms: TimestampMs, end_ms: TimestampMs) -> Result<Vec<Interval>, CredError> {
    IntervalLength::Weekly.intervals(start_ms, end_ms)
}

/// Cover of every timeful node and non-dangling edge of `graph`.
///
/// An empty graph yields no intervals.
pub fn graph_intervals(graph: &Graph, length: IntervalLength) -> Result<Vec<Interval>, CredError> {
    let timestamps = graph
        .nodes()
        .filter_map(|n| n.timestamp_ms)
        .chain(graph.edges(&EdgesOptions::non_dangling()).map(|e| e.timestamp_ms));
    let bounds = timestamps.fold(None, |acc: Option<(i64, i64)>, t| match acc {
        None => Some((t, t)),
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
    });
    match bounds {
        None => Ok(Vec::new()),
        Some((lo, hi)) => length.intervals(lo, hi),
    }
}

/// Nodes and edges of one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphIntervalPartition {
    pub interval: Interval,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Bucket every timeful node and non-dangling edge into `intervals`.
///
/// Timeless nodes, dangling edges and entities outside every interval are
/// left out. Within a bucket, entities keep address order.
pub fn partition_graph(graph: &Graph, intervals: &[Interval]) -> Result<Vec<GraphIntervalPartition>, CredError> {
    validate_intervals(intervals)?;
    let mut partitions: Vec<GraphIntervalPartition> = intervals
        .iter()
        .map(|&interval| GraphIntervalPartition {
            interval,
            nodes: Vec::new(),
            edges: Vec::new(),
        })
        .collect();
    for node in graph.nodes() {
        let bucket = node
            .timestamp_ms
            .and_then(|t| bucket_index(intervals, t))
            .and_then(|i| partitions.get_mut(i));
        if let Some(partition) = bucket {
            partition.nodes.push(node.clone());
        }
    }
    for edge in graph.edges(&EdgesOptions::non_dangling()) {
        if let Some(partition) =
            bucket_index(intervals, edge.timestamp_ms).and_then(|i| partitions.get_mut(i))
        {
            partition.edges.push(edge.clone());
        }
    }
    Ok(partitions)
}

// =============================================================================
// EPOCH BOUNDARIES
// =============================================================================

/// A point on the extended timeline, used for epoch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBoundary {
    NegInfinity,
    Finite(TimestampMs),
    PosInfinity,
}

impl TimeBoundary {
    /// `[-inf, start_0, start_1, ..., start_{n-1}, +inf]`.
    #[must_use]
    pub fn epoch_boundaries(intervals: &[Interval]) -> Vec<TimeBoundary> {
        std::iter::once(Self::NegInfinity)
            .chain(intervals.iter().map(|i| Self::Finite(i.start_time_ms)))
            .chain(std::iter::once(Self::PosInfinity))
            .collect()
    }

    /// Index into [`Self::epoch_boundaries`] of the epoch containing `timestamp_ms`.
    ///
    /// Never selects the trailing `+inf` epoch.
    #[must_use]
    pub fn epoch_index(intervals: &[Interval], timestamp_ms: TimestampMs) -> usize {
        intervals.partition_point(|i| i.start_time_ms <= timestamp_ms)
    }
}

impl fmt::Display for TimeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInfinity => write!(f, "-Infinity"),
            Self::Finite(t) => write!(f, "{}", t),
            Self::PosInfinity => write!(f, "Infinity"),
        }
    }
}

impl Serialize for TimeBoundary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(t) => serializer.serialize_i64(*t),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

struct TimeBoundaryVisitor;

impl Visitor<'_> for TimeBoundaryVisitor {
    type Value = TimeBoundary;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an integer timestamp, \"-Infinity\" or \"Infinity\"")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(TimeBoundary::Finite(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(TimeBoundary::Finite)
            .map_err(|_| E::custom(format!("timestamp out of range: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match v {
            "-Infinity" => Ok(TimeBoundary::NegInfinity),
            "Infinity" => Ok(TimeBoundary::PosInfinity),
            other => Err(E::custom(format!("invalid time boundary: {:?}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for TimeBoundary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimeBoundaryVisitor)
    }
}

// =============================================================================
// TESTS
// =============================================================================
