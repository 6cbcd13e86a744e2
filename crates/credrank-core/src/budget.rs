//! # Budget Enforcement
//!
//! Caps the total node weight minted under a prefix per interval.
//!
//! For each entry and each interval, the evaluated weights of the entry's
//! timeful nodes are summed. When the sum exceeds the budget in force, every
//! such node gets an exact-address override scaled by `budget / total`,
//! multiplied into whatever exact override it already had.

use crate::address::NodeAddress;
use crate::interval::{IntervalLength, bucket_index, graph_intervals};
use crate::weight_evaluator::NodeWeightEvaluator;
use crate::weighted_graph::WeightedGraph;
use crate::{CredError, TimestampMs};
use serde::{Deserialize, Serialize};

/// Budget value in force from `start_time_ms` until the next period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPeriod {
    pub start_time_ms: TimestampMs,
    pub budget_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntry {
    pub prefix: NodeAddress,
    /// Strictly increasing by start time.
    pub periods: Vec<BudgetPeriod>,
}

impl BudgetEntry {
    /// Budget of the last period starting at or before `interval_start`.
    /// Unbounded before the first period.
    #[must_use]
    pub fn budget_at(&self, interval_start: TimestampMs) -> f64 {
        self.periods
            .iter()
            .take_while(|p| p.start_time_ms <= interval_start)
            .last()
            .map_or(f64::INFINITY, |p| p.budget_value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub entries: Vec<BudgetEntry>,
    #[serde(default)]
    pub interval_length: IntervalLength,
}

impl Budget {
    /// Prefixes must be pairwise disjoint; periods strictly increasing with
    /// non-negative values.
    pub fn validate(&self) -> Result<(), CredError> {
        for (i, a) in self.entries.iter().enumerate() {
            for b in self.entries.iter().skip(i + 1) {
                if a.prefix.has_prefix(&b.prefix) || b.prefix.has_prefix(&a.prefix) {
                    return Err(CredError::WeightConfig(format!(
                        "budget prefixes overlap: {} and {}",
                        a.prefix, b.prefix
                    )));
                }
            }
            if let Some(pair) = a
                .periods
                .windows(2)
                .find(|pair| pair[0].start_time_ms >= pair[1].start_time_ms)
            {
                return Err(CredError::Parameter(format!(
                    "budget periods for {} not strictly increasing: {} then {}",
                    a.prefix, pair[0].start_time_ms, pair[1].start_time_ms
                )));
            }
            if let Some(period) = a
                .periods
                .iter()
                .find(|p| p.budget_value.is_nan() || p.budget_value < 0.0)
            {
                return Err(CredError::Parameter(format!(
                    "budget value for {} must be non-negative, got {}",
                    a.prefix, period.budget_value
                )));
            }
        }
        Ok(())
    }
}

/// Return a copy of `weighted` whose weights respect `budget`.
pub fn apply_budget(weighted: &WeightedGraph, budget: &Budget) -> Result<WeightedGraph, CredError> {
    budget.validate()?;
    let mut result = weighted.clone();
    if budget.entries.is_empty() {
        return Ok(result);
    }

    let evaluator = NodeWeightEvaluator::from_weights(&weighted.weights);
    let intervals = graph_intervals(&weighted.graph, budget.interval_length)?;

    for entry in &budget.entries {
        let mut buckets: Vec<(f64, Vec<&NodeAddress>)> = vec![(0.0, Vec::new()); intervals.len()];
        for node in weighted.graph.nodes_with_prefix(&entry.prefix) {
            let bucket = node
                .timestamp_ms
                .and_then(|t| bucket_index(&intervals, t))
                .and_then(|i| buckets.get_mut(i));
            if let Some((total, addresses)) = bucket {
                *total += evaluator.evaluate(&node.address);
                addresses.push(&node.address);
            }
        }

        for (interval, (total, addresses)) in intervals.iter().zip(buckets) {
            let budget_value = entry.budget_at(interval.start_time_ms);
            if total <= budget_value {
                continue;
            }
            let normalizer = budget_value / total;
            tracing::debug!(
                "budget {} at {}: total {} exceeds {}, scaling {} nodes by {}",
                entry.prefix,
                interval.start_time_ms,
                total,
                budget_value,
                addresses.len(),
                normalizer
            );
            for address in addresses {
                let existing = result.weights.node_weight(address).unwrap_or(1.0);
                result
                    .weights
                    .set_node_weight(address.clone(), existing * normalizer)?;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::primitives::{WEEK_MS, WEEK_ORIGIN_MS};
    use crate::weights::Weights;
    use crate::Node;

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("address")
    }

    fn entry(prefix: &[&str], periods: &[(i64, f64)]) -> BudgetEntry {
        BudgetEntry {
            prefix: na(prefix),
            periods: periods
                .iter()
                .map(|&(start_time_ms, budget_value)| BudgetPeriod {
                    start_time_ms,
                    budget_value,
                })
                .collect(),
        }
    }

    fn foo_graph() -> WeightedGraph {
        let mut graph = Graph::new();
        for (name, t) in [("a", WEEK_ORIGIN_MS), ("b", WEEK_ORIGIN_MS + 1)] {
            graph
                .add_node(Node::new(na(&["foo", name]), name, t))
                .expect("add");
        }
        graph
            .add_node(Node::new(na(&["bar", "c"]), "c", WEEK_ORIGIN_MS))
            .expect("add");
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["foo"]), 10.0).expect("weight");
        weights.set_node_weight(na(&["bar"]), 10.0).expect("weight");
        WeightedGraph::new(graph, weights)
    }

    #[test]
    fn overlapping_prefixes_rejected() {
        let budget = Budget {
            entries: vec![entry(&["foo"], &[]), entry(&["foo", "bar"], &[])],
            interval_length: IntervalLength::Weekly,
        };
        assert!(matches!(budget.validate(), Err(CredError::WeightConfig(_))));
    }

    #[test]
    fn non_monotonic_periods_rejected() {
        let budget = Budget {
            entries: vec![entry(&["foo"], &[(5, 1.0), (5, 2.0)])],
            interval_length: IntervalLength::Weekly,
        };
        assert!(matches!(budget.validate(), Err(CredError::Parameter(_))));
    }

    #[test]
    fn budget_at_picks_latest_started_period() {
        let e = entry(&["foo"], &[(0, 10.0), (100, 5.0)]);
        assert_eq!(e.budget_at(-1), f64::INFINITY);
        assert_eq!(e.budget_at(0), 10.0);
        assert_eq!(e.budget_at(99), 10.0);
        assert_eq!(e.budget_at(100), 5.0);
    }

    #[test]
    fn over_budget_weights_are_halved() {
        let original = foo_graph();
        let budget = Budget {
            entries: vec![entry(&["foo"], &[(0, 10.0)])],
            interval_length: IntervalLength::Weekly,
        };
        let budgeted = apply_budget(&original, &budget).expect("apply");

        let evaluator = NodeWeightEvaluator::from_weights(&budgeted.weights);
        assert_eq!(evaluator.evaluate(&na(&["foo", "a"])), 5.0);
        assert_eq!(evaluator.evaluate(&na(&["foo", "b"])), 5.0);
        assert_eq!(evaluator.evaluate(&na(&["bar", "c"])), 10.0);
        assert_eq!(original.weights.node_weight(&na(&["foo", "a"])), None);
    }

    #[test]
    fn existing_exact_override_is_multiplied() {
        let mut original = foo_graph();
        original
            .weights
            .set_node_weight(na(&["foo", "a"]), 0.5)
            .expect("weight");
        // totals: a = 10 * 0.5 = 5, b = 10, so 15 against a budget of 5
        let budget = Budget {
            entries: vec![entry(&["foo"], &[(0, 5.0)])],
            interval_length: IntervalLength::Weekly,
        };
        let budgeted = apply_budget(&original, &budget).expect("apply");
        let evaluator = NodeWeightEvaluator::from_weights(&budgeted.weights);
        let a = evaluator.evaluate(&na(&["foo", "a"]));
        let b = evaluator.evaluate(&na(&["foo", "b"]));
        assert!((a + b - 5.0).abs() < 1e-12);
        assert!((a - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn under_budget_is_untouched() {
        let original = foo_graph();
        let budget = Budget {
            entries: vec![entry(&["foo"], &[(0, 100.0)])],
            interval_length: IntervalLength::Weekly,
        };
        assert_eq!(apply_budget(&original, &budget).expect("apply"), original);
    }

    #[test]
    fn budget_applies_per_interval() {
        let mut original = foo_graph();
        original
            .graph
            .add_node(Node::new(na(&["foo", "late"]), "late", WEEK_ORIGIN_MS + WEEK_MS))
            .expect("add");
        let budget = Budget {
            entries: vec![entry(&["foo"], &[(0, 10.0)])],
            interval_length: IntervalLength::Weekly,
        };
        let budgeted = apply_budget(&original, &budget).expect("apply");
        let evaluator = NodeWeightEvaluator::from_weights(&budgeted.weights);
        assert_eq!(evaluator.evaluate(&na(&["foo", "late"])), 10.0);
        assert_eq!(evaluator.evaluate(&na(&["foo", "a"])), 5.0);
    }
}
