//! Execution results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use qcal_ir::ProgramMetadata;

/// Measurement outcome histogram.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    counts: BTreeMap<String, u64>,
}

impl Counts {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(outcome, count)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, u64)>) -> Self {
        let mut counts = Self::new();
        for (k, v) in pairs {
            counts.insert(k, v);
        }
        counts
    }

    /// Add `n` occurrences of an outcome.
    pub fn insert(&mut self, outcome: impl Into<String>, n: u64) {
        *self.counts.entry(outcome.into()).or_insert(0) += n;
    }

    /// Occurrences of an outcome.
    pub fn get(&self, outcome: &str) -> u64 {
        self.counts.get(outcome).copied().unwrap_or(0)
    }

    /// Total number of recorded shots.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Relative frequency of an outcome (0 for an empty histogram).
    pub fn probability(&self, outcome: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(outcome) as f64 / total as f64
    }

    /// The most frequent outcome.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.counts
            .iter()
            .max_by_key(|(_, v)| **v)
            .map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate over outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Outcome of one program in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramResult {
    /// Program name.
    pub name: String,
    /// Sweep metadata copied from the program.
    pub metadata: ProgramMetadata,
    /// Outcome histogram.
    pub counts: Counts,
    /// Shots executed.
    pub shots: u32,
}

/// Result of a batch job, one entry per submitted program in submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Per-program outcomes.
    pub results: Vec<ProgramResult>,
    /// Wall-clock execution time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ExecutionResult {
    /// Create a result from per-program outcomes.
    pub fn new(results: Vec<ProgramResult>) -> Self {
        Self {
            results,
            execution_time_ms: None,
        }
    }

    /// Set the execution time.
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Number of program results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the result holds no programs.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut counts = Counts::new();
        counts.insert("0", 700);
        counts.insert("1", 300);
        counts.insert("1", 24);

        assert_eq!(counts.total(), 1024);
        assert_eq!(counts.get("1"), 324);
        assert_eq!(counts.get("2"), 0);
        assert!((counts.probability("0") - 700.0 / 1024.0).abs() < 1e-12);
        assert_eq!(counts.most_frequent(), Some(("0", 700)));
    }

    #[test]
    fn test_empty_counts() {
        let counts = Counts::new();
        assert_eq!(counts.probability("0"), 0.0);
        assert!(counts.most_frequent().is_none());
    }

    #[test]
    fn test_execution_result() {
        let r = ExecutionResult::new(vec![ProgramResult {
            name: "p0".into(),
            metadata: ProgramMetadata::at(0.0),
            counts: Counts::from_pairs([("0", 10)]),
            shots: 10,
        }])
        .with_execution_time(3);
        assert_eq!(r.len(), 1);
        assert_eq!(r.execution_time_ms, Some(3));
    }
}
