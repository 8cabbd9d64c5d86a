//! Eviction Policy
//!
//! Keeps the backing store under `ceiling_fraction * memory_budget` by
//! deleting the oldest stored data. Only inserted records are touched;
//! whatever still sits in the ingest buffer is out of reach by
//! construction.

use crate::storage::backing::BackingStore;
use crate::storage::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default fraction of the memory budget the store may use
pub const DEFAULT_CEILING_FRACTION: f64 = 0.9;

/// Partial passes attempted before falling back to a full drain
const MAX_PARTIAL_PASSES: usize = 8;

/// How much of the store to delete per eviction pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Delete every stored record; source files stay on disk
    Drain,
    /// Delete records older than the midpoint of min and average timestamp
    OldestQuartile,
}

impl EvictionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            EvictionPolicy::Drain => "drain",
            EvictionPolicy::OldestQuartile => "oldest-quartile",
        }
    }
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drain" => Ok(EvictionPolicy::Drain),
            "oldest-quartile" | "quartile" => Ok(EvictionPolicy::OldestQuartile),
            other => Err(format!(
                "unknown eviction policy {:?}: must be \"drain\" or \"oldest-quartile\"",
                other
            )),
        }
    }
}

/// Result of one enforced eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionOutcome {
    pub size_before: u64,
    pub size_after: u64,
    pub passes: usize,
}

impl EvictionOutcome {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }
}

/// Size check plus deletion, run after every flush
#[derive(Debug, Clone, Copy)]
pub struct Evictor {
    threshold_bytes: u64,
    policy: EvictionPolicy,
}

impl Evictor {
    /// `threshold = ceiling_fraction * memory_budget`
    pub fn new(memory_budget: u64, ceiling_fraction: f64, policy: EvictionPolicy) -> Self {
        Self {
            threshold_bytes: (memory_budget as f64 * ceiling_fraction) as u64,
            policy,
        }
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Whether the store has crossed the ceiling
    pub fn needs_eviction<S: BackingStore + ?Sized>(&self, store: &S) -> StorageResult<bool> {
        Ok(store.estimated_size_bytes()? >= self.threshold_bytes)
    }

    /// Evict until the store is strictly under the threshold
    ///
    /// Returns `Ok(None)` when nothing had to be done. Partial passes that
    /// stop reclaiming space escalate to a drain; if the store is still
    /// over the threshold once empty, the error is fatal for the run.
    pub fn enforce<S: BackingStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> StorageResult<Option<EvictionOutcome>> {
        let size_before = store.estimated_size_bytes()?;
        if size_before < self.threshold_bytes {
            return Ok(None);
        }

        let mut size = size_before;
        let mut passes = 0;
        let mut policy = self.policy;

        while size >= self.threshold_bytes {
            if passes >= MAX_PARTIAL_PASSES && policy != EvictionPolicy::Drain {
                policy = EvictionPolicy::Drain;
            }

            let reclaimed = store.delete_oldest(policy)?;
            passes += 1;
            let after = store.estimated_size_bytes()?;

            tracing::debug!(
                "Eviction pass {} ({}): {} -> {} bytes, {} reclaimed",
                passes,
                policy,
                size,
                after,
                reclaimed
            );

            if after >= self.threshold_bytes && after >= size {
                if policy == EvictionPolicy::Drain {
                    return Err(StorageError::EvictionExhausted {
                        size_bytes: after,
                        threshold_bytes: self.threshold_bytes,
                    });
                }
                policy = EvictionPolicy::Drain;
            }
            size = after;
        }

        Ok(Some(EvictionOutcome {
            size_before,
            size_after: size,
            passes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FieldValue, LogRecord};
    use crate::storage::backing::{QueryRow, StoreStats};

    /// Store where every record costs `unit` bytes on top of `overhead`
    struct CountingStore {
        timestamps: Vec<i64>,
        unit: u64,
        overhead: u64,
        calls: Vec<EvictionPolicy>,
    }

    impl CountingStore {
        fn new(timestamps: Vec<i64>, unit: u64, overhead: u64) -> Self {
            Self {
                timestamps,
                unit,
                overhead,
                calls: Vec::new(),
            }
        }
    }

    impl BackingStore for CountingStore {
        fn insert(&mut self, _records: &[LogRecord]) -> StorageResult<usize> {
            Ok(0)
        }

        fn estimated_size_bytes(&self) -> StorageResult<u64> {
            Ok(self.overhead + self.unit * self.timestamps.len() as u64)
        }

        fn delete_oldest(&mut self, policy: EvictionPolicy) -> StorageResult<u64> {
            self.calls.push(policy);
            let before = self.estimated_size_bytes()?;
            match policy {
                EvictionPolicy::Drain => self.timestamps.clear(),
                EvictionPolicy::OldestQuartile => {
                    if let Some(min) = self.timestamps.iter().min().copied() {
                        let avg = self.timestamps.iter().sum::<i64>() as f64
                            / self.timestamps.len() as f64;
                        let target = ((avg + min as f64) / 2.0).round() as i64;
                        self.timestamps.retain(|&ts| ts >= target);
                    }
                }
            }
            Ok(before - self.estimated_size_bytes()?)
        }

        fn execute_query(&self, _sql: &str, _params: &[FieldValue]) -> StorageResult<Vec<QueryRow>> {
            Ok(Vec::new())
        }

        fn stats(&self) -> StorageResult<StoreStats> {
            Ok(StoreStats::default())
        }
    }

    #[test]
    fn test_threshold() {
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::Drain);
        assert_eq!(evictor.threshold_bytes(), 900);
    }

    #[test]
    fn test_under_threshold_is_noop() {
        let mut store = CountingStore::new((0..10).collect(), 10, 0);
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::Drain);
        assert!(evictor.enforce(&mut store).unwrap().is_none());
        assert!(store.calls.is_empty());
    }

    #[test]
    fn test_drain_gets_under_threshold() {
        let mut store = CountingStore::new((0..100).collect(), 10, 50);
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::Drain);

        let outcome = evictor.enforce(&mut store).unwrap().unwrap();
        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.size_after, 50);
        assert_eq!(outcome.bytes_reclaimed(), 1000);
        assert!(store.estimated_size_bytes().unwrap() < evictor.threshold_bytes());
    }

    #[test]
    fn test_quartile_keeps_newest() {
        // 100 records of 10 bytes, threshold 900
        let mut store = CountingStore::new((0..100).collect(), 10, 0);
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::OldestQuartile);

        let outcome = evictor.enforce(&mut store).unwrap().unwrap();
        assert!(outcome.size_after < 900);
        assert!(store.timestamps.contains(&99));
        assert!(!store.timestamps.contains(&0));
        assert!(store.calls.iter().all(|p| *p == EvictionPolicy::OldestQuartile));
    }

    #[test]
    fn test_quartile_escalates_when_stuck() {
        // identical timestamps: quartile deletes nothing
        let mut store = CountingStore::new(vec![5; 100], 10, 0);
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::OldestQuartile);

        let outcome = evictor.enforce(&mut store).unwrap().unwrap();
        assert_eq!(outcome.size_after, 0);
        assert_eq!(
            store.calls,
            vec![EvictionPolicy::OldestQuartile, EvictionPolicy::Drain]
        );
    }

    #[test]
    fn test_overhead_above_threshold_is_fatal() {
        let mut store = CountingStore::new((0..10).collect(), 10, 2000);
        let evictor = Evictor::new(1000, 0.9, EvictionPolicy::Drain);

        let result = evictor.enforce(&mut store);
        assert!(matches!(
            result,
            Err(StorageError::EvictionExhausted {
                size_bytes: 2000,
                threshold_bytes: 900
            })
        ));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("drain".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Drain);
        assert_eq!(
            "oldest-quartile".parse::<EvictionPolicy>().unwrap(),
            EvictionPolicy::OldestQuartile
        );
        assert!("lru".parse::<EvictionPolicy>().is_err());
    }
}
