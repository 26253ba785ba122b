//! The append-only calibration parameter store.
//!
//! Every value ever written lives in one arena and is never mutated or
//! removed. The current value of a key is a read-side projection over that
//! log: the latest valid entry at or before the query time, ties broken by
//! insertion order. Invalidation appends a tombstone rather than touching
//! the records it covers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use qcal_hal::Capabilities;
use qcal_ir::Channel;

use crate::error::{StoreError, StoreResult};
use crate::key::{ParameterKey, ParameterValue, Provenance};
use crate::templates::TemplateLibrary;

/// One record in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Key the value belongs to.
    pub key: ParameterKey,
    /// The immutable record.
    pub value: ParameterValue,
}

/// Tombstone covering entries of `key` created before `before`.
///
/// Only entries already in the arena when the tombstone was issued
/// (`index < seq`) are affected, so later additions with back-dated
/// timestamps stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invalidation {
    /// Key whose history is cut.
    pub key: ParameterKey,
    /// Cutoff timestamp (exclusive).
    pub before: DateTime<Utc>,
    /// Arena length when the tombstone was issued.
    pub seq: usize,
}

/// A row of [`CalibrationStore::parameters_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    /// Key of the parameter.
    pub key: ParameterKey,
    /// Current value.
    pub value: f64,
    /// Timestamp of the current record.
    pub timestamp: DateTime<Utc>,
    /// Source of the current record.
    pub source: String,
}

/// Versioned calibration parameter store for one backend.
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
    pub(crate) backend: String,
    pub(crate) entries: Vec<Entry>,
    pub(crate) index: FxHashMap<ParameterKey, Vec<usize>>,
    pub(crate) invalidations: Vec<Invalidation>,
    pub(crate) control_channels: BTreeMap<u32, u32>,
    pub(crate) blacklist: BTreeSet<u32>,
}

impl CalibrationStore {
    /// Create an empty store with no control lines.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Self::default()
        }
    }

    /// Create a store for a backend.
    ///
    /// Each qubit is mapped to the control line of its first outgoing
    /// coupling edge. Qubits without one are blacklisted with a warning and
    /// construction continues. Device defaults and the library defaults are
    /// registered at the capabilities timestamp.
    pub fn from_backend(caps: &Capabilities, library: &TemplateLibrary) -> Self {
        let mut store = Self::new(caps.name.clone());
        let at = caps.updated_at;

        for qubit in 0..caps.num_qubits {
            match caps.topology.first_edge_from(qubit) {
                Some(edge) => {
                    store.control_channels.insert(qubit, edge.channel);
                }
                None => {
                    let gap = StoreError::TopologyGap { qubit };
                    warn!("{gap}; qubit {qubit} is blacklisted");
                    store.blacklist.insert(qubit);
                }
            }

            if let Some(props) = caps.qubit(qubit) {
                store.add_value(
                    ParameterKey::qubit("drive_freq", qubit, None),
                    props.drive_freq,
                    at,
                    Provenance::backend(),
                );
                store.add_value(
                    ParameterKey::qubit("meas_freq", qubit, None),
                    props.meas_freq,
                    at,
                    Provenance::backend(),
                );
                store.add_value(
                    ParameterKey::qubit("α", qubit, None),
                    props.anharmonicity,
                    at,
                    Provenance::backend(),
                );
            }
        }

        library.register_defaults(&mut store, at);

        debug!(
            "Created calibration store for '{}' ({} qubits, {} blacklisted)",
            store.backend,
            caps.num_qubits,
            store.blacklist.len()
        );
        store
    }

    /// Name of the backend this store belongs to.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Append a value. Never fails; equal timestamps are ordered by insertion.
    pub fn add_value(
        &mut self,
        key: ParameterKey,
        value: f64,
        timestamp: DateTime<Utc>,
        provenance: Provenance,
    ) {
        let idx = self.entries.len();
        self.index.entry(key.clone()).or_default().push(idx);
        self.entries.push(Entry {
            key,
            value: ParameterValue::new(value, timestamp, provenance),
        });
    }

    /// Mark every existing entry of `key` created before `before` invalid.
    ///
    /// Returns how many entries the cutoff covers.
    pub fn invalidate(&mut self, key: &ParameterKey, before: DateTime<Utc>) -> usize {
        let covered = self
            .index
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter(|&&i| self.entries[i].value.timestamp < before)
                    .count()
            })
            .unwrap_or(0);

        self.invalidations.push(Invalidation {
            key: key.clone(),
            before,
            seq: self.entries.len(),
        });
        covered
    }

    fn is_valid(&self, idx: usize) -> bool {
        let entry = &self.entries[idx];
        entry.value.valid
            && !self.invalidations.iter().any(|inv| {
                inv.key == entry.key && idx < inv.seq && entry.value.timestamp < inv.before
            })
    }

    fn current_entry(&self, key: &ParameterKey, at: DateTime<Utc>) -> Option<&ParameterValue> {
        let ids = self.index.get(key)?;
        ids.iter()
            .copied()
            .filter(|&i| self.entries[i].value.timestamp <= at && self.is_valid(i))
            .max_by_key(|&i| (self.entries[i].value.timestamp, i))
            .map(|i| &self.entries[i].value)
    }

    /// True if `key` has any entry, valid or not, at or before `at`.
    fn has_entry_by(&self, key: &ParameterKey, at: DateTime<Utc>) -> bool {
        self.index
            .get(key)
            .is_some_and(|ids| ids.iter().any(|&i| self.entries[i].value.timestamp <= at))
    }

    /// Current record for a key at `at` (default: now).
    ///
    /// A qubit-scoped key that has no entry by `at` falls back to the same
    /// name and schedule with the default (empty) scope. Once a qubit-scoped
    /// entry exists, invalidating it does not revert to the default: the
    /// lookup fails with `MissingParameter` until a new value is added.
    pub fn get_record(
        &self,
        key: &ParameterKey,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<&ParameterValue> {
        let at = at.unwrap_or_else(Utc::now);
        let record = if key.is_default_scope() || self.has_entry_by(key, at) {
            self.current_entry(key, at)
        } else {
            self.current_entry(&key.to_default_scope(), at)
        };
        record.ok_or_else(|| StoreError::MissingParameter { key: key.clone() })
    }

    /// Current value for a key at `at` (default: now).
    pub fn get_current(&self, key: &ParameterKey, at: Option<DateTime<Utc>>) -> StoreResult<f64> {
        self.get_record(key, at).map(|v| v.value)
    }

    /// Full history of a key in timestamp order (insertion order on ties).
    pub fn parameter_history(&self, key: &ParameterKey) -> Vec<&ParameterValue> {
        let mut ids: Vec<usize> = self.index.get(key).cloned().unwrap_or_default();
        ids.sort_by_key(|&i| (self.entries[i].value.timestamp, i));
        ids.into_iter().map(|i| &self.entries[i].value).collect()
    }

    /// Current value of every key that has one, sorted by key.
    pub fn parameters_table(&self) -> Vec<ParameterRow> {
        let now = Utc::now();
        let mut keys: Vec<&ParameterKey> = self.index.keys().collect();
        keys.sort();

        keys.into_iter()
            .filter_map(|key| {
                self.current_entry(key, now).map(|v| ParameterRow {
                    key: key.clone(),
                    value: v.value,
                    timestamp: v.timestamp,
                    source: v.provenance.source.clone(),
                })
            })
            .collect()
    }

    /// All keys with at least one entry.
    pub fn keys(&self) -> impl Iterator<Item = &ParameterKey> {
        self.index.keys()
    }

    /// Number of records in the arena.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Control line used to drive the 1–2 transition of `qubit`.
    pub fn qutrit_channel(&self, qubit: u32) -> StoreResult<Channel> {
        self.control_channels
            .get(&qubit)
            .map(|&ch| Channel::Control(ch))
            .ok_or(StoreError::TopologyGap { qubit })
    }

    /// Check if a qubit has no usable control line.
    pub fn is_blacklisted(&self, qubit: u32) -> bool {
        self.blacklist.contains(&qubit)
    }

    /// Blacklisted qubits.
    pub fn blacklist(&self) -> &BTreeSet<u32> {
        &self.blacklist
    }

    /// Qubit to control-line mapping.
    pub fn control_channels(&self) -> &BTreeMap<u32, u32> {
        &self.control_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use qcal_hal::Topology;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn amp_key() -> ParameterKey {
        ParameterKey::qubit("amp", 0, Some("x12"))
    }

    #[test]
    fn test_get_current_after_add() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.14, t0(), Provenance::default_value());

        assert_eq!(store.get_current(&amp_key(), Some(t0())).unwrap(), 0.14);
        assert_eq!(
            store
                .get_current(&amp_key(), Some(t0() + Duration::hours(5)))
                .unwrap(),
            0.14
        );
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.14);
    }

    #[test]
    fn test_untouched_key_is_missing() {
        let store = CalibrationStore::new("test");
        let err = store.get_current(&amp_key(), None).unwrap_err();
        assert!(matches!(err, StoreError::MissingParameter { key } if key == amp_key()));
    }

    #[test]
    fn test_query_before_first_entry_is_missing() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.14, t0(), Provenance::default_value());
        let before = t0() - Duration::seconds(1);
        assert!(store.get_current(&amp_key(), Some(before)).is_err());
    }

    #[test]
    fn test_history_lookup_by_time() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.14, t0(), Provenance::default_value());
        store.add_value(
            amp_key(),
            0.15,
            t0() + Duration::minutes(10),
            Provenance::from_source("rough_amplitude"),
        );

        let mid = t0() + Duration::minutes(5);
        assert_eq!(store.get_current(&amp_key(), Some(mid)).unwrap(), 0.14);
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.15);
        assert_eq!(store.parameter_history(&amp_key()).len(), 2);
    }

    #[test]
    fn test_equal_timestamps_break_by_insertion() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.1, t0(), Provenance::default_value());
        store.add_value(amp_key(), 0.2, t0(), Provenance::default_value());
        assert_eq!(store.get_current(&amp_key(), Some(t0())).unwrap(), 0.2);
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.2, t0() + Duration::minutes(1), Provenance::default_value());
        store.add_value(amp_key(), 0.1, t0(), Provenance::default_value());
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.2);

        let history = store.parameter_history(&amp_key());
        assert_eq!(history[0].value, 0.1);
        assert_eq!(history[1].value, 0.2);
    }

    #[test]
    fn test_invalidate_keeps_history() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.1, t0(), Provenance::default_value());
        store.add_value(amp_key(), 0.2, t0() + Duration::minutes(1), Provenance::default_value());

        let covered = store.invalidate(&amp_key(), t0() + Duration::minutes(2));
        assert_eq!(covered, 2);
        assert!(store.get_current(&amp_key(), None).is_err());
        assert_eq!(store.parameter_history(&amp_key()).len(), 2);
        assert!(store.parameter_history(&amp_key()).iter().all(|v| v.valid));

        // A new value after the cutoff is current again.
        store.add_value(amp_key(), 0.3, t0() + Duration::minutes(3), Provenance::default_value());
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.3);
    }

    #[test]
    fn test_partial_invalidate() {
        let mut store = CalibrationStore::new("test");
        store.add_value(amp_key(), 0.1, t0(), Provenance::default_value());
        store.add_value(amp_key(), 0.2, t0() + Duration::minutes(2), Provenance::default_value());
        store.invalidate(&amp_key(), t0() + Duration::minutes(1));

        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.2);
        assert!(
            store
                .get_current(&amp_key(), Some(t0() + Duration::seconds(30)))
                .is_err()
        );
    }

    #[test]
    fn test_invalidated_qubit_value_does_not_revert_to_default() {
        let mut store = CalibrationStore::new("test");
        let global = ParameterKey::default_scope("amp", Some("x12"));
        store.add_value(global, 0.14, t0(), Provenance::default_value());
        store.add_value(amp_key(), 0.16, t0() + Duration::minutes(1), Provenance::default_value());
        store.invalidate(&amp_key(), t0() + Duration::minutes(2));

        let err = store.get_current(&amp_key(), None).unwrap_err();
        assert!(matches!(err, StoreError::MissingParameter { .. }));

        // before the qubit had its own value, the default still applies
        assert_eq!(
            store
                .get_current(&amp_key(), Some(t0() + Duration::seconds(30)))
                .unwrap(),
            0.14
        );

        store.add_value(amp_key(), 0.15, t0() + Duration::minutes(3), Provenance::default_value());
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.15);
    }

    #[test]
    fn test_default_scope_fallback() {
        let mut store = CalibrationStore::new("test");
        let global = ParameterKey::default_scope("amp", Some("x12"));
        store.add_value(global, 0.14, t0(), Provenance::default_value());

        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.14);

        store.add_value(amp_key(), 0.16, t0(), Provenance::default_value());
        assert_eq!(store.get_current(&amp_key(), None).unwrap(), 0.16);

        let other = ParameterKey::qubit("amp", 0, Some("sx12"));
        assert!(store.get_current(&other, None).is_err());
    }

    #[test]
    fn test_from_backend_blacklists_isolated_qubit() {
        let caps = Capabilities::simulator(3)
            .with_topology(Topology::custom(vec![(0, 1), (1, 0)]))
            .with_updated_at(t0());
        let store = CalibrationStore::from_backend(&caps, &TemplateLibrary::default());

        assert_eq!(store.qutrit_channel(0).unwrap(), Channel::Control(0));
        assert_eq!(store.qutrit_channel(1).unwrap(), Channel::Control(1));
        assert!(store.is_blacklisted(2));
        assert!(matches!(
            store.qutrit_channel(2),
            Err(StoreError::TopologyGap { qubit: 2 })
        ));

        // Defaults are still registered for the blacklisted qubit.
        let f = store
            .get_current(&ParameterKey::qubit("drive_freq", 2, None), None)
            .unwrap();
        assert!((f - 5.0e9).abs() < 1.0);
    }

    #[test]
    fn test_from_backend_registers_defaults() {
        let caps = Capabilities::simulator(2).with_updated_at(t0());
        let store = CalibrationStore::from_backend(&caps, &TemplateLibrary::default());

        let amp = store
            .get_current(&ParameterKey::qubit("amp", 1, Some("x12")), None)
            .unwrap();
        assert_eq!(amp, 0.14);
        let alpha = store
            .get_current(&ParameterKey::qubit("α", 1, None), None)
            .unwrap();
        assert_eq!(alpha, -330e6);
        assert!(store.blacklist().is_empty());
        assert!(!store.parameters_table().is_empty());
    }
}
