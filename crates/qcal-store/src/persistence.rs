//! JSON persistence for calibration stores.
//!
//! The snapshot is the raw arena in insertion order plus the tombstones,
//! so a loaded store projects exactly the same current values as the live
//! one did at save time.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::key::ParameterKey;
use crate::store::{CalibrationStore, Entry, Invalidation};

/// On-disk form of a [`CalibrationStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Backend name.
    pub backend: String,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Arena records in insertion order.
    pub entries: Vec<Entry>,
    /// Invalidation tombstones.
    #[serde(default)]
    pub invalidations: Vec<Invalidation>,
    /// Qubit to control-line mapping.
    pub control_channels: BTreeMap<u32, u32>,
    /// Qubits without a usable control line.
    #[serde(default)]
    pub blacklist: BTreeSet<u32>,
}

impl CalibrationStore {
    /// Take a snapshot of the full store.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            backend: self.backend.clone(),
            saved_at: Utc::now(),
            entries: self.entries.clone(),
            invalidations: self.invalidations.clone(),
            control_channels: self.control_channels.clone(),
            blacklist: self.blacklist.clone(),
        }
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut index: FxHashMap<ParameterKey, Vec<usize>> = FxHashMap::default();
        for (i, entry) in snapshot.entries.iter().enumerate() {
            index.entry(entry.key.clone()).or_default().push(i);
        }

        let arena_len = snapshot.entries.len();
        let invalidations = snapshot
            .invalidations
            .into_iter()
            .map(|mut inv| {
                if inv.seq > arena_len {
                    warn!(
                        "Invalidation of {} points past the end of the arena; clamping",
                        inv.key
                    );
                    inv.seq = arena_len;
                }
                inv
            })
            .collect();

        Self {
            backend: snapshot.backend,
            entries: snapshot.entries,
            index,
            invalidations,
            control_channels: snapshot.control_channels,
            blacklist: snapshot.blacklist,
        }
    }

    /// Write the store to a pretty-printed JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)?;
        debug!("Saved {} records to {:?}", self.len(), path);
        Ok(())
    }

    /// Load a store from a JSON file written by [`CalibrationStore::save`].
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content).inspect_err(|e| {
            warn!("Failed to parse calibration file {:?}: {}", path, e);
        })?;
        debug!(
            "Loaded {} records from {:?} (saved {})",
            snapshot.entries.len(),
            path,
            snapshot.saved_at
        );
        Ok(Self::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::key::Provenance;
    use crate::templates::TemplateLibrary;
    use chrono::Duration;
    use qcal_hal::{Capabilities, Topology};

    #[test]
    fn test_save_load_roundtrip() {
        let caps = Capabilities::simulator(3).with_topology(Topology::custom(vec![(0, 1), (1, 0)]));
        let mut store = CalibrationStore::from_backend(&caps, &TemplateLibrary::default());

        let key = ParameterKey::qubit("amp", 0, Some("x12"));
        let t = caps.updated_at + Duration::minutes(1);
        store.add_value(
            key.clone(),
            0.151,
            t,
            Provenance::from_source("rough_amplitude").with_result("Ω12", 3.31),
        );
        store.add_value(key.clone(), 0.152, t + Duration::minutes(1), Provenance::default_value());
        store.invalidate(&key, t + Duration::seconds(90));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibrations.json");
        store.save(&path).unwrap();
        let loaded = CalibrationStore::load(&path).unwrap();

        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.backend(), store.backend());
        assert_eq!(loaded.control_channels(), store.control_channels());
        assert!(loaded.is_blacklisted(2));

        for k in store.keys() {
            let live = store.get_current(k, None).ok();
            let restored = loaded.get_current(k, None).ok();
            assert_eq!(live, restored, "mismatch for {k}");
        }
        // fully invalidated qubit value: no fallback to the 0.14 default
        assert!(matches!(
            loaded.get_current(&key, None),
            Err(StoreError::MissingParameter { .. })
        ));
        assert!(loaded.get_current(&key, Some(t)).is_err());
        assert_eq!(
            loaded.get_current(&key, Some(caps.updated_at)).unwrap(),
            store.get_current(&key, Some(caps.updated_at)).unwrap()
        );
        assert_eq!(
            loaded.parameter_history(&key)[0].provenance.result_name.as_deref(),
            Some("Ω12")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CalibrationStore::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CalibrationStore::load(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
