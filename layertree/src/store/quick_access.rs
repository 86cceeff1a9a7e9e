//! Consent-gated persistence of the quick-access favorites set.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::kv::KeyValueStore;
use crate::id::LayerId;

/// Durable-store key under which the quick-access set is persisted.
pub const QUICK_ACCESS_KEY: &str = "quickAccessLayers";

/// The host's functional-storage consent flag.
///
/// Consent can change at runtime (the user flips a cookie banner switch),
/// so it is re-checked before every load and every persist.
pub trait ConsentGate: Send + Sync {
    /// Whether functional storage may be read and written right now.
    fn functional_storage_allowed(&self) -> bool;
}

/// Fixed consent decision, for tests and embedding hosts without a banner.
#[derive(Debug, Clone, Copy)]
pub struct StaticConsent(bool);

impl StaticConsent {
    /// Consent permanently granted.
    pub fn granted() -> Self {
        Self(true)
    }

    /// Consent permanently withheld.
    pub fn withheld() -> Self {
        Self(false)
    }
}

impl ConsentGate for StaticConsent {
    fn functional_storage_allowed(&self) -> bool {
        self.0
    }
}

/// Loads and persists the quick-access set through a key-value store.
///
/// Persistence is strictly best-effort: withheld consent or a store failure
/// skips the write (logged, never surfaced) and the in-memory registry
/// state stays authoritative for the session. Every persist writes the
/// full set, not a delta.
pub struct QuickAccessStore {
    store: Arc<dyn KeyValueStore>,
    consent: Arc<dyn ConsentGate>,
}

impl QuickAccessStore {
    /// Create a quick-access store over a key-value store and consent gate.
    pub fn new(store: Arc<dyn KeyValueStore>, consent: Arc<dyn ConsentGate>) -> Self {
        Self { store, consent }
    }

    /// Load the persisted set, if consent is granted and a valid set exists.
    pub fn load(&self) -> Option<BTreeSet<LayerId>> {
        if !self.consent.functional_storage_allowed() {
            debug!("quick-access load skipped: functional storage consent withheld");
            return None;
        }
        let raw = match self.store.get(QUICK_ACCESS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(%error, "failed to read persisted quick-access set");
                return None;
            }
        };
        match serde_json::from_str::<BTreeSet<LayerId>>(&raw) {
            Ok(set) => Some(set),
            Err(error) => {
                warn!(%error, "ignoring unparsable persisted quick-access set");
                None
            }
        }
    }

    /// Persist the full set. Returns whether a write actually happened.
    pub fn persist(&self, set: &BTreeSet<LayerId>) -> bool {
        if !self.consent.functional_storage_allowed() {
            debug!("quick-access persist skipped: functional storage consent withheld");
            return false;
        }
        let encoded = match serde_json::to_string(set) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(%error, "failed to encode quick-access set");
                return false;
            }
        };
        match self.store.set(QUICK_ACCESS_KEY, &encoded) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "failed to persist quick-access set");
                false
            }
        }
    }
}
