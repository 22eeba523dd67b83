//! Reading position tracking
//!
//! Captures and restores where the reader is in a document: the engine's
//! [`Location`] plus the scroll offset inside the view rendered for it.
//! Values are stored per document id in the durability tier chosen when the
//! tracker is created.
//!
//! While a restore is in progress for a document, captures for it are
//! skipped, so the scroll events the restore itself causes cannot overwrite
//! the value being restored.
//!
//! Storage failures are logged and absorbed: losing a reading position is
//! never worth interrupting the reader.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::models::{DocumentId, Location, ReadingPosition};
use crate::storage::{Namespace, StorageKey, StorageResult, Tier, TieredStore};

pub struct PositionTracker {
    store: TieredStore,
    tier: Tier,
    restoring: HashSet<DocumentId>,
}

impl PositionTracker {
    pub fn new(store: TieredStore, tier: Tier) -> Self {
        Self {
            store,
            tier,
            restoring: HashSet::new(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    fn key(&self, namespace: Namespace, document_id: &DocumentId) -> StorageKey {
        StorageKey::new(namespace, document_id, self.tier)
    }

    /// Persist `location` and the current scroll offset for `document_id`
    ///
    /// The offset provider is only called when the capture goes ahead.
    /// Returns `false` when the capture was skipped because a restore is in
    /// progress or the write failed.
    pub fn capture<F>(&mut self, document_id: &DocumentId, location: &Location, scroll_offset: F) -> bool
    where
        F: FnOnce() -> u32,
    {
        if self.is_restoring(document_id) {
            debug!("Skipping capture for {} while restoring", document_id);
            return false;
        }

        let offset = scroll_offset();
        let result = self.write(document_id, location, offset);
        absorb(result, document_id, "capture")
    }

    /// Store `location` and `offset` as a pair
    ///
    /// When the offset cannot be written, the previous location is put back
    /// so no location is left paired with another location's offset. If
    /// that fails too, the offset is dropped and the location restores at
    /// the top.
    fn write(&mut self, document_id: &DocumentId, location: &Location, offset: u32) -> StorageResult<()> {
        let location_key = self.key(Namespace::Location, document_id);
        let scroll_key = self.key(Namespace::Scroll, document_id);
        let previous = self.store.get(&location_key);

        self.store.set(&location_key, location.as_str())?;
        let err = match self.store.set(&scroll_key, &offset.to_string()) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let rolled_back = match previous {
            Ok(Some(previous)) => self.store.set(&location_key, &previous),
            Ok(None) => self.store.remove(&location_key),
            Err(e) => Err(e),
        };
        if let Err(rollback_err) = rolled_back {
            debug!("Could not put back location for {}: {}", document_id, rollback_err);
            if let Err(e) = self.store.remove(&scroll_key) {
                warn!("Scroll offset for {} may not match its location: {}", document_id, e);
            }
        }
        Err(err)
    }

    /// Read the persisted position for `document_id`
    ///
    /// Returns `None` when nothing was stored or the stored values do not
    /// parse (empty location, negative or non-numeric offset). A stored
    /// location without an offset restores at offset 0.
    pub fn restore(&self, document_id: &DocumentId) -> Option<ReadingPosition> {
        let location = match self.store.get(&self.key(Namespace::Location, document_id)) {
            Ok(Some(raw)) if !raw.trim().is_empty() => Location::new(raw),
            Ok(_) => return None,
            Err(e) => {
                warn!("Could not read location for {}: {}", document_id, e);
                return None;
            }
        };

        let scroll_offset = match self.store.get(&self.key(Namespace::Scroll, document_id)) {
            Ok(None) => 0,
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(offset) => offset,
                Err(_) => {
                    debug!("Ignoring malformed scroll offset {:?} for {}", raw, document_id);
                    return None;
                }
            },
            Err(e) => {
                warn!("Could not read scroll offset for {}: {}", document_id, e);
                return None;
            }
        };

        Some(ReadingPosition::new(location, scroll_offset))
    }

    /// Persist a scroll offset of 0, used when the chapter changes
    pub fn reset_scroll(&mut self, document_id: &DocumentId) {
        let key = self.key(Namespace::Scroll, document_id);
        let result = self.store.set(&key, "0");
        absorb(result, document_id, "scroll reset");
    }

    /// Start suppressing captures for `document_id`
    pub fn begin_restore(&mut self, document_id: &DocumentId) {
        self.restoring.insert(document_id.clone());
    }

    /// Resume captures for `document_id`
    pub fn finish_restore(&mut self, document_id: &DocumentId) {
        self.restoring.remove(document_id);
    }

    pub fn is_restoring(&self, document_id: &DocumentId) -> bool {
        self.restoring.contains(document_id)
    }

    /// Drop the persisted position for `document_id`
    pub fn forget(&mut self, document_id: &DocumentId) {
        let location_key = self.key(Namespace::Location, document_id);
        let scroll_key = self.key(Namespace::Scroll, document_id);
        let result = self
            .store
            .remove(&location_key)
            .and_then(|_| self.store.remove(&scroll_key));
        absorb(result, document_id, "forget");
    }

    /// End the reading session, clearing the session tier
    pub fn end_session(&mut self) {
        self.restoring.clear();
        if let Err(e) = self.store.end_session() {
            warn!("Could not clear session positions: {}", e);
        }
    }
}

fn absorb(result: StorageResult<()>, document_id: &DocumentId, action: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.is_recoverable() => {
            warn!("Position {} failed for {}: {}", action, document_id, e);
            if let Some(hint) = e.recovery_suggestion() {
                debug!("{}", hint);
            }
            false
        }
        Err(e) => {
            error!("Position {} failed for {}: {}", action, document_id, e);
            false
        }
    }
}
