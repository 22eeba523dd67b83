//! Position command handlers
//!
//! Only the durable tier outlives a reading session, so that is the tier
//! these commands look at.

use anyhow::Result;

use folio_core::{Config, DocumentId, PositionTracker, Tier, TieredStore};

use crate::output::Output;

fn tracker(config: &Config) -> Result<PositionTracker> {
    let store = TieredStore::open(config.positions_path())?;
    Ok(PositionTracker::new(store, Tier::Durable))
}

/// Show the saved position of a document
pub fn show(config: &Config, id: String, output: &Output) -> Result<()> {
    let id = DocumentId::new(id);
    let position = tracker(config)?.restore(&id);
    output.print_position(&id, position.as_ref());
    Ok(())
}

/// Forget the saved position of a document
pub fn clear(config: &Config, id: String, output: &Output) -> Result<()> {
    let id = DocumentId::new(id);
    tracker(config)?.forget(&id);
    output.success(&format!("Cleared position for {}", id));
    Ok(())
}
