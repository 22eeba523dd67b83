//! Navigation facade
//!
//! Turns "next" and "previous" into engine calls while keeping the stored
//! position consistent: the outgoing position is captured before moving,
//! and the scroll offset is reset to 0 once the chapter has changed.

use tracing::debug;

use crate::engine::{RenderingEngine, Step};
use crate::models::DocumentId;
use crate::position::PositionTracker;

#[derive(Debug, Clone)]
pub struct Navigator {
    document_id: DocumentId,
}

impl Navigator {
    pub fn new(document_id: DocumentId) -> Self {
        Self { document_id }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Move forward; a no-op at the last content unit
    pub fn next<E>(&self, engine: &mut E, tracker: &mut PositionTracker) -> Step
    where
        E: RenderingEngine + ?Sized,
    {
        self.capture_outgoing(engine, tracker);
        match engine.go_next() {
            Step::Moved => {
                tracker.reset_scroll(&self.document_id);
                Step::Moved
            }
            Step::Boundary => {
                debug!("Already at the end of {}", self.document_id);
                Step::Boundary
            }
        }
    }

    /// Move back and re-enter the previous chapter at its top
    pub fn previous<E>(&self, engine: &mut E, tracker: &mut PositionTracker) -> Step
    where
        E: RenderingEngine + ?Sized,
    {
        self.capture_outgoing(engine, tracker);
        match engine.go_prev() {
            Step::Moved => {
                engine.scroll_to(0);
                tracker.reset_scroll(&self.document_id);
                Step::Moved
            }
            Step::Boundary => {
                debug!("Already at the start of {}", self.document_id);
                Step::Boundary
            }
        }
    }

    fn capture_outgoing<E>(&self, engine: &E, tracker: &mut PositionTracker)
    where
        E: RenderingEngine + ?Sized,
    {
        if let Some(location) = engine.current_location() {
            tracker.capture(&self.document_id, &location, || engine.scroll_offset());
        }
    }
}
