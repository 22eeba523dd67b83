//! Rendering engine interface
//!
//! Folio does not lay out or paginate documents. It drives an external
//! engine through [`RenderingEngine`] and reacts to the [`EngineEvent`]s
//! the engine queues: content becoming ready or going away, location
//! changes and scrolling.

use serde::{Deserialize, Serialize};

use crate::models::Location;
use crate::tree::{ContentTree, NodeId};

/// Identifier of one rendered Content Unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

/// A rendered section handed over by the engine
///
/// The engine owns its lifecycle; Folio only reads and rewrites its text.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    pub id: UnitId,
    pub tree: ContentTree,
    /// Node whose subtree holds the readable text (the `body`)
    pub root: NodeId,
}

impl ContentUnit {
    pub fn new(id: UnitId, tree: ContentTree) -> Self {
        let root = tree.root();
        Self { id, tree, root }
    }
}

/// Notifications produced by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A unit finished its initial layout
    ContentReady(ContentUnit),
    /// A unit was torn down
    ContentUnloaded(UnitId),
    LocationChanged(Location),
    /// The current view scrolled
    Scrolled,
}

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The engine moved to new content
    Moved,
    /// There is no more content in that direction
    Boundary,
}

/// Presentation settings handed to the engine unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: String,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            line_height: default_line_height(),
        }
    }
}

fn default_font_family() -> String {
    "Georgia, serif".to_string()
}

fn default_font_size() -> String {
    "1.25rem".to_string()
}

fn default_line_height() -> f32 {
    1.8
}

/// The rendering engine Folio drives
///
/// `go_prev` and `go_next` return once the new location is current;
/// `scroll_to` applies to the view of the current location, so an engine
/// that lays out asynchronously must hold the request until that view
/// exists.
pub trait RenderingEngine {
    /// Show `location`, or the start of the document for `None`.
    ///
    /// A location the engine cannot resolve falls back to the start.
    fn display(&mut self, location: Option<&Location>);

    fn current_location(&self) -> Option<Location>;

    /// Content units currently rendered
    fn current_contents(&self) -> Vec<ContentUnit>;

    fn go_next(&mut self) -> Step;

    fn go_prev(&mut self) -> Step;

    /// Scroll offset of the current view
    fn scroll_offset(&self) -> u32;

    fn scroll_to(&mut self, offset: u32);

    /// Next queued notification, if any
    fn poll_event(&mut self) -> Option<EngineEvent>;

    fn apply_theme(&mut self, theme: &Theme) {
        let _ = theme;
    }
}
