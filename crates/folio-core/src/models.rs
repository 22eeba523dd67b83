//! Data models for Folio
//!
//! Defines the identifiers and values the reader persists: document ids,
//! opaque engine locations, reading positions and catalog entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a document in the catalog (e.g. `y0v0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Structural position handle issued by the rendering engine
///
/// Folio never looks inside a location; it only stores it and hands it
/// back to the engine on restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A location plus the scroll offset inside the view rendered for it
///
/// The offset is only meaningful for this exact location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub location: Location,
    pub scroll_offset: u32,
}

impl ReadingPosition {
    pub fn new(location: Location, scroll_offset: u32) -> Self {
        Self {
            location,
            scroll_offset,
        }
    }

    /// Position at the top of the view for `location`
    pub fn at_top(location: Location) -> Self {
        Self::new(location, 0)
    }
}

/// A readable document known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Identifier used in routes and storage keys
    pub id: DocumentId,
    /// Display name
    pub name: String,
    /// Path of the document file handed to the rendering engine
    pub path: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            name: name.into(),
            path: path.into(),
        }
    }
}
