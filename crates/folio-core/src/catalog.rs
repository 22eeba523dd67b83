//! Document catalog
//!
//! Maps document ids to display names and file paths. Opening an id the
//! catalog does not know sends the reader back home instead of failing.

use serde::{Deserialize, Serialize};

use crate::models::{CatalogEntry, DocumentId};

/// Where the shell should go next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The catalog listing
    Home,
    /// The reading surface for one document
    Read(CatalogEntry),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, id: &DocumentId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Route for opening `id`: its reading surface, or home when unknown
    pub fn resolve(&self, id: &DocumentId) -> Route {
        match self.lookup(id) {
            Some(entry) => Route::Read(entry.clone()),
            None => Route::Home,
        }
    }
}
