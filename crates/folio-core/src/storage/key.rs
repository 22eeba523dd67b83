//! Typed storage keys
//!
//! Every persisted value is addressed by a namespace, a document id and a
//! durability tier. Each tier has its own backing store, so the same
//! encoded key in two tiers never refers to the same entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::DocumentId;

/// How long a persisted value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Cleared when the reading session ends
    Session,
    /// Survives across sessions
    #[default]
    Durable,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Session => f.write_str("session"),
            Tier::Durable => f.write_str("durable"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(Tier::Session),
            "durable" => Ok(Tier::Durable),
            other => Err(format!("unknown tier '{}' (expected 'session' or 'durable')", other)),
        }
    }
}

/// Kind of value stored under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Location,
    Scroll,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Location => "location",
            Namespace::Scroll => "scroll",
        }
    }
}

/// Fully qualified key of a persisted value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub namespace: Namespace,
    pub document_id: DocumentId,
    pub tier: Tier,
}

impl StorageKey {
    pub fn new(namespace: Namespace, document_id: &DocumentId, tier: Tier) -> Self {
        Self {
            namespace,
            document_id: document_id.clone(),
            tier,
        }
    }

    /// Key inside the tier's store: `<namespace>:<document id>`
    pub fn encode(&self) -> String {
        format!("{}:{}", self.namespace.as_str(), self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let id = DocumentId::from("y0v0");
        assert_eq!(
            StorageKey::new(Namespace::Location, &id, Tier::Session).encode(),
            "location:y0v0"
        );
        assert_eq!(
            StorageKey::new(Namespace::Scroll, &id, Tier::Durable).encode(),
            "scroll:y0v0"
        );
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("session".parse::<Tier>().unwrap(), Tier::Session);
        assert_eq!("Durable".parse::<Tier>().unwrap(), Tier::Durable);
        assert!("forever".parse::<Tier>().is_err());
        assert_eq!(Tier::default(), Tier::Durable);
    }
}
