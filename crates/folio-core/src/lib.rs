//! Folio Core Library
//!
//! This crate provides the core of Folio, a reader that rewrites the
//! pronouns of a translated text while it is being read and remembers where
//! the reader stopped.
//!
//! # Architecture
//!
//! - **Rendering engine**: consumed through the [`RenderingEngine`] trait;
//!   it owns layout, pagination and the rendered content trees.
//! - **Rewriter + watcher**: one pair per rendered Content Unit. The
//!   rewriter applies the [`RuleSet`] to every text node; the watcher
//!   re-runs it on nodes changed after the initial pass, ignoring the
//!   rewriter's own writes.
//! - **Position tracker**: persists location and scroll offset per document
//!   in a session or durable tier.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let tracker = PositionTracker::new(TieredStore::open(&config.positions_path())?, config.tier);
//! let mut session = ReaderSession::open(id, engine, tracker, Rc::new(config.rule_set()?), options);
//!
//! loop {
//!     session.pump(Instant::now());
//!     session.tick(Instant::now());
//! }
//! ```
//!
//! # Modules
//!
//! - `tree`: Content trees and mutation observation
//! - `rules`: Whole-word substitution rules
//! - `rewriter`: Applies rules to a tree
//! - `watcher`: Re-applies rules to externally changed nodes
//! - `position`: Reading position capture and restore
//! - `storage`: Session and durable key-value tiers
//! - `engine`: The rendering engine interface
//! - `navigation`: Next / previous with position bookkeeping
//! - `session`: Wires an engine to all of the above
//! - `catalog`: Readable documents and routing
//! - `config`: Application configuration

pub mod catalog;
pub mod config;
pub mod engine;
pub mod models;
pub mod navigation;
pub mod position;
pub mod rewriter;
pub mod rules;
pub mod session;
pub mod storage;
pub mod tree;
pub mod watcher;

pub use catalog::{Catalog, Route};
pub use config::Config;
pub use engine::{ContentUnit, EngineEvent, RenderingEngine, Step, Theme, UnitId};
pub use models::{CatalogEntry, DocumentId, Location, ReadingPosition};
pub use navigation::Navigator;
pub use position::PositionTracker;
pub use rewriter::{RewriteLatch, RewriteStats, Rewriter};
pub use rules::{RuleError, RuleSet, RuleSpec, SubstitutionRule};
pub use session::{ContentSession, ReaderSession, SessionOptions};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, Tier, TieredStore};
pub use tree::{ContentTree, MutationRecord, NodeId, NodeKind, TextTree, TreeError};
pub use watcher::{MutationWatcher, WatchHandle};
