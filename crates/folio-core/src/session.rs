//! Reading sessions
//!
//! [`ContentSession`] is the per-Content-Unit state: one rewriter with its
//! own latch, and the mutation watch installed after the initial pass.
//!
//! [`ReaderSession`] drives one open document. It feeds engine events to
//! content sessions and the position tracker, schedules scroll restoration
//! after content-ready, and routes navigation through the [`Navigator`].
//!
//! Time is passed in explicitly (`now`) so the host decides how the restore
//! grace delay is waited out.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::catalog::Route;
use crate::engine::{ContentUnit, EngineEvent, RenderingEngine, Step, Theme, UnitId};
use crate::models::{DocumentId, Location};
use crate::navigation::Navigator;
use crate::position::PositionTracker;
use crate::rewriter::{RewriteStats, Rewriter};
use crate::rules::RuleSet;
use crate::tree::ContentTree;
use crate::watcher::{MutationWatcher, WatchHandle};

/// Rewriting state for one rendered unit
#[derive(Debug)]
pub struct ContentSession {
    unit: UnitId,
    tree: ContentTree,
    rewriter: Rc<Rewriter>,
    watch: WatchHandle,
}

impl ContentSession {
    /// Rewrite the unit, then start watching it
    ///
    /// The full pass finishes (and its latch is released) before the watch
    /// is installed, so the pass is never seen as an external change.
    pub fn attach(unit: ContentUnit, rules: Rc<RuleSet>) -> Self {
        let rewriter = Rc::new(Rewriter::new(rules));
        let rewritten = rewriter.apply(&unit.tree, unit.root);
        debug!("Initial pass on unit {:?} rewrote {} node(s)", unit.id, rewritten);

        let weak_tree = unit.tree.downgrade();
        let on_change = Rc::clone(&rewriter);
        let watch = MutationWatcher::install(&unit.tree, unit.root, rewriter.latch(), move |node| {
            if let Some(tree) = weak_tree.upgrade() {
                on_change.apply(&tree, node);
            }
        });

        Self {
            unit: unit.id,
            tree: unit.tree,
            rewriter,
            watch,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn stats(&self) -> RewriteStats {
        self.rewriter.stats()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_live()
    }

    /// Deliver queued mutation records for this unit
    pub fn flush(&self) -> usize {
        self.tree.deliver_pending()
    }

    pub fn dispose(&mut self) {
        self.watch.dispose();
    }
}

/// Settings for a reading session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Delay after content-ready before the scroll offset is restored
    pub restore_grace: Duration,
    pub theme: Theme,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            restore_grace: Duration::from_millis(200),
            theme: Theme::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    offset: u32,
    due_at: Option<Instant>,
}

/// One open document
pub struct ReaderSession<E: RenderingEngine> {
    document_id: DocumentId,
    engine: E,
    tracker: PositionTracker,
    navigator: Navigator,
    rules: Rc<RuleSet>,
    units: Vec<ContentSession>,
    pending: Option<PendingRestore>,
    restore_grace: Duration,
    /// Set once the reader left for the catalog
    left: bool,
}

impl<E: RenderingEngine> ReaderSession<E> {
    /// Open `document_id` on `engine`, resuming from the saved position
    pub fn open(
        document_id: DocumentId,
        mut engine: E,
        mut tracker: PositionTracker,
        rules: Rc<RuleSet>,
        options: SessionOptions,
    ) -> Self {
        engine.apply_theme(&options.theme);

        let mut pending = None;
        match tracker.restore(&document_id) {
            Some(position) => {
                info!(
                    "Resuming {} at {} (offset {})",
                    document_id, position.location, position.scroll_offset
                );
                if position.scroll_offset > 0 {
                    tracker.begin_restore(&document_id);
                    pending = Some(PendingRestore {
                        offset: position.scroll_offset,
                        due_at: None,
                    });
                }
                engine.display(Some(&position.location));
            }
            None => {
                info!("Opening {} at the start", document_id);
                engine.display(None);
            }
        }

        Self {
            navigator: Navigator::new(document_id.clone()),
            document_id,
            engine,
            tracker,
            rules,
            units: Vec::new(),
            pending,
            restore_grace: options.restore_grace,
            left: false,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn units(&self) -> &[ContentSession] {
        &self.units
    }

    pub fn is_restoring(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle every event the engine has queued, then deliver mutations
    ///
    /// Units the engine renders without having announced them (or dropped
    /// without an unload) are picked up from
    /// [`RenderingEngine::current_contents`]. Returns the number of engine
    /// events handled.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(event) = self.engine.poll_event() {
            self.handle(event, now);
            handled += 1;
        }
        if !self.left {
            self.sync_units(now);
        }
        for unit in &self.units {
            unit.flush();
        }
        handled
    }

    pub fn handle(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::ContentReady(unit) => self.on_content_ready(unit, now),
            EngineEvent::ContentUnloaded(id) => self.on_content_unloaded(id),
            EngineEvent::LocationChanged(location) => self.on_location_changed(&location),
            EngineEvent::Scrolled => self.on_scrolled(),
        }
    }

    fn on_content_ready(&mut self, unit: ContentUnit, now: Instant) {
        self.on_content_unloaded(unit.id);
        self.units.push(ContentSession::attach(unit, Rc::clone(&self.rules)));

        if let Some(pending) = self.pending.as_mut() {
            if pending.due_at.is_none() {
                pending.due_at = Some(now + self.restore_grace);
                debug!("Scroll restore scheduled in {:?}", self.restore_grace);
            }
        }
    }

    fn on_content_unloaded(&mut self, id: UnitId) {
        if let Some(index) = self.units.iter().position(|u| u.unit() == id) {
            let mut unit = self.units.remove(index);
            unit.dispose();
        }
    }

    fn sync_units(&mut self, now: Instant) {
        let live = self.engine.current_contents();

        let gone: Vec<UnitId> = self
            .units
            .iter()
            .map(ContentSession::unit)
            .filter(|id| !live.iter().any(|unit| unit.id == *id))
            .collect();
        for id in gone {
            debug!("Unit {:?} went away unannounced", id);
            self.on_content_unloaded(id);
        }

        for unit in live {
            if !self.units.iter().any(|u| u.unit() == unit.id) {
                debug!("Unit {:?} rendered unannounced", unit.id);
                self.on_content_ready(unit, now);
            }
        }
    }

    fn on_location_changed(&mut self, location: &Location) {
        let engine = &self.engine;
        self.tracker
            .capture(&self.document_id, location, || engine.scroll_offset());
    }

    fn on_scrolled(&mut self) {
        if let Some(location) = self.engine.current_location() {
            self.on_location_changed(&location);
        }
    }

    /// When the pending scroll restore becomes due, if one is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.and_then(|p| p.due_at)
    }

    /// Apply the pending scroll restore if it is due
    ///
    /// Returns `true` when a restore was applied.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        match pending.due_at {
            Some(due) if due <= now => {
                self.engine.scroll_to(pending.offset);
                self.pending = None;
                self.tracker.finish_restore(&self.document_id);
                info!("Restored scroll offset {} for {}", pending.offset, self.document_id);
                true
            }
            _ => false,
        }
    }

    fn cancel_restore(&mut self) {
        if self.pending.take().is_some() {
            debug!("Navigation cancelled pending scroll restore");
            self.tracker.finish_restore(&self.document_id);
        }
    }

    pub fn next(&mut self) -> Step {
        self.cancel_restore();
        self.navigator.next(&mut self.engine, &mut self.tracker)
    }

    pub fn previous(&mut self) -> Step {
        self.cancel_restore();
        self.navigator.previous(&mut self.engine, &mut self.tracker)
    }

    /// Leave the document: save where the reader is and tear down content
    pub fn go_home(&mut self) -> Route {
        self.left = true;
        self.cancel_restore();
        self.on_scrolled();
        for unit in self.units.iter_mut() {
            unit.dispose();
        }
        self.units.clear();
        Route::Home
    }

    /// Tear the session down, handing back the tracker for reuse
    pub fn close(mut self) -> PositionTracker {
        self.go_home();
        self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSpec;
    use crate::tree::TextTree;

    fn rules() -> Rc<RuleSet> {
        Rc::new(RuleSet::from_specs(&[RuleSpec::new("saya", "aku"), RuleSpec::new("Anda", "Kamu")]).unwrap())
    }

    #[test]
    fn test_attach_rewrites_then_watches() {
        let tree = ContentTree::new("body");
        let text = tree.create_text("saya dan Anda");
        tree.append_child(tree.root(), text).unwrap();

        let session = ContentSession::attach(ContentUnit::new(UnitId(1), tree.clone()), rules());

        assert_eq!(tree.text(text).unwrap(), "aku dan Kamu");
        assert!(session.is_watching());
        assert_eq!(session.flush(), 0);

        tree.set_text(text, "saya lagi").unwrap();
        assert_eq!(session.flush(), 1);
        assert_eq!(tree.text(text).unwrap(), "aku lagi");
        assert_eq!(session.stats().passes, 2);
    }

    #[test]
    fn test_dispose_releases_observer() {
        let tree = ContentTree::new("body");
        let mut session = ContentSession::attach(ContentUnit::new(UnitId(1), tree.clone()), rules());
        assert_eq!(tree.observer_count(), 1);

        session.dispose();
        session.dispose();
        assert_eq!(tree.observer_count(), 0);
        assert!(!session.is_watching());
    }

    #[test]
    fn test_units_have_independent_latches() {
        let a = ContentTree::new("body");
        let b = ContentTree::new("body");
        let ta = a.create_text("x");
        let tb = b.create_text("x");
        a.append_child(a.root(), ta).unwrap();
        b.append_child(b.root(), tb).unwrap();
        let sa = ContentSession::attach(ContentUnit::new(UnitId(1), a.clone()), rules());
        let sb = ContentSession::attach(ContentUnit::new(UnitId(2), b.clone()), rules());

        a.set_text(ta, "saya").unwrap();
        b.set_text(tb, "Anda").unwrap();
        sa.flush();
        sb.flush();

        assert_eq!(a.text(ta).unwrap(), "aku");
        assert_eq!(b.text(tb).unwrap(), "Kamu");
    }
}
