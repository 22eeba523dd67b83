//! Mutation watcher
//!
//! Keeps a rendered Content Unit rewritten while something else (a page
//! translator, a late-loading script) keeps changing it. The watcher
//! subscribes to a [`MutationSource`] below a root node and reports each
//! changed text node, and each added subtree, to a callback.
//!
//! Writes made by the rewriter are recognised through the shared
//! [`RewriteLatch`] and never reported.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::rewriter::RewriteLatch;
use crate::tree::{MutationListener, MutationRecord, MutationSource, NodeId, Subscription, TreeError};

struct WatchListener<F> {
    latch: RewriteLatch,
    live: Rc<Cell<bool>>,
    on_change: RefCell<F>,
}

impl<F: FnMut(NodeId)> MutationListener for WatchListener<F> {
    fn accepts(&self, _record: &MutationRecord) -> bool {
        self.live.get() && !self.latch.is_engaged()
    }

    fn on_batch(&self, batch: &[MutationRecord]) {
        if !self.live.get() || self.latch.is_engaged() {
            return;
        }
        // Nested delivery from inside the callback is dropped
        let Ok(mut on_change) = self.on_change.try_borrow_mut() else {
            return;
        };

        for record in batch {
            if !self.live.get() {
                return;
            }
            match record {
                MutationRecord::CharacterData { target } => (on_change)(*target),
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        if !self.live.get() {
                            return;
                        }
                        (on_change)(*node);
                    }
                }
            }
        }
    }
}

/// Installs mutation watches
pub struct MutationWatcher;

impl MutationWatcher {
    /// Watch `root` and report changed nodes to `on_change`
    ///
    /// When the source cannot observe mutations the returned handle is
    /// inert: the content keeps whatever the initial pass produced.
    pub fn install<S, F>(source: &S, root: NodeId, latch: RewriteLatch, on_change: F) -> WatchHandle
    where
        S: MutationSource + ?Sized,
        F: FnMut(NodeId) + 'static,
    {
        let live = Rc::new(Cell::new(true));
        let listener = Rc::new(WatchListener {
            latch,
            live: Rc::clone(&live),
            on_change: RefCell::new(on_change),
        });

        match source.subscribe(root, listener) {
            Ok(subscription) => {
                debug!("Watching mutations under {:?}", root);
                WatchHandle {
                    live,
                    subscription: Some(subscription),
                }
            }
            Err(TreeError::ObservationUnsupported) => {
                debug!("Mutation observation unavailable, content will not be re-rewritten");
                WatchHandle::inert()
            }
            Err(e) => {
                warn!("Could not watch {:?}: {}", root, e);
                WatchHandle::inert()
            }
        }
    }
}

/// Live mutation watch
///
/// Disposing (or dropping) the handle unsubscribes and stops every further
/// callback, including for batches already queued.
#[derive(Debug)]
pub struct WatchHandle {
    live: Rc<Cell<bool>>,
    subscription: Option<Subscription>,
}

impl WatchHandle {
    /// A handle that never reports anything
    pub fn inert() -> Self {
        Self {
            live: Rc::new(Cell::new(false)),
            subscription: None,
        }
    }

    /// Whether mutations are still being reported
    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    /// Stop watching. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.live.set(false);
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            debug!("Mutation watch disposed");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
