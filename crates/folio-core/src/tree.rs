//! Content tree
//!
//! A small DOM-like tree holding one rendered Content Unit, together with
//! the two capabilities the rewriter and watcher rely on:
//!
//! - [`TextTree`]: walk nodes, read and write text leaves
//! - [`MutationSource`]: subscribe to structural and character-data changes
//!
//! [`ContentTree`] is a cheap-to-clone handle with interior mutability, the
//! way a DOM node handle behaves on a single-threaded host. Mutation records
//! are queued per observer when a change happens and handed over in batches
//! by [`ContentTree::deliver_pending`], which plays the part of the host's
//! notification checkpoint.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

/// Handle of a node inside one [`ContentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a tag name, may have children
    Element(String),
    /// Text leaf
    Text,
}

/// A single change observed in a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Text of `target` was written
    CharacterData { target: NodeId },
    /// Children of `target` were added or removed
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
}

/// Errors raised by tree mutation and observation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The tree cannot report mutations in this rendering context
    #[error("Mutation observation is not supported for this content")]
    ObservationUnsupported,

    #[error("Node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),

    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("Node {0:?} is not an element")]
    NotElement(NodeId),

    /// Appending would make a node its own ancestor
    #[error("Cannot append {child:?} under {parent:?}: it would create a cycle")]
    Hierarchy { parent: NodeId, child: NodeId },
}

/// Read/write access to the text-bearing nodes of a tree
pub trait TextTree {
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Children of `node` in document order (empty for text nodes)
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Text of a text node, `None` for elements and unknown nodes
    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), TreeError>;
}

/// Receiver of mutation batches
pub trait MutationListener {
    /// Called while a record is being produced, before it is queued.
    ///
    /// Returning `false` drops the record. Implementations must not touch
    /// the tree here.
    fn accepts(&self, record: &MutationRecord) -> bool {
        let _ = record;
        true
    }

    /// Called with every queued record, in the order they were produced
    fn on_batch(&self, batch: &[MutationRecord]);
}

/// Something that can report changes below a root node
pub trait MutationSource {
    fn subscribe(
        &self,
        root: NodeId,
        listener: Rc<dyn MutationListener>,
    ) -> Result<Subscription, TreeError>;
}

/// Registration with a [`MutationSource`]
///
/// Cancelling (or dropping) the subscription unregisters the listener and
/// discards its queued records. Cancelling twice is a no-op.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
}

struct ObserverSlot {
    id: u64,
    root: NodeId,
    listener: Rc<dyn MutationListener>,
    pending: Vec<MutationRecord>,
}

struct TreeState {
    nodes: Vec<NodeData>,
    root: NodeId,
    observers: Vec<ObserverSlot>,
    next_observer_id: u64,
    observable: bool,
}

impl TreeState {
    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    /// Whether `node` is `ancestor` or lies below it
    fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    fn record(&mut self, record: MutationRecord) {
        let target = match &record {
            MutationRecord::CharacterData { target } => *target,
            MutationRecord::ChildList { target, .. } => *target,
        };
        let nodes = &self.nodes;
        let in_scope = |root: NodeId| {
            let mut current = Some(target);
            while let Some(id) = current {
                if id == root {
                    return true;
                }
                current = nodes.get(id.0).and_then(|n| n.parent);
            }
            false
        };
        for slot in self.observers.iter_mut() {
            if in_scope(slot.root) && slot.listener.accepts(&record) {
                slot.pending.push(record.clone());
            }
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
        Ok(())
    }
}

/// Handle to a rendered content tree
#[derive(Clone)]
pub struct ContentTree {
    state: Rc<RefCell<TreeState>>,
}

/// Non-owning handle to a [`ContentTree`]
#[derive(Clone)]
pub struct WeakContentTree {
    state: Weak<RefCell<TreeState>>,
}

impl WeakContentTree {
    pub fn upgrade(&self) -> Option<ContentTree> {
        self.state.upgrade().map(|state| ContentTree { state })
    }
}

impl ContentTree {
    /// Create a tree whose root element has the given tag (usually `body`)
    pub fn new(root_tag: &str) -> Self {
        Self::build(root_tag, true)
    }

    /// Create a tree that refuses mutation subscriptions
    pub fn without_observation(root_tag: &str) -> Self {
        Self::build(root_tag, false)
    }

    fn build(root_tag: &str, observable: bool) -> Self {
        let root = NodeData {
            kind: NodeKind::Element(root_tag.to_string()),
            parent: None,
            children: Vec::new(),
            text: String::new(),
        };
        Self {
            state: Rc::new(RefCell::new(TreeState {
                nodes: vec![root],
                root: NodeId(0),
                observers: Vec::new(),
                next_observer_id: 0,
                observable,
            })),
        }
    }

    pub fn root(&self) -> NodeId {
        self.state.borrow().root
    }

    pub fn downgrade(&self) -> WeakContentTree {
        WeakContentTree {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(tag.to_string()), String::new())
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text, text.to_string())
    }

    fn push_node(&self, kind: NodeKind, text: String) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = NodeId(state.nodes.len());
        state.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            text,
        });
        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let mut state = self.state.borrow_mut();
        if !matches!(state.node(parent)?.kind, NodeKind::Element(_)) {
            return Err(TreeError::NotElement(parent));
        }
        state.node(child)?;
        if state.is_inclusive_descendant(parent, child) {
            return Err(TreeError::Hierarchy { parent, child });
        }

        state.detach(child)?;
        state.node_mut(parent)?.children.push(child);
        state.node_mut(child)?.parent = Some(parent);
        state.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Detach `child` from `parent`
    ///
    /// Returns `false` when `child` was not a child of `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<bool, TreeError> {
        let mut state = self.state.borrow_mut();
        if state.node(child)?.parent != Some(parent) {
            return Ok(false);
        }
        state.detach(child)?;
        Ok(true)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Concatenated text of every text node below `node`
    pub fn text_content(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(data) = state.nodes.get(id.0) else {
                continue;
            };
            match data.kind {
                NodeKind::Text => out.push_str(&data.text),
                NodeKind::Element(_) => stack.extend(data.children.iter().rev()),
            }
        }
        out
    }

    /// Number of records waiting for delivery across all observers
    pub fn pending_records(&self) -> usize {
        self.state
            .borrow()
            .observers
            .iter()
            .map(|slot| slot.pending.len())
            .sum()
    }

    /// Hand every queued batch to its listener
    ///
    /// Records produced while listeners run are queued for the next call.
    /// Returns the number of records delivered.
    pub fn deliver_pending(&self) -> usize {
        let batches: Vec<(Rc<dyn MutationListener>, Vec<MutationRecord>)> = {
            let mut state = self.state.borrow_mut();
            state
                .observers
                .iter_mut()
                .filter(|slot| !slot.pending.is_empty())
                .map(|slot| (Rc::clone(&slot.listener), std::mem::take(&mut slot.pending)))
                .collect()
        };

        let mut delivered = 0;
        for (listener, batch) in batches {
            delivered += batch.len();
            listener.on_batch(&batch);
        }
        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }
}

impl TextTree for ContentTree {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.state.borrow().nodes.get(node.0).map(|n| n.kind.clone())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let state = self.state.borrow();
        let data = state.nodes.get(node.0)?;
        match data.kind {
            NodeKind::Text => Some(data.text.clone()),
            NodeKind::Element(_) => None,
        }
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), TreeError> {
        let mut state = self.state.borrow_mut();
        let data = state.node_mut(node)?;
        if data.kind != NodeKind::Text {
            return Err(TreeError::NotText(node));
        }
        data.text = text.to_string();
        state.record(MutationRecord::CharacterData { target: node });
        Ok(())
    }
}

impl MutationSource for ContentTree {
    fn subscribe(
        &self,
        root: NodeId,
        listener: Rc<dyn MutationListener>,
    ) -> Result<Subscription, TreeError> {
        let id = {
            let mut state = self.state.borrow_mut();
            if !state.observable {
                return Err(TreeError::ObservationUnsupported);
            }
            state.node(root)?;
            let id = state.next_observer_id;
            state.next_observer_id += 1;
            state.observers.push(ObserverSlot {
                id,
                root,
                listener,
                pending: Vec::new(),
            });
            id
        };

        let weak = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().observers.retain(|slot| slot.id != id);
            }
        }))
    }
}

impl fmt::Debug for ContentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ContentTree")
            .field("nodes", &state.nodes.len())
            .field("observers", &state.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        batches: RefCell<Vec<Vec<MutationRecord>>>,
    }

    impl MutationListener for Recorder {
        fn on_batch(&self, batch: &[MutationRecord]) {
            self.batches.borrow_mut().push(batch.to_vec());
        }
    }

    fn paragraph(tree: &ContentTree, text: &str) -> (NodeId, NodeId) {
        let p = tree.create_element("p");
        let t = tree.create_text(text);
        tree.append_child(p, t).unwrap();
        tree.append_child(tree.root(), p).unwrap();
        (p, t)
    }

    #[test]
    fn test_build_and_read_text() {
        let tree = ContentTree::new("body");
        paragraph(&tree, "saya ");
        paragraph(&tree, "dan Anda");

        assert_eq!(tree.text_content(tree.root()), "saya dan Anda");
        assert_eq!(tree.children(tree.root()).len(), 2);
        assert_eq!(tree.kind(tree.root()), Some(NodeKind::Element("body".into())));
    }

    #[test]
    fn test_set_text_rejects_elements() {
        let tree = ContentTree::new("body");
        let err = tree.set_text(tree.root(), "x").unwrap_err();
        assert_eq!(err, TreeError::NotText(tree.root()));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let tree = ContentTree::new("body");
        let (p, _) = paragraph(&tree, "x");
        let err = tree.append_child(p, tree.root()).unwrap_err();
        assert!(matches!(err, TreeError::Hierarchy { .. }));
    }

    #[test]
    fn test_records_delivered_in_order() {
        let tree = ContentTree::new("body");
        let (_, t) = paragraph(&tree, "a");
        let recorder = Rc::new(Recorder::default());
        let _sub = tree.subscribe(tree.root(), recorder.clone()).unwrap();

        tree.set_text(t, "b").unwrap();
        let (p2, _) = paragraph(&tree, "c");
        assert_eq!(tree.pending_records(), 2);

        assert_eq!(tree.deliver_pending(), 2);
        let batches = recorder.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0], MutationRecord::CharacterData { target: t });
        assert_eq!(
            batches[0][1],
            MutationRecord::ChildList {
                target: tree.root(),
                added: vec![p2],
                removed: vec![],
            }
        );
    }

    #[test]
    fn test_records_scoped_to_subtree() {
        let tree = ContentTree::new("body");
        let (p, t) = paragraph(&tree, "a");
        let (_, other) = paragraph(&tree, "b");
        let recorder = Rc::new(Recorder::default());
        let _sub = tree.subscribe(p, recorder.clone()).unwrap();

        tree.set_text(other, "x").unwrap();
        tree.set_text(t, "y").unwrap();
        tree.deliver_pending();

        let batches = recorder.batches.borrow();
        assert_eq!(batches[0], vec![MutationRecord::CharacterData { target: t }]);
    }

    #[test]
    fn test_cancel_discards_queued_records() {
        let tree = ContentTree::new("body");
        let (_, t) = paragraph(&tree, "a");
        let recorder = Rc::new(Recorder::default());
        let mut sub = tree.subscribe(tree.root(), recorder.clone()).unwrap();

        tree.set_text(t, "b").unwrap();
        sub.cancel();
        sub.cancel();

        assert_eq!(tree.observer_count(), 0);
        assert_eq!(tree.deliver_pending(), 0);
        assert!(recorder.batches.borrow().is_empty());
    }

    #[test]
    fn test_unobservable_tree() {
        let tree = ContentTree::without_observation("body");
        let recorder = Rc::new(Recorder::default());
        let err = tree.subscribe(tree.root(), recorder).unwrap_err();
        assert_eq!(err, TreeError::ObservationUnsupported);
    }

    #[test]
    fn test_moving_node_records_removal_and_addition() {
        let tree = ContentTree::new("body");
        let (p1, t) = paragraph(&tree, "a");
        let (p2, _) = paragraph(&tree, "b");
        let recorder = Rc::new(Recorder::default());
        let _sub = tree.subscribe(tree.root(), recorder.clone()).unwrap();

        tree.append_child(p2, t).unwrap();
        tree.deliver_pending();

        let batches = recorder.batches.borrow();
        assert_eq!(batches[0].len(), 2);
        assert_eq!(tree.parent(t), Some(p2));
        assert!(tree.children(p1).is_empty());
    }

    #[test]
    fn test_weak_handle() {
        let tree = ContentTree::new("body");
        let weak = tree.downgrade();
        assert!(weak.upgrade().is_some());
        drop(tree);
        assert!(weak.upgrade().is_none());
    }
}
