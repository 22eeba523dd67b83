//! Lexical rewriter
//!
//! Walks a content tree depth-first and applies a [`RuleSet`] to every text
//! node, writing back only the nodes whose text actually changed.
//!
//! Each rewriter owns a [`RewriteLatch`]. The latch is engaged only for the
//! duration of a single write-back, so a mutation observer sharing the latch
//! can drop exactly the notification that write produced. A nested `apply`
//! started while the latch is engaged returns immediately.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::rules::RuleSet;
use crate::tree::{NodeId, NodeKind, TextTree};

/// Scoped "write-back in progress" flag, one per Content Unit
#[derive(Debug, Clone, Default)]
pub struct RewriteLatch {
    engaged: Rc<Cell<bool>>,
}

impl RewriteLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.get()
    }

    /// Engage the latch until the returned guard is dropped
    pub fn engage(&self) -> LatchGuard {
        self.engaged.set(true);
        LatchGuard {
            engaged: Rc::clone(&self.engaged),
        }
    }
}

/// Releases its [`RewriteLatch`] on drop
#[must_use = "the latch is released as soon as the guard is dropped"]
pub struct LatchGuard {
    engaged: Rc<Cell<bool>>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.engaged.set(false);
    }
}

/// Counters describing what a rewriter has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Calls to `apply` that walked the tree
    pub passes: usize,
    /// Calls to `apply` dropped because a write-back was in progress
    pub suppressed: usize,
    /// Text nodes inspected
    pub nodes_visited: usize,
    /// Text nodes written back
    pub nodes_rewritten: usize,
}

/// Applies substitution rules to the text of a tree
#[derive(Debug)]
pub struct Rewriter {
    rules: Rc<RuleSet>,
    latch: RewriteLatch,
    stats: Cell<RewriteStats>,
}

impl Rewriter {
    pub fn new(rules: Rc<RuleSet>) -> Self {
        Self {
            rules,
            latch: RewriteLatch::new(),
            stats: Cell::new(RewriteStats::default()),
        }
    }

    /// Handle on this rewriter's latch, for observers that must ignore its writes
    pub fn latch(&self) -> RewriteLatch {
        self.latch.clone()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats.get()
    }

    /// Rewrite every text node at or below `root`
    ///
    /// Returns the number of nodes written back.
    pub fn apply<T: TextTree + ?Sized>(&self, tree: &T, root: NodeId) -> usize {
        if self.latch.is_engaged() {
            let mut stats = self.stats.get();
            stats.suppressed += 1;
            self.stats.set(stats);
            return 0;
        }

        let mut visited = 0;
        let mut rewritten = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match tree.kind(node) {
                Some(NodeKind::Text) => {
                    visited += 1;
                    if self.rewrite_node(tree, node) {
                        rewritten += 1;
                    }
                }
                Some(NodeKind::Element(_)) => {
                    let mut children = tree.children(node);
                    children.reverse();
                    stack.extend(children);
                }
                None => {}
            }
        }

        // Re-read: nested calls may have bumped `suppressed` meanwhile
        let mut stats = self.stats.get();
        stats.passes += 1;
        stats.nodes_visited += visited;
        stats.nodes_rewritten += rewritten;
        self.stats.set(stats);
        if rewritten > 0 {
            debug!("Rewrote {} text node(s) under {:?}", rewritten, root);
        }
        rewritten
    }

    fn rewrite_node<T: TextTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(original) = tree.text(node) else {
            return false;
        };
        let rewritten = self.rules.rewrite(&original);
        if rewritten == original.as_str() {
            return false;
        }

        let _guard = self.latch.engage();
        match tree.set_text(node, &rewritten) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not write back {:?}: {}", node, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSpec;
    use crate::tree::ContentTree;
    use std::cell::RefCell;

    fn pronoun_rules() -> Rc<RuleSet> {
        Rc::new(
            RuleSet::from_specs(&[
                RuleSpec::new("Saya", "Aku"),
                RuleSpec::new("saya", "aku"),
                RuleSpec::new("Anda", "Kamu"),
                RuleSpec::new("anda", "kamu"),
            ])
            .unwrap(),
        )
    }

    fn build(tree: &ContentTree, paragraphs: &[&str]) -> Vec<NodeId> {
        paragraphs
            .iter()
            .map(|text| {
                let p = tree.create_element("p");
                let t = tree.create_text(text);
                tree.append_child(p, t).unwrap();
                tree.append_child(tree.root(), p).unwrap();
                t
            })
            .collect()
    }

    #[test]
    fn test_full_pass_rewrites_every_node() {
        let tree = ContentTree::new("body");
        build(&tree, &["saya dan Anda", "SAYA", "sayang anda"]);
        let rewriter = Rewriter::new(pronoun_rules());

        assert_eq!(rewriter.apply(&tree, tree.root()), 2);
        assert_eq!(tree.text_content(tree.root()), "aku dan KamuSAYAsayang kamu");
        assert!(!rewriter.latch().is_engaged());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let tree = ContentTree::new("body");
        build(&tree, &["saya dan Anda"]);
        let rewriter = Rewriter::new(pronoun_rules());

        rewriter.apply(&tree, tree.root());
        assert_eq!(rewriter.apply(&tree, tree.root()), 0);

        let stats = rewriter.stats();
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.nodes_visited, 2);
        assert_eq!(stats.nodes_rewritten, 1);
    }

    #[test]
    fn test_unchanged_nodes_are_not_written() {
        struct CountingTree {
            inner: ContentTree,
            writes: RefCell<usize>,
        }

        impl TextTree for CountingTree {
            fn kind(&self, node: NodeId) -> Option<NodeKind> {
                self.inner.kind(node)
            }
            fn children(&self, node: NodeId) -> Vec<NodeId> {
                self.inner.children(node)
            }
            fn text(&self, node: NodeId) -> Option<String> {
                self.inner.text(node)
            }
            fn set_text(&self, node: NodeId, text: &str) -> Result<(), crate::tree::TreeError> {
                *self.writes.borrow_mut() += 1;
                self.inner.set_text(node, text)
            }
        }

        let tree = CountingTree {
            inner: ContentTree::new("body"),
            writes: RefCell::new(0),
        };
        build(&tree.inner, &["tidak ada", "juga tidak", "saya"]);
        Rewriter::new(pronoun_rules()).apply(&tree, tree.inner.root());

        assert_eq!(*tree.writes.borrow(), 1);
    }

    #[test]
    fn test_nested_apply_during_write_is_suppressed() {
        struct ReentrantTree<'a> {
            inner: ContentTree,
            rewriter: RefCell<Option<&'a Rewriter>>,
            nested: RefCell<usize>,
        }

        impl TextTree for ReentrantTree<'_> {
            fn kind(&self, node: NodeId) -> Option<NodeKind> {
                self.inner.kind(node)
            }
            fn children(&self, node: NodeId) -> Vec<NodeId> {
                self.inner.children(node)
            }
            fn text(&self, node: NodeId) -> Option<String> {
                self.inner.text(node)
            }
            fn set_text(&self, node: NodeId, text: &str) -> Result<(), crate::tree::TreeError> {
                self.inner.set_text(node, text)?;
                // A synchronous observer firing inside the write
                if let Some(rewriter) = *self.rewriter.borrow() {
                    *self.nested.borrow_mut() += rewriter.apply(self, node);
                }
                Ok(())
            }
        }

        let rewriter = Rewriter::new(pronoun_rules());
        let tree = ReentrantTree {
            inner: ContentTree::new("body"),
            rewriter: RefCell::new(None),
            nested: RefCell::new(0),
        };
        build(&tree.inner, &["saya", "Anda"]);
        *tree.rewriter.borrow_mut() = Some(&rewriter);

        assert_eq!(rewriter.apply(&tree, tree.inner.root()), 2);
        assert_eq!(*tree.nested.borrow(), 0);
        assert_eq!(rewriter.stats().suppressed, 2);
        assert!(!rewriter.latch().is_engaged());
    }

    #[test]
    fn test_apply_on_single_text_node() {
        let tree = ContentTree::new("body");
        let nodes = build(&tree, &["saya", "anda"]);
        let rewriter = Rewriter::new(pronoun_rules());

        rewriter.apply(&tree, nodes[1]);
        assert_eq!(tree.text(nodes[0]).unwrap(), "saya");
        assert_eq!(tree.text(nodes[1]).unwrap(), "kamu");
    }

    #[test]
    fn test_latch_guard_releases() {
        let latch = RewriteLatch::new();
        {
            let _guard = latch.engage();
            assert!(latch.clone().is_engaged());
        }
        assert!(!latch.is_engaged());
    }
}
