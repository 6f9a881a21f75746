//! Ordered Collections - Shared tree storage
//!
//! Node lifecycle, the sentinel, binary search descent, rotations, and node removal. Both the
//! [Bst](crate::Bst) and the [Rbt](crate::Rbt) are built on top of a [RawTree]; the red-black tree only adds
//! recoloring and the calls to the rotations.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::{cmp::Ordering, marker::PhantomData, ptr::NonNull};

use crate::{
    node::{node_layout, Link, Node, NodeTrait},
    NodeAllocator, Result, SortKey,
};

/// The outcome of a binary search descent.
pub(crate) enum Search<D> {
    /// A node with an equal key exists.
    Found(NonNull<Node<D>>),
    /// No node with an equal key exists; a new one belongs at this child position of `parent`.
    Vacant { parent: Link<D>, left: bool },
}

/// The node graph of a tree and the allocator its nodes come from.
///
/// Invariants kept by every operation:
/// - `end` (the sentinel) is `None` only while no node was ever inserted.
/// - When the tree holds elements, the sentinel is the right child of the maximum node and its parent points back
///   at it. Otherwise the sentinel has no parent.
/// - `begin` is the minimum node, or the sentinel when the tree is empty.
pub(crate) struct RawTree<D, A>
where
    A: NodeAllocator,
{
    pub(crate) root: Link<D>,
    pub(crate) begin: Link<D>,
    pub(crate) end: Link<D>,
    pub(crate) len: usize,
    pub(crate) alloc: A,
    _marker: PhantomData<D>,
}

impl<D, A> RawTree<D, A>
where
    A: NodeAllocator,
{
    pub(crate) const fn new_in(alloc: A) -> Self {
        RawTree { root: None, begin: None, end: None, len: 0, alloc, _marker: PhantomData }
    }

    /// Allocates a detached red node holding `data`. On failure `data` is dropped.
    fn alloc_node(&self, data: D) -> Result<NonNull<Node<D>>> {
        let node = self.alloc.allocate(node_layout::<D>())?.cast::<Node<D>>();
        unsafe { node.as_ptr().write(Node::new(data)) };
        Ok(node)
    }

    /// Returns a node to the allocator, handing back its value.
    ///
    /// # Safety
    ///
    /// `node` must be a real node of this tree that is no longer linked into it.
    unsafe fn free_node(&self, node: NonNull<Node<D>>) -> D {
        let value = unsafe { Node::take_value(node) };
        unsafe { self.alloc.deallocate(node.cast(), node_layout::<D>()) };
        value
    }

    /// Returns the sentinel, allocating it the first time a tree needs one.
    pub(crate) fn ensure_end(&mut self) -> Result<NonNull<Node<D>>> {
        if let Some(end) = self.end {
            return Ok(end);
        }
        debug_assert_eq!(self.len, 0);

        let end = self.alloc.allocate(node_layout::<D>())?.cast::<Node<D>>();
        unsafe { end.as_ptr().write(Node::sentinel()) };
        log::trace!("tree sentinel allocated at {:p}", end);

        self.end = Some(end);
        self.begin = Some(end);
        Ok(end)
    }

    /// Returns the maximum node, which is the sentinel's parent.
    pub(crate) fn last(&self) -> Link<D> {
        self.end.parent()
    }

    /// Returns the minimum node.
    pub(crate) fn first(&self) -> Link<D> {
        self.begin.real()
    }

    /// Rotate the subtree to the left, the right child of `node` taking its place.
    pub(crate) fn rotate_left(&mut self, node: NonNull<Node<D>>) {
        let Some(pivot) = node.right().real() else {
            debug_assert!(false, "rotate_left without a right child");
            return;
        };
        let parent = node.parent();

        node.set_right(pivot.left());
        pivot.left().set_parent(Some(node));

        pivot.set_left(Some(node));
        node.set_parent(Some(pivot));

        pivot.set_parent(parent);
        match parent {
            None => self.root = Some(pivot),
            Some(parent) if parent.left() == Some(node) => parent.set_left(Some(pivot)),
            Some(parent) => parent.set_right(Some(pivot)),
        }
    }

    /// Rotate the subtree to the right, the left child of `node` taking its place.
    pub(crate) fn rotate_right(&mut self, node: NonNull<Node<D>>) {
        let Some(pivot) = node.left() else {
            debug_assert!(false, "rotate_right without a left child");
            return;
        };
        let parent = node.parent();

        node.set_left(pivot.right());
        pivot.right().set_parent(Some(node));

        pivot.set_right(Some(node));
        node.set_parent(Some(pivot));

        pivot.set_parent(parent);
        match parent {
            None => self.root = Some(pivot),
            Some(parent) if parent.left() == Some(node) => parent.set_left(Some(pivot)),
            Some(parent) => parent.set_right(Some(pivot)),
        }
    }

    /// Allocates a node for `value` and links it as a leaf at a position returned by [search](Self::search).
    ///
    /// The node is red and no rebalancing is done. The sentinel moves below the new node when the new node becomes
    /// the maximum, and the cached minimum follows when it becomes the minimum. On failure the tree is unchanged.
    pub(crate) fn insert_vacant(&mut self, parent: Link<D>, left: bool, value: D) -> Result<NonNull<Node<D>>> {
        let end = self.ensure_end()?;
        let node = self.alloc_node(value)?;

        node.set_parent(parent);
        match parent {
            None => {
                self.root = Some(node);
                self.begin = Some(node);
                node.set_right(Some(end));
                end.set_parent(Some(node));
            }
            Some(parent) if left => {
                parent.set_left(Some(node));
                if self.begin == Some(parent) {
                    self.begin = Some(node);
                }
            }
            Some(parent) => {
                // The right child of a leaf is empty, or the sentinel when the leaf is the maximum.
                let old = parent.right();
                parent.set_right(Some(node));
                if let Some(sentinel) = old {
                    node.set_right(Some(sentinel));
                    sentinel.set_parent(Some(node));
                }
            }
        }

        self.len += 1;
        Ok(node)
    }

    /// Unlinks `node` from the tree, returning its value and the node that now holds its in-order successor (the
    /// sentinel if `node` was the maximum).
    ///
    /// A node with two children keeps its place and color: it takes over the value of its successor, and the
    /// successor's node, which has at most one child, is the one unlinked and freed. `rebalance` is invoked with the
    /// child that moved into the unlinked node's place and that child's parent when the unlinked node was black.
    /// The sentinel is detached from the tree while `rebalance` runs.
    pub(crate) fn remove_node<F>(&mut self, node: NonNull<Node<D>>, rebalance: F) -> (D, Link<D>)
    where
        F: FnOnce(&mut Self, Link<D>, Link<D>),
    {
        debug_assert!(!node.is_sentinel());

        let (unlinked, next) = match (node.left(), node.right().real()) {
            (Some(_), Some(right)) => {
                let successor = Node::leftmost(right);
                unsafe { Node::swap_values(node, successor) };
                (successor, Some(node))
            }
            _ => (node, Node::successor(node)),
        };

        // Detach the sentinel from the maximum so that only real nodes take part in the restructuring.
        self.last().set_right(None);

        let child = unlinked.left().or(unlinked.right());
        let parent = unlinked.parent();
        child.set_parent(parent);
        match parent {
            None => self.root = child,
            Some(parent) if parent.left() == Some(unlinked) => parent.set_left(child),
            Some(parent) => parent.set_right(child),
        }

        if unlinked.is_black() {
            rebalance(self, child, parent);
        }

        if self.begin == Some(unlinked) {
            self.begin = next;
        }

        match self.root {
            Some(root) => {
                let max = Node::rightmost(root);
                max.set_right(self.end);
                self.end.set_parent(Some(max));
            }
            None => self.end.set_parent(None),
        }

        self.len -= 1;
        (unsafe { self.free_node(unlinked) }, next)
    }

    /// Frees every real node, keeping the sentinel.
    pub(crate) fn clear(&mut self) {
        let mut current = self.root;
        // Post-order walk: descend to a leaf, unlink and free it, continue from its parent.
        while let Some(node) = current {
            if let Some(left) = node.left() {
                current = Some(left);
                continue;
            }
            if let Some(right) = node.right().real() {
                current = Some(right);
                continue;
            }

            let parent = node.parent();
            if let Some(parent) = parent {
                if parent.left() == Some(node) {
                    parent.set_left(None);
                } else {
                    parent.set_right(None);
                }
            }
            drop(unsafe { self.free_node(node) });
            current = parent;
        }

        self.root = None;
        self.len = 0;
        self.begin = self.end;
        self.end.set_parent(None);
    }

    /// Returns the number of real nodes on the longest root to leaf path.
    pub(crate) fn height(&self) -> usize {
        Node::height(self.root)
    }

    /// Visits every element in pre-order, stopping at the first error.
    ///
    /// Inserting the elements of a tree in pre-order into an empty unbalanced tree reproduces its shape.
    pub(crate) fn try_for_each_preorder<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&D) -> Result<()>,
    {
        let mut current = self.root;
        while let Some(node) = current {
            f(unsafe { Node::value(node) })?;
            current = Node::preorder_next(node);
        }
        Ok(())
    }
}

impl<D, A> RawTree<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Descends from the root comparing against `key`.
    pub(crate) fn search(&self, key: &D::Key) -> Search<D> {
        let mut parent = None;
        let mut left = false;
        let mut current = self.root;
        while let Some(node) = current.real() {
            match key.cmp(unsafe { Node::value(node) }.key()) {
                Ordering::Equal => return Search::Found(node),
                Ordering::Less => {
                    parent = Some(node);
                    left = true;
                    current = node.left();
                }
                Ordering::Greater => {
                    parent = Some(node);
                    left = false;
                    current = node.right();
                }
            }
        }
        Search::Vacant { parent, left }
    }

    /// Returns the node with a key equal to `key`.
    pub(crate) fn find_node(&self, key: &D::Key) -> Link<D> {
        match self.search(key) {
            Search::Found(node) => Some(node),
            Search::Vacant { .. } => None,
        }
    }

    /// Returns the node with the greatest key that is less than or equal to `key`.
    pub(crate) fn closest_node(&self, key: &D::Key) -> Link<D> {
        let mut current = self.root;
        let mut closest = None;
        while let Some(node) = current.real() {
            match key.cmp(unsafe { Node::value(node) }.key()) {
                Ordering::Equal => return Some(node),
                Ordering::Less => current = node.left(),
                Ordering::Greater => {
                    closest = Some(node);
                    current = node.right();
                }
            }
        }
        closest
    }
}

impl<D, A> Drop for RawTree<D, A>
where
    A: NodeAllocator,
{
    fn drop(&mut self) {
        self.clear();
        if let Some(end) = self.end.take() {
            unsafe { self.alloc.deallocate(end.cast(), node_layout::<D>()) };
        }
    }
}

// The tree owns its nodes exclusively; sharing or sending it is sharing or sending the values and the allocator.
unsafe impl<D: Send, A: NodeAllocator + Send> Send for RawTree<D, A> {}
unsafe impl<D: Sync, A: NodeAllocator + Sync> Sync for RawTree<D, A> {}

#[cfg(test)]
impl<D, A> RawTree<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Asserts the structural invariants shared by every tree: consistent parent links, ascending keys, the cached
    /// minimum, the sentinel placement, and the element count.
    pub(crate) fn assert_structure(&self) {
        fn walk<D: SortKey>(node: Link<D>, parent: Link<D>, count: &mut usize) {
            let Some(node) = node.real() else {
                return;
            };
            assert_eq!(node.parent(), parent, "broken parent link");
            *count += 1;
            walk(node.left(), Some(node), count);
            walk(node.right(), Some(node), count);
        }

        let mut count = 0;
        walk(self.root, None, &mut count);
        assert_eq!(count, self.len, "node count does not match len");

        // Walk the successor chain from begin to end; it must visit every node in ascending key order.
        let mut visited = 0;
        let mut current = self.begin;
        let mut previous: Option<NonNull<Node<D>>> = None;
        while let Some(node) = current.real() {
            if let Some(previous) = previous {
                let (a, b) = unsafe { (Node::value(previous), Node::value(node)) };
                assert!(a.key() < b.key(), "keys are not strictly ascending");
            }
            previous = Some(node);
            visited += 1;
            current = Node::successor(node);
        }
        assert_eq!(visited, self.len, "successor walk does not visit every node");
        assert_eq!(current, self.end, "successor walk does not terminate at the sentinel");

        match self.root {
            Some(root) => {
                assert!(root.parent().is_none());
                assert_eq!(self.begin, Some(Node::leftmost(root)), "cached minimum is stale");
                let max = Node::rightmost(root);
                assert_eq!(max.right(), self.end, "sentinel is not the right child of the maximum");
                assert_eq!(self.end.parent(), Some(max), "sentinel does not point back at the maximum");
            }
            None => {
                assert_eq!(self.len, 0);
                assert_eq!(self.begin, self.end);
                assert!(self.end.parent().is_none());
            }
        }

        if let Some(end) = self.end {
            assert!(end.is_sentinel());
            assert!(end.is_black());
            assert!(end.left().is_none() && end.right().is_none());
        }
    }
}
