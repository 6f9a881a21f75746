//! Ordered Collections - Node for the Binary Search and Red-Black Trees
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::{alloc::Layout, mem::MaybeUninit, ptr::NonNull};

/// A possibly absent structural reference to a node.
pub(crate) type Link<D> = Option<NonNull<Node<D>>>;

/// Returns the size of a internal node in bytes, useful for calculating the slice size for a
/// [BlockPool](crate::BlockPool).
pub const fn node_size<D>() -> usize {
    core::mem::size_of::<Node<D>>()
}

/// Returns the layout of an internal node, as requested from a [NodeAllocator](crate::NodeAllocator).
pub const fn node_layout<D>() -> Layout {
    Layout::new::<Node<D>>()
}

/// The color of a node in a red-black tree. Nodes of the unbalanced tree are left black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// A tree node. The tree exclusively owns every node; the links are non-owning references into the same tree.
///
/// The sentinel is a node like any other except that `data` is never initialized.
pub(crate) struct Node<D> {
    data: MaybeUninit<D>,
    color: Color,
    sentinel: bool,
    parent: Link<D>,
    left: Link<D>,
    right: Link<D>,
}

impl<D> Node<D> {
    pub(crate) fn new(data: D) -> Self {
        Node { data: MaybeUninit::new(data), color: Color::Red, sentinel: false, parent: None, left: None, right: None }
    }

    pub(crate) fn sentinel() -> Self {
        Node { data: MaybeUninit::uninit(), color: Color::Black, sentinel: true, parent: None, left: None, right: None }
    }

    /// Returns a reference to the value of a node.
    ///
    /// # Safety
    ///
    /// `node` must be a live, non-sentinel node, and must stay so (and unmodified) for `'a`.
    pub(crate) unsafe fn value<'a>(node: NonNull<Self>) -> &'a D {
        unsafe { (*node.as_ptr()).data.assume_init_ref() }
    }

    /// Returns a mutable reference to the value of a node.
    ///
    /// # Safety
    ///
    /// Same as [value](Self::value), and no other reference to the value may exist for `'a`.
    pub(crate) unsafe fn value_mut<'a>(node: NonNull<Self>) -> &'a mut D {
        unsafe { (*node.as_ptr()).data.assume_init_mut() }
    }

    /// Moves the value out of a node, leaving it uninitialized.
    ///
    /// # Safety
    ///
    /// `node` must be a live, non-sentinel node whose value is never read again.
    pub(crate) unsafe fn take_value(node: NonNull<Self>) -> D {
        unsafe { (*node.as_ptr()).data.assume_init_read() }
    }

    /// Exchanges the values of two nodes, leaving their colors and links in place.
    ///
    /// # Safety
    ///
    /// Both nodes must be live and non-sentinel.
    pub(crate) unsafe fn swap_values(a: NonNull<Self>, b: NonNull<Self>) {
        if a != b {
            unsafe { core::ptr::swap(&mut (*a.as_ptr()).data, &mut (*b.as_ptr()).data) }
        }
    }

    /// Returns the minimum node of the subtree rooted at `node`.
    pub(crate) fn leftmost(node: NonNull<Self>) -> NonNull<Self> {
        let mut current = node;
        while let Some(left) = current.left() {
            current = left;
        }
        current
    }

    /// Returns the maximum real node of the subtree rooted at `node`, never descending into the sentinel.
    pub(crate) fn rightmost(node: NonNull<Self>) -> NonNull<Self> {
        let mut current = node;
        while let Some(right) = current.right().real() {
            current = right;
        }
        current
    }

    /// Returns the in-order successor of `node`.
    ///
    /// The maximum node's right child is the sentinel, so the successor of the maximum is the sentinel. Only the
    /// sentinel itself (or a node of a tree without one) has no successor.
    pub(crate) fn successor(node: NonNull<Self>) -> Link<D> {
        if let Some(right) = node.right() {
            return Some(Self::leftmost(right));
        }

        let mut current = node;
        while let Some(parent) = current.parent() {
            if parent.left() == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Returns the in-order predecessor of `node`. The predecessor of the sentinel is the maximum node.
    pub(crate) fn predecessor(node: NonNull<Self>) -> Link<D> {
        if let Some(left) = node.left() {
            return Some(Self::rightmost(left));
        }

        let mut current = node;
        while let Some(parent) = current.parent() {
            if parent.right() == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Returns the node visited after `node` in a pre-order walk of its tree, skipping the sentinel.
    pub(crate) fn preorder_next(node: NonNull<Self>) -> Link<D> {
        if let Some(left) = node.left() {
            return Some(left);
        }
        if let Some(right) = node.right().real() {
            return Some(right);
        }

        let mut current = node;
        while let Some(parent) = current.parent() {
            if parent.left() == Some(current) {
                if let Some(right) = parent.right().real() {
                    return Some(right);
                }
            }
            current = parent;
        }
        None
    }

    /// Returns the sibling of `node`, panicking if the parent links are broken.
    pub(crate) fn sibling(node: NonNull<Self>) -> Link<D> {
        let parent = node.parent()?;
        match Some(node) {
            link if link == parent.left() => parent.right(),
            link if link == parent.right() => parent.left(),
            _ => panic!("Node is not a child of its parent."),
        }
    }

    /// Returns the number of real nodes on the longest path from `node` down to a leaf.
    ///
    /// The subtree is walked in pre-order through the parent links, so degenerate trees do not grow the stack.
    pub(crate) fn height(node: Link<D>) -> usize {
        let Some(top) = node.real() else {
            return 0;
        };

        let mut current = top;
        let mut depth = 1;
        let mut height = 1;
        loop {
            height = core::cmp::max(height, depth);
            if let Some(left) = current.left() {
                current = left;
                depth += 1;
                continue;
            }
            if let Some(right) = current.right().real() {
                current = right;
                depth += 1;
                continue;
            }

            // Climb to the nearest ancestor with an unvisited right subtree, without leaving the subtree of `top`.
            loop {
                if current == top {
                    return height;
                }
                let Some(parent) = current.parent() else {
                    return height;
                };
                if parent.left() == Some(current) {
                    if let Some(right) = parent.right().real() {
                        current = right;
                        break;
                    }
                }
                current = parent;
                depth -= 1;
            }
        }
    }
}

/// Structural accessors, implemented both for a node and for a possibly absent node. An absent node reads as a
/// black leaf with no links, and writes to it are ignored.
pub(crate) trait NodeTrait<D>: Copy {
    fn color(self) -> Color;
    fn set_color(self, color: Color);
    fn set_red(self) {
        self.set_color(Color::Red);
    }
    fn set_black(self) {
        self.set_color(Color::Black);
    }
    fn is_red(self) -> bool {
        self.color() == Color::Red
    }
    fn is_black(self) -> bool {
        self.color() == Color::Black
    }
    fn is_sentinel(self) -> bool;
    fn parent(self) -> Link<D>;
    fn set_parent(self, node: Link<D>);
    fn left(self) -> Link<D>;
    fn set_left(self, node: Link<D>);
    fn right(self) -> Link<D>;
    fn set_right(self, node: Link<D>);
    /// Returns the node unless it is the sentinel.
    fn real(self) -> Link<D>;
}

impl<D> NodeTrait<D> for NonNull<Node<D>> {
    fn color(self) -> Color {
        unsafe { (*self.as_ptr()).color }
    }

    fn set_color(self, color: Color) {
        unsafe { (*self.as_ptr()).color = color }
    }

    fn is_sentinel(self) -> bool {
        unsafe { (*self.as_ptr()).sentinel }
    }

    fn parent(self) -> Link<D> {
        unsafe { (*self.as_ptr()).parent }
    }

    fn set_parent(self, node: Link<D>) {
        unsafe { (*self.as_ptr()).parent = node }
    }

    fn left(self) -> Link<D> {
        unsafe { (*self.as_ptr()).left }
    }

    fn set_left(self, node: Link<D>) {
        unsafe { (*self.as_ptr()).left = node }
    }

    fn right(self) -> Link<D> {
        unsafe { (*self.as_ptr()).right }
    }

    fn set_right(self, node: Link<D>) {
        unsafe { (*self.as_ptr()).right = node }
    }

    fn real(self) -> Link<D> {
        (!self.is_sentinel()).then_some(self)
    }
}

impl<D> NodeTrait<D> for Link<D> {
    fn color(self) -> Color {
        match self {
            Some(node) => node.color(),
            None => Color::Black,
        }
    }

    fn set_color(self, color: Color) {
        if let Some(node) = self {
            node.set_color(color);
        }
    }

    fn is_sentinel(self) -> bool {
        self.is_some_and(|node| node.is_sentinel())
    }

    fn parent(self) -> Link<D> {
        self.and_then(|node| node.parent())
    }

    fn set_parent(self, parent: Link<D>) {
        if let Some(node) = self {
            node.set_parent(parent);
        }
    }

    fn left(self) -> Link<D> {
        self.and_then(|node| node.left())
    }

    fn set_left(self, left: Link<D>) {
        if let Some(node) = self {
            node.set_left(left);
        }
    }

    fn right(self) -> Link<D> {
        self.and_then(|node| node.right())
    }

    fn set_right(self, right: Link<D>) {
        if let Some(node) = self {
            node.set_right(right);
        }
    }

    fn real(self) -> Link<D> {
        self.and_then(|node| node.real())
    }
}
