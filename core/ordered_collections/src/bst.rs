//! Ordered Collections - Binary Search Tree (BST)
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#[cfg(feature = "alloc")]
extern crate alloc;

use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{
    iter::{Cursor, CursorMut, IntoIter, Iter},
    node::{node_size, Link, Node, NodeTrait},
    raw::{RawTree, Search},
    Error, Global, NodeAllocator, Result, SortKey,
};

/// An unbalanced binary search tree whose nodes are obtained from an allocator of type `A`.
///
/// The tree shares its node layout, end position and cursors with the [Rbt](crate::Rbt), but never rotates. Its
/// height depends on the insertion order: sorted input degenerates the tree into a list.
pub struct Bst<D, A = Global>
where
    A: NodeAllocator,
{
    raw: RawTree<D, A>,
}

fn no_rebalance<D, A: NodeAllocator>(_: &mut RawTree<D, A>, _: Link<D>, _: Link<D>) {}

impl<D> Bst<D, Global> {
    /// Creates an empty tree backed by the global allocator.
    pub const fn new() -> Self {
        Bst { raw: RawTree::new_in(Global) }
    }
}

impl<D> Bst<D, Global>
where
    D: SortKey,
{
    /// Creates a tree holding a single element.
    pub fn from_value(value: D) -> Result<Self> {
        let mut bst = Self::new();
        bst.push(value)?;
        Ok(bst)
    }
}

impl<D, A> Bst<D, A>
where
    A: NodeAllocator,
{
    /// Creates an empty tree whose nodes will be obtained from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Bst { raw: RawTree::new_in(alloc) }
    }

    /// Returns the allocator of the tree.
    pub fn allocator(&self) -> &A {
        &self.raw.alloc
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.raw.len
    }

    /// Indicates whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Returns the largest number of elements a tree of `D` could address.
    pub fn max_size(&self) -> usize {
        isize::MAX as usize / node_size::<D>()
    }

    /// Returns the height of the tree.
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns a cursor at the first element, or at the end position if the tree is empty.
    pub fn begin(&self) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.begin)
    }

    /// Returns a cursor at the end position.
    pub fn end(&self) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.end)
    }

    /// Returns an in-order iterator over the elements.
    pub fn iter(&self) -> Iter<'_, D> {
        Iter::new(&self.raw)
    }

    /// Returns the first ordered element, or [Empty](Error::Empty).
    pub fn front(&self) -> Result<&D> {
        self.raw.first().map(|node| unsafe { Node::value(node) }).ok_or(Error::Empty)
    }

    /// Returns the last ordered element, or [Empty](Error::Empty).
    pub fn back(&self) -> Result<&D> {
        self.raw.last().map(|node| unsafe { Node::value(node) }).ok_or(Error::Empty)
    }

    /// Returns the first ordered element without checking for an empty tree.
    ///
    /// # Safety
    ///
    /// The tree must not be empty.
    pub unsafe fn front_unchecked(&self) -> &D {
        unsafe { Node::value(self.raw.begin.unwrap_unchecked()) }
    }

    /// Returns the last ordered element without checking for an empty tree.
    ///
    /// # Safety
    ///
    /// The tree must not be empty.
    pub unsafe fn back_unchecked(&self) -> &D {
        unsafe { Node::value(self.raw.last().unwrap_unchecked()) }
    }

    /// Removes and returns the first ordered element.
    pub fn pop_first(&mut self) -> Option<D> {
        let node = self.raw.first()?;
        Some(self.raw.remove_node(node, no_rebalance).0)
    }

    /// Removes and returns the last ordered element.
    pub fn pop_last(&mut self) -> Option<D> {
        let node = self.raw.last()?;
        Some(self.raw.remove_node(node, no_rebalance).0)
    }

    /// Removes every element, returning all nodes to the allocator.
    pub fn clear(&mut self) {
        log::debug!("Bst: clearing {} elements", self.raw.len);
        self.raw.clear();
    }

    /// Exchanges the contents of two trees in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.raw, &mut other.raw);
    }
}

impl<D, A> Bst<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Creates a tree from the elements of an iterator, obtaining its nodes from `alloc`. Duplicates are dropped.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
    {
        let mut bst = Self::new_in(alloc);
        for value in iter {
            bst.insert(value)?;
        }
        Ok(bst)
    }

    fn insert_vacant(&mut self, parent: Link<D>, left: bool, value: D) -> Result<Cursor<'_, D>> {
        let node = self.raw.insert_vacant(parent, left, value)?;
        node.set_black();
        Ok(Cursor::new(&self.raw, Some(node)))
    }

    /// Adds a value into the tree.
    ///
    /// # Time Complexity
    ///
    /// O(n) in the worst case, O(log n) for a random insertion order.
    ///
    /// # Errors
    ///
    /// Returns [AlreadyExists](Error::AlreadyExists) if the value already exists in the tree.
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated.
    ///
    pub fn push(&mut self, value: D) -> Result<()> {
        match self.raw.search(value.key()) {
            Search::Found(_) => Err(Error::AlreadyExists),
            Search::Vacant { parent, left } => self.insert_vacant(parent, left, value).map(|_| ()),
        }
    }

    /// Adds a value into the tree unless an element with the same key exists, returning a cursor at the element
    /// with that key and whether `value` was inserted.
    pub fn insert(&mut self, value: D) -> Result<(Cursor<'_, D>, bool)> {
        match self.raw.search(value.key()) {
            Search::Found(node) => Ok((Cursor::new(&self.raw, Some(node)), false)),
            Search::Vacant { parent, left } => Ok((self.insert_vacant(parent, left, value)?, true)),
        }
    }

    /// Constructs a value in place if no element with `key` exists. See [Rbt::insert_with](crate::Rbt::insert_with).
    pub fn insert_with<F>(&mut self, key: &D::Key, f: F) -> Result<(Cursor<'_, D>, bool)>
    where
        F: FnOnce() -> D,
    {
        let (parent, left) = match self.raw.search(key) {
            Search::Found(node) => return Ok((Cursor::new(&self.raw, Some(node)), false)),
            Search::Vacant { parent, left } => (parent, left),
        };

        let value = f();
        if value.key() != key {
            return self.insert(value);
        }
        Ok((self.insert_vacant(parent, left, value)?, true))
    }

    /// Removes the element with the given key, returning it.
    ///
    /// # Errors
    ///
    /// Returns [NotFound](Error::NotFound) if no element has the key.
    pub fn remove(&mut self, key: &D::Key) -> Result<D> {
        let node = self.raw.find_node(key).ok_or(Error::NotFound)?;
        Ok(self.raw.remove_node(node, no_rebalance).0)
    }

    /// Returns a cursor at the element with the given key, or at the end position if there is none.
    pub fn find(&self, key: &D::Key) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.find_node(key).or(self.raw.end))
    }

    /// Returns a cursor that can remove elements, positioned like [find](Self::find).
    pub fn find_mut(&mut self, key: &D::Key) -> CursorMut<'_, D, A> {
        let current = self.raw.find_node(key).or(self.raw.end);
        CursorMut::new(&mut self.raw, current, no_rebalance)
    }

    /// Searches for a value in the tree, returning it if it exists.
    pub fn get(&self, key: &D::Key) -> Option<&D> {
        self.raw.find_node(key).map(|node| unsafe { Node::value(node) })
    }

    /// Searches for a value in the tree, returning a mutable reference to it if it exists.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the mutable reference is not used to modify any value that
    /// affects the value of the key.
    ///
    pub unsafe fn get_mut(&mut self, key: &D::Key) -> Option<&mut D> {
        self.raw.find_node(key).map(|node| unsafe { Node::value_mut(node) })
    }

    /// Indicates whether an element with the given key exists.
    pub fn contains(&self, key: &D::Key) -> bool {
        self.raw.find_node(key).is_some()
    }

    /// Searches the tree, returning the closest value to the given key, rounded down.
    pub fn get_closest(&self, key: &D::Key) -> Option<&D> {
        self.raw.closest_node(key).map(|node| unsafe { Node::value(node) })
    }
}

impl<D, A> Bst<D, A>
where
    D: SortKey + Clone,
    A: NodeAllocator + Clone,
{
    /// Creates a deep copy of the tree with the same shape.
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated. The partial copy is
    /// discarded.
    pub fn try_clone(&self) -> Result<Self> {
        let mut bst = Self::new_in(self.raw.alloc.clone());
        self.raw.try_for_each_preorder(|value| bst.push(value.clone()))?;
        Ok(bst)
    }
}

#[cfg(feature = "alloc")]
impl<D, A> Bst<D, A>
where
    D: Clone,
    A: NodeAllocator,
{
    /// Returns the ordered values of the tree.
    pub fn to_vec(&self) -> alloc::vec::Vec<D> {
        self.iter().cloned().collect()
    }
}

impl<D, A> Default for Bst<D, A>
where
    A: NodeAllocator + Default,
{
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<D, A> Clone for Bst<D, A>
where
    D: SortKey + Clone,
    A: NodeAllocator + Clone,
{
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(bst) => bst,
            Err(err) => {
                log::error!("Bst: clone of {} elements abandoned: {}", self.len(), err);
                Self::new_in(self.raw.alloc.clone())
            }
        }
    }
}

impl<D, A> Extend<D> for Bst<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    fn extend<I: IntoIterator<Item = D>>(&mut self, iter: I) {
        for value in iter {
            if let Err(err) = self.insert(value) {
                log::warn!("Bst: extend stopped after {} elements: {}", self.len(), err);
                break;
            }
        }
    }
}

impl<D> FromIterator<D> for Bst<D, Global>
where
    D: SortKey,
{
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        let mut bst = Self::new();
        bst.extend(iter);
        bst
    }
}

impl<D, const N: usize> From<[D; N]> for Bst<D, Global>
where
    D: SortKey,
{
    fn from(values: [D; N]) -> Self {
        Self::from_iter(values)
    }
}

impl<'a, D, A> IntoIterator for &'a Bst<D, A>
where
    A: NodeAllocator,
{
    type Item = &'a D;
    type IntoIter = Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D, A> IntoIterator for Bst<D, A>
where
    A: NodeAllocator,
{
    type Item = D;
    type IntoIter = IntoIter<D, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.raw)
    }
}

impl<D, A, B> PartialEq<Bst<D, B>> for Bst<D, A>
where
    D: PartialEq,
    A: NodeAllocator,
    B: NodeAllocator,
{
    fn eq(&self, other: &Bst<D, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<D, A> Eq for Bst<D, A>
where
    D: Eq,
    A: NodeAllocator,
{
}

impl<D, A, B> PartialOrd<Bst<D, B>> for Bst<D, A>
where
    D: PartialOrd,
    A: NodeAllocator,
    B: NodeAllocator,
{
    fn partial_cmp(&self, other: &Bst<D, B>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<D, A> Ord for Bst<D, A>
where
    D: Ord,
    A: NodeAllocator,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<D, A> Hash for Bst<D, A>
where
    D: Hash,
    A: NodeAllocator,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self.iter() {
            value.hash(state);
        }
    }
}

impl<D, A> fmt::Debug for Bst<D, A>
where
    D: fmt::Debug,
    A: NodeAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
