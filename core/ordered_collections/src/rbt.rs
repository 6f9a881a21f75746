//! Ordered Collections - Red-Black Tree
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
    ptr::NonNull,
};

use crate::{
    iter::{Cursor, CursorMut, IntoIter, Iter},
    node::{node_size, Link, Node, NodeTrait},
    raw::{RawTree, Search},
    Error, Global, NodeAllocator, Result, SortKey,
};

/// A red-black tree whose nodes are obtained from an allocator of type `A`.
///
/// Every element is unique by its [key](SortKey::key). The in-order sequence of elements is terminated by an end
/// position, so [begin](Self::begin) and [end](Self::end) delimit the elements the way a pair of iterators would.
/// The minimum element is cached and [front](Self::front) is O(1).
///
/// No operation panics when the allocator is exhausted. Operations that need a new node return
/// [AllocationFailed](Error::AllocationFailed) and leave the tree unchanged.
pub struct Rbt<D, A = Global>
where
    A: NodeAllocator,
{
    raw: RawTree<D, A>,
}

impl<D> Rbt<D, Global> {
    /// Creates an empty tree backed by the global allocator.
    ///
    /// No memory is allocated until the first element is added.
    pub const fn new() -> Self {
        Rbt { raw: RawTree::new_in(Global) }
    }
}

impl<D> Rbt<D, Global>
where
    D: SortKey,
{
    /// Creates a tree holding a single element.
    pub fn from_value(value: D) -> Result<Self> {
        let mut rbt = Self::new();
        rbt.push(value)?;
        Ok(rbt)
    }
}

impl<D, A> Rbt<D, A>
where
    A: NodeAllocator,
{
    /// Creates an empty tree whose nodes will be obtained from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Rbt { raw: RawTree::new_in(alloc) }
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
    ///
    /// # Time Complexity
    ///
    /// O(1)
    ///
    pub fn begin(&self) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.begin)
    }

    /// Returns a cursor at the end position, one past the last element.
    pub fn end(&self) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.end)
    }

    /// Returns an in-order iterator over the elements. Use `iter().rev()` to walk from the last element.
    pub fn iter(&self) -> Iter<'_, D> {
        Iter::new(&self.raw)
    }

    /// Returns the first ordered element in the tree.
    ///
    /// # Errors
    ///
    /// Returns [Empty](Error::Empty) if the tree is empty.
    ///
    /// # Time Complexity
    ///
    /// O(1)
    ///
    pub fn front(&self) -> Result<&D> {
        self.raw.first().map(|node| unsafe { Node::value(node) }).ok_or(Error::Empty)
    }

    /// Returns the last ordered element in the tree.
    ///
    /// # Errors
    ///
    /// Returns [Empty](Error::Empty) if the tree is empty.
    ///
    /// # Time Complexity
    ///
    /// O(1)
    ///
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
        Some(self.remove_node(node).0)
    }

    /// Removes and returns the last ordered element.
    pub fn pop_last(&mut self) -> Option<D> {
        let node = self.raw.last()?;
        Some(self.remove_node(node).0)
    }

    /// Removes every element, returning all nodes to the allocator.
    pub fn clear(&mut self) {
        log::debug!("Rbt: clearing {} elements", self.raw.len);
        self.raw.clear();
    }

    /// Exchanges the contents of two trees, including their allocators.
    ///
    /// # Time Complexity
    ///
    /// O(1)
    ///
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.raw, &mut other.raw);
    }

    /// Unlinks a node, restores the red-black properties, and returns its value together with the node holding its
    /// in-order successor.
    fn remove_node(&mut self, node: NonNull<Node<D>>) -> (D, Link<D>) {
        self.raw.remove_node(node, Self::fix_delete)
    }

    /// Updates the tree after a red node has been linked as a leaf, to meet the red-black tree properties.
    fn fix_insert(raw: &mut RawTree<D, A>, mut node: NonNull<Node<D>>) {
        while let Some(mut parent) = node.parent().filter(|parent| parent.is_red()) {
            // Case 2: the root is always black, so a red parent has a parent of its own.
            let Some(grandparent) = parent.parent() else {
                break;
            };
            let uncle = Node::sibling(parent);

            // Case 3: Uncle is red, recolor parent, grandparent, uncle and continue from the grandparent.
            if uncle.is_red() {
                parent.set_black();
                uncle.set_black();
                grandparent.set_red();
                node = grandparent;
                continue;
            }

            // Parent is left child of grandparent
            if grandparent.left() == Some(parent) {
                // Case 4a: uncle is black and node is left->right "inner child" of its grandparent
                if parent.right() == Some(node) {
                    raw.rotate_left(parent);
                    core::mem::swap(&mut node, &mut parent);
                }
                // Case 5a: uncle is black and node is left->left "outer child" of its grandparent
                parent.set_black();
                grandparent.set_red();
                raw.rotate_right(grandparent);
            }
            // Parent is right child of grandparent
            else {
                // Case 4b: uncle is black and node is right->left "inner child" of its grandparent
                if parent.left() == Some(node) {
                    raw.rotate_right(parent);
                    core::mem::swap(&mut node, &mut parent);
                }
                // Case 5b: uncle is black and node is right->right "outer child" of its grandparent
                parent.set_black();
                grandparent.set_red();
                raw.rotate_left(grandparent);
            }
        }

        // Case 1: the root is black.
        raw.root.set_black();
    }

    /// Updates the tree after a black node has been unlinked, to meet the red-black tree properties.
    ///
    /// `node` took the place of the unlinked node and carries an extra black; it may be absent, so its position is
    /// identified by `parent`.
    fn fix_delete(raw: &mut RawTree<D, A>, mut node: Link<D>, mut parent: Link<D>) {
        while node != raw.root && node.is_black() {
            let Some(p) = parent else {
                break;
            };

            if p.left() == node {
                let mut sibling = p.right();

                // Case 2: The sibling is red
                if sibling.is_red() {
                    sibling.set_black();
                    p.set_red();
                    raw.rotate_left(p);
                    sibling = p.right();
                }

                // Cases 3+4: Black sibling with two black children, move the extra black up.
                if sibling.left().is_black() && sibling.right().is_black() {
                    sibling.set_red();
                    node = Some(p);
                    parent = p.parent();
                    continue;
                }

                // Case 5: Black sibling with a red inner nephew and a black outer nephew
                if sibling.right().is_black() {
                    sibling.left().set_black();
                    sibling.set_red();
                    if let Some(s) = sibling {
                        raw.rotate_right(s);
                    }
                    sibling = p.right();
                }

                // Case 6: Black sibling with a red outer nephew, recolor and rotate around the parent
                sibling.set_color(p.color());
                p.set_black();
                sibling.right().set_black();
                raw.rotate_left(p);
            } else {
                let mut sibling = p.left();

                // Case 2: The sibling is red
                if sibling.is_red() {
                    sibling.set_black();
                    p.set_red();
                    raw.rotate_right(p);
                    sibling = p.left();
                }

                // Cases 3+4: Black sibling with two black children, move the extra black up.
                if sibling.left().is_black() && sibling.right().is_black() {
                    sibling.set_red();
                    node = Some(p);
                    parent = p.parent();
                    continue;
                }

                // Case 5: Black sibling with a red inner nephew and a black outer nephew
                if sibling.left().is_black() {
                    sibling.right().set_black();
                    sibling.set_red();
                    if let Some(s) = sibling {
                        raw.rotate_left(s);
                    }
                    sibling = p.left();
                }

                // Case 6: Black sibling with a red outer nephew, recolor and rotate around the parent
                sibling.set_color(p.color());
                p.set_black();
                sibling.left().set_black();
                raw.rotate_right(p);
            }

            node = raw.root;
            parent = None;
        }

        node.set_black();
    }

    /// Links a new node at a vacant position and rebalances.
    fn insert_vacant(&mut self, parent: Link<D>, left: bool, value: D) -> Result<NonNull<Node<D>>> {
        let node = self.raw.insert_vacant(parent, left, value)?;
        if parent.is_none() {
            node.set_black();
        } else {
            Self::fix_insert(&mut self.raw, node);
        }
        Ok(node)
    }
}

impl<D, A> Rbt<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Creates a tree from the elements of an iterator, obtaining its nodes from `alloc`.
    ///
    /// Elements whose key is already present are dropped.
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
    {
        let mut rbt = Self::new_in(alloc);
        for value in iter {
            rbt.insert(value)?;
        }
        Ok(rbt)
    }

    /// Adds a value into the tree.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
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

    /// Adds a value into the tree unless an element with the same key exists.
    ///
    /// Returns a cursor at the element with the key of `value`, and whether `value` was inserted. When the key was
    /// already present, `value` is dropped and the existing element is left untouched.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated.
    ///
    pub fn insert(&mut self, value: D) -> Result<(Cursor<'_, D>, bool)> {
        match self.raw.search(value.key()) {
            Search::Found(node) => Ok((Cursor::new(&self.raw, Some(node)), false)),
            Search::Vacant { parent, left } => {
                let node = self.insert_vacant(parent, left, value)?;
                Ok((Cursor::new(&self.raw, Some(node)), true))
            }
        }
    }

    /// Constructs a value in place if no element with `key` exists.
    ///
    /// `f` is only called when `key` is absent. If the value it returns has a different key, it is inserted at the
    /// position of its own key instead.
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated.
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
        let node = self.insert_vacant(parent, left, value)?;
        Ok((Cursor::new(&self.raw, Some(node)), true))
    }

    /// Removes the element with the given key, returning it.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    /// # Errors
    ///
    /// Returns [NotFound](Error::NotFound) if no element has the key.
    ///
    pub fn remove(&mut self, key: &D::Key) -> Result<D> {
        let node = self.raw.find_node(key).ok_or(Error::NotFound)?;
        Ok(self.remove_node(node).0)
    }

    /// Returns a cursor at the element with the given key, or at the end position if there is none.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    pub fn find(&self, key: &D::Key) -> Cursor<'_, D> {
        Cursor::new(&self.raw, self.raw.find_node(key).or(self.raw.end))
    }

    /// Returns a cursor that can remove elements, positioned at the element with the given key, or at the end
    /// position if there is none.
    pub fn find_mut(&mut self, key: &D::Key) -> CursorMut<'_, D, A> {
        let current = self.raw.find_node(key).or(self.raw.end);
        CursorMut::new(&mut self.raw, current, Self::fix_delete)
    }

    /// Searches for a value in the tree, returning it if it exists.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
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
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    pub fn get_closest(&self, key: &D::Key) -> Option<&D> {
        self.raw.closest_node(key).map(|node| unsafe { Node::value(node) })
    }
}

impl<D, A> Rbt<D, A>
where
    D: SortKey + Clone,
    A: NodeAllocator + Clone,
{
    /// Creates a deep copy of the tree, obtaining the new nodes from a clone of the allocator.
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if a node could not be allocated. The partial copy is
    /// discarded.
    pub fn try_clone(&self) -> Result<Self> {
        let mut rbt = Self::new_in(self.raw.alloc.clone());
        self.raw.try_for_each_preorder(|value| rbt.push(value.clone()))?;
        Ok(rbt)
    }
}

#[cfg(feature = "alloc")]
impl<D, A> Rbt<D, A>
where
    D: Clone,
    A: NodeAllocator,
{
    /// Returns the ordered values of the tree.
    pub fn to_vec(&self) -> alloc::vec::Vec<D> {
        self.iter().cloned().collect()
    }
}

impl<D, A> Default for Rbt<D, A>
where
    A: NodeAllocator + Default,
{
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<D, A> Clone for Rbt<D, A>
where
    D: SortKey + Clone,
    A: NodeAllocator + Clone,
{
    /// Creates a deep copy of the tree. If the allocator runs out of memory the copy is abandoned, the failure is
    /// logged, and an empty tree is returned.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(rbt) => rbt,
            Err(err) => {
                log::error!("Rbt: clone of {} elements abandoned: {}", self.len(), err);
                Self::new_in(self.raw.alloc.clone())
            }
        }
    }
}

impl<D, A> Extend<D> for Rbt<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Inserts every element of the iterator. Duplicates are dropped, and the first allocation failure stops the
    /// extension with a warning.
    fn extend<I: IntoIterator<Item = D>>(&mut self, iter: I) {
        for value in iter {
            if let Err(err) = self.insert(value) {
                log::warn!("Rbt: extend stopped after {} elements: {}", self.len(), err);
                break;
            }
        }
    }
}

impl<D> FromIterator<D> for Rbt<D, Global>
where
    D: SortKey,
{
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        let mut rbt = Self::new();
        rbt.extend(iter);
        rbt
    }
}

impl<D, const N: usize> From<[D; N]> for Rbt<D, Global>
where
    D: SortKey,
{
    fn from(values: [D; N]) -> Self {
        Self::from_iter(values)
    }
}

impl<'a, D, A> IntoIterator for &'a Rbt<D, A>
where
    A: NodeAllocator,
{
    type Item = &'a D;
    type IntoIter = Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D, A> IntoIterator for Rbt<D, A>
where
    A: NodeAllocator,
{
    type Item = D;
    type IntoIter = IntoIter<D, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.raw)
    }
}

impl<D, A, B> PartialEq<Rbt<D, B>> for Rbt<D, A>
where
    D: PartialEq,
    A: NodeAllocator,
    B: NodeAllocator,
{
    fn eq(&self, other: &Rbt<D, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<D, A> Eq for Rbt<D, A>
where
    D: Eq,
    A: NodeAllocator,
{
}

impl<D, A, B> PartialOrd<Rbt<D, B>> for Rbt<D, A>
where
    D: PartialOrd,
    A: NodeAllocator,
    B: NodeAllocator,
{
    fn partial_cmp(&self, other: &Rbt<D, B>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<D, A> Ord for Rbt<D, A>
where
    D: Ord,
    A: NodeAllocator,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<D, A> Hash for Rbt<D, A>
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

impl<D, A> fmt::Debug for Rbt<D, A>
where
    D: fmt::Debug,
    A: NodeAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl<D, A> Rbt<D, A>
where
    D: SortKey,
    A: NodeAllocator,
{
    /// Asserts every red-black property on top of the structural invariants of the tree.
    pub(crate) fn assert_rbt(&self) {
        fn black_height<D>(node: Link<D>) -> usize {
            let Some(node) = node.real() else {
                return 1;
            };
            if node.is_red() {
                assert!(node.left().is_black() && node.right().is_black(), "red node with a red child");
            }
            let left = black_height(node.left());
            let right = black_height(node.right());
            assert_eq!(left, right, "unequal black height");
            left + node.is_black() as usize
        }

        self.raw.assert_structure();
        assert!(self.raw.root.is_black(), "root is red");
        black_height(self.raw.root);
    }
}


#[cfg(test)]
mod fuzz_tests {
    extern crate std;

    use crate::Rbt;
    use rand::{seq::SliceRandom, Rng};
    use std::{
        collections::{BTreeSet, HashSet},
        vec::Vec,
    };

    const RBT_MAX_SIZE: usize = 0x1000;

    fn random_numbers(count: usize) -> Vec<u32> {
        let mut rng = rand::thread_rng();
        let min = 1;
        let max = 100_000;

        let mut random_numbers = HashSet::new();
        while random_numbers.len() < count {
            random_numbers.insert(rng.gen_range(min..=max));
        }

        let mut random_numbers: Vec<_> = random_numbers.into_iter().collect();
        random_numbers.shuffle(&mut rng);
        random_numbers
    }

    #[test]
    fn fuzz_add() {
        for _ in 0..20 {
            let mut rbt = Rbt::new();
            let mut random_numbers = random_numbers(RBT_MAX_SIZE);
            for num in random_numbers.iter() {
                assert!(rbt.push(*num).is_ok());
            }
            assert!(rbt.height() < 25);
            random_numbers.sort();

            assert_eq!(rbt.to_vec(), random_numbers);
            assert_eq!(rbt.front(), Ok(&random_numbers[0]));
            assert_eq!(rbt.back(), Ok(&random_numbers[RBT_MAX_SIZE - 1]));
            rbt.assert_rbt();
        }
    }

    #[test]
    fn fuzz_delete() {
        for _ in 0..20 {
            let mut rbt = Rbt::new();
            let mut random_numbers = random_numbers(RBT_MAX_SIZE);
            for num in random_numbers.iter() {
                assert!(rbt.push(*num).is_ok());
            }

            // Delete all the numbers
            random_numbers.shuffle(&mut rand::thread_rng());
            while let Some(num) = random_numbers.pop() {
                assert_eq!(rbt.remove(&num), Ok(num));
                if random_numbers.len() % 512 == 0 {
                    rbt.assert_rbt();
                }
            }
            assert_eq!(rbt.len(), 0);
            assert!(rbt.raw.root.is_none());
            assert!(rbt.begin() == rbt.end());
        }
    }

    #[test]
    fn fuzz_search() {
        let mut rbt = Rbt::new();
        let mut rng = rand::thread_rng();
        let min = 1;
        let max = 100_000;

        let random_numbers = random_numbers(RBT_MAX_SIZE);
        for num in random_numbers.iter() {
            assert!(rbt.push(*num).is_ok());
        }

        // Search for numbers that exist in the tree
        for _ in 0..100_000 {
            let num = random_numbers.choose(&mut rng).unwrap();
            assert_eq!(rbt.find(num).get(), Some(num));
        }

        // Search for numbers that do not exist in the tree
        for _ in 0..100_000 {
            let to_search = rng.gen_bool(0.5);
            let random_number =
                if to_search { rng.gen_range(0..=min - 1) } else { rng.gen_range(max + 1..=max + 50_000) };
            assert!(rbt.find(&random_number).is_end());
        }
    }

    #[test]
    fn fuzz_interleaved_against_btreeset() {
        let mut rng = rand::thread_rng();
        let mut rbt = Rbt::new();
        let mut reference = BTreeSet::new();

        for step in 0..50_000 {
            let num: u16 = rng.gen_range(0..2048);
            if rng.gen_bool(0.55) {
                let (_, inserted) = rbt.insert(num).unwrap();
                assert_eq!(inserted, reference.insert(num));
            } else {
                assert_eq!(rbt.remove(&num).ok(), reference.take(&num));
            }

            assert_eq!(rbt.len(), reference.len());
            assert_eq!(rbt.front().ok(), reference.first());
            assert_eq!(rbt.back().ok(), reference.last());
            if step % 1000 == 0 {
                rbt.assert_rbt();
                assert!(rbt.iter().eq(reference.iter()));
            }
        }
        assert!(rbt.iter().rev().eq(reference.iter().rev()));
    }
}
