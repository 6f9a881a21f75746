//! Ordered Collections - Iterators and cursors
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::{
    node::{Link, Node, NodeTrait},
    raw::RawTree,
    Global, NodeAllocator,
};

/// Restores the balance of a tree after a black node was unlinked.
pub(crate) type Rebalance<D, A> = fn(&mut RawTree<D, A>, Link<D>, Link<D>);

/// A read-only position in a tree: either an element or the end position.
///
/// Moving past the end wraps around: [move_next](Self::move_next) from the end lands on the first element and
/// [move_prev](Self::move_prev) from the first element lands on the end. Two cursors compare equal when they point
/// at the same position of the same tree.
pub struct Cursor<'a, D> {
    current: Link<D>,
    begin: Link<D>,
    end: Link<D>,
    _marker: PhantomData<&'a D>,
}

impl<'a, D> Cursor<'a, D> {
    pub(crate) fn new<A: NodeAllocator>(raw: &'a RawTree<D, A>, current: Link<D>) -> Self {
        Cursor { current, begin: raw.begin, end: raw.end, _marker: PhantomData }
    }

    pub(crate) fn node(&self) -> Link<D> {
        self.current
    }

    /// Returns the element at the cursor, or `None` at the end position.
    pub fn get(&self) -> Option<&'a D> {
        self.current.real().map(|node| unsafe { Node::value(node) })
    }

    /// Returns true if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.current.real().is_none()
    }

    /// Moves to the next element in order. From the last element the cursor moves to the end position, and from the
    /// end position to the first element.
    pub fn move_next(&mut self) {
        self.current = match self.current.real() {
            Some(node) => Node::successor(node),
            None => self.begin,
        };
    }

    /// Moves to the previous element in order. From the end position the cursor moves to the last element, and from
    /// the first element to the end position.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            Some(node) if Some(node) != self.begin => Node::predecessor(node),
            _ => self.end,
        };
    }

    /// Returns the element after the cursor without moving it.
    pub fn peek_next(&self) -> Option<&'a D> {
        let mut next = *self;
        next.move_next();
        next.get()
    }

    /// Returns the element before the cursor without moving it.
    pub fn peek_prev(&self) -> Option<&'a D> {
        let mut prev = *self;
        prev.move_prev();
        prev.get()
    }
}

impl<D> Clone for Cursor<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Cursor<'_, D> {}

impl<D> PartialEq for Cursor<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl<D> Eq for Cursor<'_, D> {}

impl<D: fmt::Debug> fmt::Debug for Cursor<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Cursor").field(value).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

unsafe impl<D: Sync> Send for Cursor<'_, D> {}
unsafe impl<D: Sync> Sync for Cursor<'_, D> {}

/// A cursor that can remove the element it points at.
///
/// Created by [Rbt::find_mut](crate::Rbt::find_mut) and [Bst::find_mut](crate::Bst::find_mut). It moves the same way
/// a [Cursor] does.
pub struct CursorMut<'a, D, A = Global>
where
    A: NodeAllocator,
{
    raw: &'a mut RawTree<D, A>,
    current: Link<D>,
    rebalance: Rebalance<D, A>,
}

impl<'a, D, A> CursorMut<'a, D, A>
where
    A: NodeAllocator,
{
    pub(crate) fn new(raw: &'a mut RawTree<D, A>, current: Link<D>, rebalance: Rebalance<D, A>) -> Self {
        CursorMut { raw, current, rebalance }
    }

    /// Returns the element at the cursor, or `None` at the end position.
    pub fn get(&self) -> Option<&D> {
        self.current.real().map(|node| unsafe { Node::value(node) })
    }

    /// Returns true if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.current.real().is_none()
    }

    /// Returns a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, D> {
        Cursor::new(&*self.raw, self.current)
    }

    /// Moves to the next element, wrapping through the end position.
    pub fn move_next(&mut self) {
        let mut cursor = self.as_cursor();
        cursor.move_next();
        self.current = cursor.node();
    }

    /// Moves to the previous element, wrapping through the end position.
    pub fn move_prev(&mut self) {
        let mut cursor = self.as_cursor();
        cursor.move_prev();
        self.current = cursor.node();
    }

    /// Removes the element at the cursor and moves the cursor to the next element.
    ///
    /// Returns `None`, leaving the tree untouched, if the cursor is at the end position.
    pub fn remove_current(&mut self) -> Option<D> {
        let node = self.current.real()?;
        let (value, next) = self.raw.remove_node(node, self.rebalance);
        self.current = next;
        Some(value)
    }
}

impl<D: fmt::Debug, A: NodeAllocator> fmt::Debug for CursorMut<'_, D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("CursorMut").field(value).finish(),
            None => f.write_str("CursorMut(end)"),
        }
    }
}

/// An in-order iterator over the elements of a tree.
pub struct Iter<'a, D> {
    front: Link<D>,
    back: Link<D>,
    len: usize,
    _marker: PhantomData<&'a D>,
}

impl<'a, D> Iter<'a, D> {
    pub(crate) fn new<A: NodeAllocator>(raw: &'a RawTree<D, A>) -> Self {
        Iter { front: raw.first(), back: raw.last(), len: raw.len, _marker: PhantomData }
    }
}

impl<'a, D> Iterator for Iter<'a, D> {
    type Item = &'a D;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.front.real()?;
        self.len -= 1;
        self.front = Node::successor(node);
        Some(unsafe { Node::value(node) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<D> DoubleEndedIterator for Iter<'_, D> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.back.real()?;
        self.len -= 1;
        self.back = Node::predecessor(node);
        Some(unsafe { Node::value(node) })
    }
}

impl<D> ExactSizeIterator for Iter<'_, D> {}

impl<D> FusedIterator for Iter<'_, D> {}

impl<D> Clone for Iter<'_, D> {
    fn clone(&self) -> Self {
        Iter { front: self.front, back: self.back, len: self.len, _marker: PhantomData }
    }
}

unsafe impl<D: Sync> Send for Iter<'_, D> {}
unsafe impl<D: Sync> Sync for Iter<'_, D> {}

/// An owning in-order iterator, returning every element to the caller and every node to the allocator.
pub struct IntoIter<D, A>
where
    A: NodeAllocator,
{
    raw: RawTree<D, A>,
}

impl<D, A> IntoIter<D, A>
where
    A: NodeAllocator,
{
    pub(crate) fn new(raw: RawTree<D, A>) -> Self {
        IntoIter { raw }
    }
}

impl<D, A> Iterator for IntoIter<D, A>
where
    A: NodeAllocator,
{
    type Item = D;

    fn next(&mut self) -> Option<D> {
        // The remaining nodes are never searched again, so the tree is not rebalanced.
        let node = self.raw.first()?;
        Some(self.raw.remove_node(node, |_, _, _| ()).0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len, Some(self.raw.len))
    }
}

impl<D, A> DoubleEndedIterator for IntoIter<D, A>
where
    A: NodeAllocator,
{
    fn next_back(&mut self) -> Option<D> {
        let node = self.raw.last()?;
        Some(self.raw.remove_node(node, |_, _, _| ()).0)
    }
}

impl<D, A> ExactSizeIterator for IntoIter<D, A> where A: NodeAllocator {}

impl<D, A> FusedIterator for IntoIter<D, A> where A: NodeAllocator {}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{raw::Search, Global};
    use std::vec::Vec;

    fn tree(values: &[u32]) -> RawTree<u32, Global> {
        let mut raw = RawTree::new_in(Global);
        for &value in values {
            if let Search::Vacant { parent, left } = raw.search(&value) {
                raw.insert_vacant(parent, left, value).unwrap();
            }
        }
        raw
    }

    #[test]
    fn test_iter_both_ends_meet() {
        let raw = tree(&[4, 2, 6, 1, 3, 5, 7]);
        assert_eq!(Iter::new(&raw).copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(Iter::new(&raw).rev().copied().collect::<Vec<_>>(), [7, 6, 5, 4, 3, 2, 1]);

        let mut iter = Iter::new(&raw);
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&7));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next_back(), Some(&6));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_iter_empty() {
        let raw = RawTree::<u32, Global>::new_in(Global);
        assert_eq!(Iter::new(&raw).next(), None);

        let raw = tree(&[]);
        assert_eq!(Iter::new(&raw).next_back(), None);
    }

    #[test]
    fn test_cursor_wraps_through_end() {
        let raw = tree(&[20, 10, 30]);
        let mut cursor = Cursor::new(&raw, raw.begin);
        assert_eq!(cursor.get(), Some(&10));
        assert_eq!(cursor.peek_prev(), None);
        assert_eq!(cursor.peek_next(), Some(&20));

        cursor.move_next();
        cursor.move_next();
        assert_eq!(cursor.get(), Some(&30));
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor, Cursor::new(&raw, raw.end));
        cursor.move_next();
        assert_eq!(cursor.get(), Some(&10));

        cursor.move_prev();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert_eq!(cursor.get(), Some(&30));
    }

    #[test]
    fn test_cursor_on_empty_tree_stays_at_end() {
        let raw = RawTree::<u32, Global>::new_in(Global);
        let mut cursor = Cursor::new(&raw, raw.end);
        assert!(cursor.is_end());
        cursor.move_next();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert!(cursor.is_end());
    }

    #[test]
    fn test_into_iter_drains_from_both_ends() {
        let mut iter = IntoIter::new(tree(&[5, 3, 8, 1, 4, 7, 9]));
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next_back(), Some(9));
        assert_eq!(iter.collect::<Vec<_>>(), [3, 4, 5, 7, 8]);
    }
}
