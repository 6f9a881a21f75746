//! Ordered Collections - Node Allocators
//!
//! The trees never touch a global heap directly. Every node, including the sentinel, is obtained from a
//! [NodeAllocator] and handed back to it when the node is unlinked.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::{
    alloc::Layout,
    cell::Cell,
    fmt,
    marker::PhantomData,
    mem::{align_of, size_of},
    ptr::NonNull,
};

use crate::{node::node_layout, Error, Result};

/// A source of memory for tree nodes.
///
/// # Safety
///
/// A successful [allocate](Self::allocate) must return memory that is valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and not handed out again until it is returned through
/// [deallocate](Self::deallocate).
pub unsafe trait NodeAllocator {
    /// Allocates a block of memory described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns [AllocationFailed](Error::AllocationFailed) if the memory cannot be provided.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Returns a block of memory to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [allocate](Self::allocate) on this allocator with the same `layout`, and
    /// must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<A> NodeAllocator for &A
where
    A: NodeAllocator + ?Sized,
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The global memory allocator.
///
/// Without the `alloc` feature there is no global heap to forward to and every request fails, so trees built on
/// `Global` stay empty. Use a [BlockPool] instead.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

unsafe impl NodeAllocator for Global {
    #[cfg(feature = "alloc")]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8).ok_or(Error::AllocationFailed);
        }
        NonNull::new(unsafe { alloc::alloc::alloc(layout) }).ok_or(Error::AllocationFailed)
    }

    #[cfg(not(feature = "alloc"))]
    fn allocate(&self, _layout: Layout) -> Result<NonNull<u8>> {
        Err(Error::AllocationFailed)
    }

    #[cfg(feature = "alloc")]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }

    #[cfg(not(feature = "alloc"))]
    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}
}

/// Header written into every block that is currently free.
struct FreeBlock {
    next: Option<NonNull<FreeBlock>>,
}

/// A fixed-size block allocator backed by a caller provided slice of memory.
///
/// The slice is carved into equally sized blocks which are kept in a linked list of free blocks. Allocation and
/// deallocation are O(1). Requests larger than the block size, or more strictly aligned, fail.
///
/// Use [node_size](crate::node_size) to size the slice: a tree holding `n` elements needs `n + 1` blocks, the extra
/// one being the sentinel. Up to one block alignment worth of bytes may be lost at the start of the slice.
pub struct BlockPool<'a> {
    free: Cell<Option<NonNull<FreeBlock>>>,
    block: Layout,
    capacity: usize,
    available: Cell<usize>,
    _memory: PhantomData<&'a mut [u8]>,
}

impl<'a> BlockPool<'a> {
    /// Creates a pool whose blocks hold one node of a tree storing `D`.
    pub fn new<D>(slice: &'a mut [u8]) -> Self {
        Self::with_layout(slice, node_layout::<D>())
    }

    /// Creates a pool whose blocks satisfy `layout`.
    pub fn with_layout(slice: &'a mut [u8], layout: Layout) -> Self {
        let block = match Layout::from_size_align(
            layout.size().max(size_of::<FreeBlock>()),
            layout.align().max(align_of::<FreeBlock>()),
        ) {
            Ok(block) => block.pad_to_align(),
            Err(_) => {
                log::warn!("BlockPool: unsupported block layout {:?}", layout);
                return Self::empty(layout);
            }
        };

        let start = slice.as_mut_ptr();
        let offset = start.align_offset(block.align());
        if offset > slice.len() {
            return Self::empty(block);
        }
        let capacity = (slice.len() - offset) / block.size();

        // Thread the free list from the back so that the lowest addresses are handed out first.
        let mut free = None;
        for i in (0..capacity).rev() {
            let ptr = unsafe { start.add(offset + i * block.size()) }.cast::<FreeBlock>();
            unsafe { ptr.write(FreeBlock { next: free }) };
            free = NonNull::new(ptr);
        }

        log::debug!("BlockPool: {} blocks of {} bytes", capacity, block.size());
        BlockPool {
            free: Cell::new(free),
            block,
            capacity,
            available: Cell::new(capacity),
            _memory: PhantomData,
        }
    }

    fn empty(block: Layout) -> Self {
        BlockPool { free: Cell::new(None), block, capacity: 0, available: Cell::new(0), _memory: PhantomData }
    }

    /// Returns the total number of blocks in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of blocks that can still be allocated.
    pub fn available(&self) -> usize {
        self.available.get()
    }

    /// Returns the layout of a single block.
    pub fn block_layout(&self) -> Layout {
        self.block
    }
}

unsafe impl NodeAllocator for BlockPool<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() > self.block.size() || layout.align() > self.block.align() {
            return Err(Error::AllocationFailed);
        }
        let head = self.free.get().ok_or(Error::AllocationFailed)?;
        self.free.set(unsafe { (*head.as_ptr()).next });
        self.available.set(self.available.get() - 1);
        Ok(head.cast())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        let block = ptr.cast::<FreeBlock>();
        unsafe { block.as_ptr().write(FreeBlock { next: self.free.get() }) };
        self.free.set(Some(block));
        self.available.set(self.available.get() + 1);
    }
}

impl fmt::Debug for BlockPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("block_size", &self.block.size())
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// An allocator adapter that counts live allocations and can be limited to a fixed number of successful
/// allocations.
///
/// Once the budget is spent every further request fails with [AllocationFailed](Error::AllocationFailed), which
/// makes the failure paths of the containers reachable on demand.
#[derive(Debug, Clone, Default)]
pub struct CountingAllocator<A> {
    inner: A,
    live: Cell<usize>,
    budget: Cell<Option<usize>>,
}

impl<A> CountingAllocator<A>
where
    A: NodeAllocator,
{
    /// Wraps `inner` without a budget.
    pub const fn new(inner: A) -> Self {
        CountingAllocator { inner, live: Cell::new(0), budget: Cell::new(None) }
    }

    /// Wraps `inner`, allowing only `budget` more successful allocations.
    pub const fn with_budget(inner: A, budget: usize) -> Self {
        CountingAllocator { inner, live: Cell::new(0), budget: Cell::new(Some(budget)) }
    }

    /// Returns the number of allocations that have not been returned yet.
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Replaces the remaining budget. `None` removes the limit.
    pub fn set_budget(&self, budget: Option<usize>) {
        self.budget.set(budget);
    }

    /// Returns the wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

unsafe impl<A> NodeAllocator for CountingAllocator<A>
where
    A: NodeAllocator,
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        match self.budget.get() {
            Some(0) => return Err(Error::AllocationFailed),
            Some(n) => self.budget.set(Some(n - 1)),
            None => (),
        }
        let ptr = self.inner.allocate(layout)?;
        self.live.set(self.live.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::node_size;

    #[test]
    fn test_block_pool() {
        let mut memory = [0u8; 10 * 64 + 64];
        let layout = Layout::from_size_align(64, 8).unwrap();
        let pool = BlockPool::with_layout(&mut memory, layout);
        assert!(pool.capacity() >= 10);
        let capacity = pool.capacity();

        // Fill the pool
        let mut blocks = std::vec::Vec::new();
        for i in 0..capacity {
            blocks.push(pool.allocate(layout).unwrap());
            assert_eq!(pool.available(), capacity - i - 1);
        }

        // Ensure we can't allocate more than the pool capacity
        assert_eq!(pool.allocate(layout), Err(Error::AllocationFailed));

        // Blocks are handed out in address order and never overlap
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].as_ptr() as usize - pair[0].as_ptr() as usize, 64);
        }

        // Return a block and get the same one back
        let returned = blocks[5];
        unsafe { pool.deallocate(returned, layout) };
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.allocate(layout).unwrap(), returned);
    }

    #[test]
    fn test_block_pool_rejects_large_layouts() {
        let mut memory = [0u8; 4 * 32 + 32];
        let pool = BlockPool::with_layout(&mut memory, Layout::from_size_align(32, 8).unwrap());
        assert_eq!(pool.allocate(Layout::from_size_align(33, 8).unwrap()), Err(Error::AllocationFailed));
        assert_eq!(pool.allocate(Layout::from_size_align(8, 64).unwrap()), Err(Error::AllocationFailed));
        assert!(pool.allocate(Layout::from_size_align(16, 4).unwrap()).is_ok());
    }

    #[test]
    fn test_block_pool_too_small() {
        let mut memory = [0u8; 4];
        let pool = BlockPool::new::<u64>(&mut memory);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.allocate(node_layout::<u64>()), Err(Error::AllocationFailed));
    }

    #[test]
    fn test_block_pool_node_sizing() {
        let mut memory = [0u8; 9 * 256];
        let pool = BlockPool::new::<u32>(&mut memory);
        assert_eq!(pool.block_layout().size(), node_size::<u32>());
        assert!(pool.capacity() >= 8);
    }

    #[test]
    #[cfg(feature = "alloc")]
    fn test_counting_allocator_budget() {
        let counting = CountingAllocator::with_budget(Global, 2);
        let layout = Layout::new::<u64>();
        let a = counting.allocate(layout).unwrap();
        let b = counting.allocate(layout).unwrap();
        assert_eq!(counting.live(), 2);
        assert_eq!(counting.allocate(layout), Err(Error::AllocationFailed));

        unsafe {
            counting.deallocate(a, layout);
            counting.deallocate(b, layout);
        }
        assert_eq!(counting.live(), 0);

        counting.set_budget(None);
        let c = counting.allocate(layout).unwrap();
        unsafe { counting.deallocate(c, layout) };
    }
}
