//! A `no_std` library of ordered containers whose nodes are obtained from a pluggable
//! [NodeAllocator]. The currently supported data structures are a [Red-Black Tree](Rbt), an unbalanced
//! [Binary Search Tree](Bst), and, with the `std` feature, a [Blocking Queue](BlockingQueue). The RBT is the
//! preferred choice in all cases where the insertion order cannot be controlled; the BST is kept as its
//! unbalanced peer and degenerates into a list on sorted input.
//!
//! Both trees terminate their in-order sequence with a sentinel "end" node. The sentinel is the right child of
//! the maximum element, carries no value, and gives [end](Rbt::end) a stable position that cursors can walk to
//! and from. The minimum element is cached so [begin](Rbt::begin) and [front](Rbt::front) are O(1).
//!
//! Memory for the nodes comes from a [NodeAllocator]. The `alloc` feature (enabled by default) provides
//! [Global], which forwards to the global allocator. [BlockPool] carves a caller-provided slice into fixed-size
//! blocks, so a tree can be used where dynamic memory allocation is not available. Allocation failure is never a
//! panic: fallible operations return [Error::AllocationFailed] and leave the tree as it was.
//!
//! We use a custom `SortKey` trait for ordering the elements in the data structures. A blanket implementation is
//! provided for all types that implement the `Ord` trait, however the user can implement the trait for their own
//! types to provide a different key for sorting, than the type itself.
//!
//! ## Benchmarks
//!
//! There are currently some benchmarks available in the `benches` directory. These benchmarks test the
//! performance of the data structures with 4096 entries of 32bit, 128bit, and 384bit key sizes respectively,
//! against `std::collections::BTreeSet` as a baseline. The tests are as follows:
//!
//! - Insertion: Time to completely fill the data structure with random numbers.
//! - Search: Time it takes to search for every element in the data structure once.
//! - Delete: Time it takes to delete every element in the data structure.
//!
//! ## Examples
//!
//! ```rust
//! use ordered_collections::{BlockPool, Rbt, node_size};
//!
//! const MAX_SIZE: usize = 64;
//!
//! // One extra block for the sentinel.
//! let mut mem = [0u8; (MAX_SIZE + 1) * node_size::<u32>() + 16];
//! let pool = BlockPool::new::<u32>(&mut mem);
//! let mut rbt: Rbt<u32, _> = Rbt::new_in(&pool);
//!
//! for num in [10, 5, 20, 3, 7, 15, 25] {
//!     rbt.push(num).unwrap();
//! }
//!
//! assert_eq!(rbt.front(), Ok(&3));
//! assert_eq!(rbt.back(), Ok(&25));
//! assert!(rbt.iter().copied().eq([3, 5, 7, 10, 15, 20, 25]));
//! assert!(rbt.find(&8).is_end());
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod allocator;
mod bst;
mod iter;
mod node;
#[cfg(feature = "std")]
mod queue;
mod raw;
mod rbt;

pub use allocator::{BlockPool, CountingAllocator, Global, NodeAllocator};
pub use bst::Bst;
pub use iter::{Cursor, CursorMut, IntoIter, Iter};
pub use node::{node_layout, node_size};
#[cfg(feature = "std")]
pub use queue::BlockingQueue;
pub use rbt::Rbt;

/// Public result type for the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Public error types for the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not provide memory for a node.
    AllocationFailed,
    /// The node was not found in the tree.
    NotFound,
    /// The node already exists in the tree.
    AlreadyExists,
    /// A checked accessor was used on an empty container.
    Empty,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::AllocationFailed => write!(f, "node allocation failed"),
            Error::NotFound => write!(f, "value not found"),
            Error::AlreadyExists => write!(f, "value already exists"),
            Error::Empty => write!(f, "container is empty"),
        }
    }
}

impl core::error::Error for Error {}

/// A trait to allow a type to use a different key than `self` for ordering.
pub trait SortKey {
    /// The type used for ordering the elements in the tree.
    type Key: Ord;

    /// Returns the key.
    fn key(&self) -> &Self::Key;
}

impl<T> SortKey for T
where
    T: Ord,
{
    type Key = Self;
    fn key(&self) -> &T {
        self
    }
}
