//! Ordered Collections - Blocking Queue
//!
//! A FIFO queue that can be shared between threads. Consumers either poll with [try_pop](BlockingQueue::try_pop) or
//! block until a producer pushes an element.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use std::{
    collections::VecDeque,
    fmt,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// A thread-safe FIFO queue whose consumers can wait for elements.
///
/// A panic while the lock is held does not invalidate the queue: every operation leaves the underlying container
/// consistent, so a poisoned lock is recovered rather than propagated.
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub struct BlockingQueue<T> {
    queue: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        BlockingQueue { queue: Mutex::new(VecDeque::new()), available: Condvar::new() }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an element and wakes one waiting consumer.
    pub fn push(&self, value: T) {
        self.lock().push_back(value);
        self.available.notify_one();
    }

    /// Removes the oldest element without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes the oldest element, blocking until one is available.
    pub fn wait_and_pop(&self) -> T {
        let mut queue = self.lock();
        loop {
            if let Some(value) = queue.pop_front() {
                return value;
            }
            // Wakeups may be spurious, the loop re-checks the queue.
            queue = self.available.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the oldest element, blocking for at most `timeout`.
    ///
    /// Returns `None` if no element became available in time.
    pub fn wait_and_pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        loop {
            if let Some(value) = queue.pop_front() {
                return Some(value);
            }
            let remaining = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero())?;
            queue = self.available.wait_timeout(queue, remaining).unwrap_or_else(PoisonError::into_inner).0;
        }
    }

    /// Returns the number of queued elements.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Indicates whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, vec::Vec};

    #[test]
    fn test_fifo_order() {
        let queue = BlockingQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);

        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.wait_and_pop(), 0);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!((0..3).map(|_| queue.wait_and_pop()).collect::<Vec<_>>(), [2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wait_and_pop_blocks_until_push() {
        let queue = Arc::new(BlockingQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || (0..100).map(|_| queue.wait_and_pop()).sum::<u32>())
        };

        for i in 0..100 {
            queue.push(i);
            if i % 10 == 0 {
                thread::yield_now();
            }
        }
        assert_eq!(consumer.join().unwrap(), (0..100).sum());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_many_producers() {
        let queue = Arc::new(BlockingQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(p * 1000 + i);
                    }
                })
            })
            .collect();

        let mut received: Vec<u32> = (0..1000).map(|_| queue.wait_and_pop()).collect();
        for producer in producers {
            producer.join().unwrap();
        }

        received.sort();
        let expected: Vec<u32> = (0..4).flat_map(|p| (0..250).map(move |i| p * 1000 + i)).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_wait_and_pop_timeout() {
        let queue = BlockingQueue::<u8>::new();
        assert_eq!(queue.wait_and_pop_timeout(Duration::from_millis(10)), None);
        assert_eq!(queue.wait_and_pop_timeout(Duration::ZERO), None);

        queue.push(7);
        assert_eq!(queue.wait_and_pop_timeout(Duration::from_millis(10)), Some(7));

        let queue = Arc::new(queue);
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(9);
            })
        };
        assert_eq!(queue.wait_and_pop_timeout(Duration::from_secs(10)), Some(9));
        producer.join().unwrap();
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let queue = Arc::new(BlockingQueue::new());
        queue.push(1);
        let poisoner = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let _guard = queue.queue.lock().unwrap();
                panic!("poison the queue lock");
            })
        };
        assert!(poisoner.join().is_err());

        queue.push(2);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.wait_and_pop(), 2);
    }
}
