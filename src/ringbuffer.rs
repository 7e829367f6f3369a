// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Fixed-capacity queues bridging the real-time and worker timing domains.
//!
//! Two concurrency profiles are provided:
//! - [`spsc`]: a single-producer/single-consumer ring used wherever the real-time
//!   thread is on one side (control input, per-port audio output).
//! - [`MpmcQueue`]: a multi-producer/multi-consumer queue used between workers only.
//!
//! Neither blocks and neither allocates after construction. Capacities are rounded up
//! to the next power of two.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Rounds a requested capacity up to the power of two actually allocated.
pub fn ring_capacity(requested: usize) -> usize {
    requested.max(1).next_power_of_two()
}

/// Creates a connected SPSC producer/consumer pair.
pub fn spsc<T>(capacity: usize) -> (SpscProducer<T>, SpscConsumer<T>) {
    let rb = HeapRb::<T>::new(ring_capacity(capacity));
    let (producer, consumer) = rb.split();
    (
        SpscProducer { inner: producer },
        SpscConsumer { inner: consumer },
    )
}

/// Writing half of an SPSC ring. Exactly one thread may hold it at a time.
pub struct SpscProducer<T> {
    inner: HeapProd<T>,
}

impl<T> SpscProducer<T> {
    /// Pushes an item. Returns false (dropping the item) when the ring is full.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        self.inner.try_push(item).is_ok()
    }

    /// Number of free slots.
    #[inline]
    pub fn vacant(&self) -> usize {
        self.inner.vacant_len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl<T: Copy> SpscProducer<T> {
    /// Pushes as many items from the slice as fit. Returns the number pushed.
    #[inline]
    pub fn push_slice(&mut self, items: &[T]) -> usize {
        self.inner.push_slice(items)
    }
}

/// Reading half of an SPSC ring. Exactly one thread may hold it at a time.
pub struct SpscConsumer<T> {
    inner: HeapCons<T>,
}

impl<T> SpscConsumer<T> {
    /// Pops the oldest item, or None if the ring is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.inner.try_pop()
    }

    /// Number of items ready to be read.
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl<T: Copy> SpscConsumer<T> {
    /// Pops up to `output.len()` items. Returns the number popped.
    #[inline]
    pub fn pop_slice(&mut self, output: &mut [T]) -> usize {
        self.inner.pop_slice(output)
    }
}

/// A bounded MPMC queue shared by reference between any number of threads.
pub struct MpmcQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    capacity: usize,
}

impl<T> MpmcQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = ring_capacity(capacity);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Pushes an item, handing it back if the queue is full.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), T> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Pushes an item. Returns false (dropping the item) when the queue is full.
    #[inline]
    pub fn push(&self, item: T) -> bool {
        self.try_push(item).is_ok()
    }

    /// Pops an item, or None if the queue is empty.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> std::fmt::Debug for MpmcQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpmcQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
