//! Byte queues passing events and commands between tasks.
//!
//! Each queue has exactly one producer and one consumer. The storage is
//! backed by `heapless::spsc`, which keeps its indices atomic, so the
//! producer may also live in an interrupt handler after the queue is split.

use core::fmt;

use heapless::spsc::{Consumer, Producer, Queue};

use crate::log;

/// Size of the outbound MIDI event queue. One slot is kept free, so it
/// holds 63 bytes, that is 21 records.
pub const MIDI_OUT_CAPACITY: usize = 64;

/// Size of the queue of pending button data replies. Holds 15 indices.
pub const COMMAND_CAPACITY: usize = 16;

/// Bytes taken by a single MIDI record.
pub const RECORD_SIZE: usize = 3;

/// Marker set on the first byte of every outbound MIDI record.
pub const RECORD_MARKER: u8 = 0x80;

/// Bounded FIFO of raw bytes.
///
/// The queue holds at most `N - 1` bytes. Pushing into a full queue drops
/// the byte. Tasks must never block on a full queue, losing an event is
/// preferred.
pub struct ByteQueue<const N: usize> {
    queue: Queue<u8, N>,
}

impl<const N: usize> fmt::Debug for ByteQueue<N> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "ByteQueue(len: {}, capacity: {})", self.len(), self.capacity())
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for ByteQueue<N> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "ByteQueue(len: {}, capacity: {})",
            self.len(),
            self.capacity()
        );
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteQueue<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// Returns `false` if the queue was full and the byte got dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        let accepted = self.queue.enqueue(byte).is_ok();
        if !accepted {
            log::warning!("Queue is full, dropping {=u8:#x}", byte);
        }
        accepted
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.queue.dequeue()
    }

    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.queue.peek().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Split into halves that can be handed to separate execution contexts.
    pub fn split(&mut self) -> (Producer<'_, u8, N>, Consumer<'_, u8, N>) {
        self.queue.split()
    }

    /// Enqueue a MIDI record `(0x80 | channel, number, value)`.
    ///
    /// Returns `false` if the record did not fit. It is then dropped as a
    /// whole, the queue never holds a partial record.
    pub fn push_record(&mut self, channel: u8, number: u8, value: u8) -> bool {
        if self.capacity() - self.len() < RECORD_SIZE {
            log::warning!("Queue is full, dropping record of CC {=u8}", number);
            return false;
        }
        self.push(RECORD_MARKER | (channel & 0x0F));
        self.push(number);
        self.push(value);
        true
    }

    /// Take the next complete MIDI record off the queue.
    ///
    /// Nothing happens until at least three bytes are queued. If the first
    /// byte does not carry the marker, it is discarded and `None` returned,
    /// so the queue realigns over the following calls.
    pub fn pop_record(&mut self) -> Option<(u8, u8, u8)> {
        if self.len() < RECORD_SIZE {
            return None;
        }
        let first = self.pop()?;
        if first & RECORD_MARKER == 0 {
            log::debug!("Skipping misaligned byte {=u8:#x}", first);
            return None;
        }
        let number = self.pop()?;
        let value = self.pop()?;
        Some((first & 0x0F, number, value))
    }
}
