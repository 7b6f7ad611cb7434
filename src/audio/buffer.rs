//! Lock-free chunk queue between audio threads
//!
//! A single-producer single-consumer (SPSC) queue carrying raw PCM chunks
//! between the capture callback and the sending worker, or between the
//! receiving worker and the playback callback.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One chunk of raw PCM audio (i16 little-endian, interleaved)
///
/// Chunks are transient: born in one iteration of a capture/receive loop and
/// discarded once sent or played. Transport reads may produce chunks shorter
/// than the nominal capture size.
#[derive(Clone)]
pub struct AudioChunk {
    /// Raw sample bytes
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for AudioChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Lock-free queue of audio chunks
pub struct ChunkQueue {
    queue: ArrayQueue<AudioChunk>,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl ChunkQueue {
    /// Create a new queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Push a chunk into the queue
    /// Returns false if the queue is full (overflow)
    pub fn push(&self, chunk: AudioChunk) -> bool {
        match self.queue.push(chunk) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop a chunk from the queue
    /// Returns None if the queue is empty (underrun)
    pub fn pop(&self) -> Option<AudioChunk> {
        match self.queue.pop() {
            Some(chunk) => Some(chunk),
            None => {
                self.underrun_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Try to pop without counting underrun
    pub fn try_pop(&self) -> Option<AudioChunk> {
        self.queue.pop()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Get underrun count
    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a chunk queue
pub type SharedChunkQueue = Arc<ChunkQueue>;

/// Create a new shared chunk queue
pub fn create_shared_queue(capacity: usize) -> SharedChunkQueue {
    Arc::new(ChunkQueue::new(capacity))
}
