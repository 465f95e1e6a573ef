//! Bounded ring buffer between the capture and render callbacks
//!
//! The writer never blocks on the reader: when the buffer is full the oldest
//! unread samples are overwritten. The reader waits a bounded time for data
//! and returns whatever is available; zero-filling a short read is the
//! caller's job.

use ringbuf::ring_buffer::RbBase;
use ringbuf::{HeapRb, Rb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default bounded wait for `read`
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Thread-safe drop-oldest audio ring buffer
pub struct AudioRingBuffer {
    ring: Mutex<HeapRb<f32>>,
    data_ready: Condvar,
    capacity: usize,
    read_timeout: Duration,
    dropped_count: AtomicU64,
}

impl AudioRingBuffer {
    /// Create new ring buffer with given capacity
    ///
    /// # Arguments
    /// * `capacity` - Buffer capacity in samples
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_read_timeout(capacity, DEFAULT_READ_TIMEOUT)
    }

    /// Create a ring buffer whose `read` waits at most `read_timeout`
    pub fn with_read_timeout(capacity: usize, read_timeout: Duration) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        Self {
            ring: Mutex::new(HeapRb::<f32>::new(capacity)),
            data_ready: Condvar::new(),
            capacity,
            read_timeout,
            dropped_count: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeapRb<f32>> {
        // A panic on the other audio thread must not take this one down too
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write samples, evicting the oldest unread ones on overflow
    ///
    /// Never blocks on the reader and never fails. Wakes a waiting reader.
    ///
    /// # Returns
    /// Number of samples evicted (old unread samples plus any leading part
    /// of `samples` that could not fit at all)
    pub fn write(&self, samples: &[f32]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        // Only the newest `capacity` samples of an oversized write can survive
        let skip = samples.len().saturating_sub(self.capacity);
        let mut evicted = skip;

        {
            let mut ring = self.lock();
            for &sample in &samples[skip..] {
                if ring.is_full() {
                    evicted += 1;
                }
                ring.push_overwrite(sample);
            }
        }

        if evicted > 0 {
            self.dropped_count.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        self.data_ready.notify_one();

        evicted
    }

    /// Read up to `buffer.len()` samples, waiting at most the configured timeout
    ///
    /// # Returns
    /// Number of samples actually read (0 when nothing arrived in time)
    pub fn read(&self, buffer: &mut [f32]) -> usize {
        self.read_timeout(buffer, self.read_timeout)
    }

    /// Read with an explicit bound on the wait for the first sample
    pub fn read_timeout(&self, buffer: &mut [f32], timeout: Duration) -> usize {
        if buffer.is_empty() {
            return 0;
        }

        let guard = self.lock();
        let (mut ring, _) = self
            .data_ready
            .wait_timeout_while(guard, timeout, |ring| ring.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        let mut count = 0;
        for slot in buffer.iter_mut() {
            match ring.pop() {
                Some(sample) => {
                    *slot = sample;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Current occupancy in samples
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all unread samples
    pub fn clear(&self) {
        let mut ring = self.lock();
        while ring.pop().is_some() {}
    }

    /// Samples evicted by overflow since creation or the last reset
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Reset dropped sample counter
    pub fn reset_dropped_count(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for AudioRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRingBuffer")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_ring_buffer_write_read() {
        let rb = AudioRingBuffer::new(1024);

        let data = vec![1.0f32, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rb.write(&data), 0);
        assert_eq!(rb.size(), 5);

        let mut output = vec![0.0f32; 5];
        let read = rb.read(&mut output);
        assert_eq!(read, 5);
        assert_eq!(output, data);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_ring_buffer_fifo_across_wrap() {
        let rb = AudioRingBuffer::new(8);
        let mut expected = 0.0f32;
        let mut out = [0.0f32; 5];

        // Interleave writes and reads so the indices wrap several times
        for round in 0..10 {
            let block: Vec<f32> = (0..5).map(|i| (round * 5 + i + 1) as f32).collect();
            rb.write(&block);
            let read = rb.read(&mut out);
            assert_eq!(read, 5);
            for &s in &out[..read] {
                expected += 1.0;
                assert_eq!(s, expected);
            }
        }
    }

    #[test]
    fn test_ring_buffer_overflow_keeps_newest() {
        let rb = AudioRingBuffer::new(10);

        let data: Vec<f32> = (0..25).map(|i| i as f32).collect();
        let evicted = rb.write(&data);
        assert_eq!(evicted, 15);
        assert_eq!(rb.size(), 10);

        let mut output = vec![0.0f32; 20];
        let read = rb.read(&mut output);
        assert_eq!(read, 10);
        let expected: Vec<f32> = (15..25).map(|i| i as f32).collect();
        assert_eq!(&output[..read], &expected[..]);
    }

    #[test]
    fn test_ring_buffer_overflow_across_writes() {
        let rb = AudioRingBuffer::new(4);
        rb.write(&[1.0, 2.0, 3.0]);
        assert_eq!(rb.write(&[4.0, 5.0, 6.0]), 2);

        let mut output = [0.0f32; 4];
        assert_eq!(rb.read(&mut output), 4);
        assert_eq!(output, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_ring_buffer_dropped_samples() {
        let rb = AudioRingBuffer::new(10);
        assert_eq!(rb.dropped_count(), 0);

        rb.write(&[1.0f32; 20]);
        assert_eq!(rb.dropped_count(), 10);

        rb.reset_dropped_count();
        assert_eq!(rb.dropped_count(), 0);
    }

    #[test]
    fn test_ring_buffer_starvation_is_bounded() {
        let rb = AudioRingBuffer::with_read_timeout(64, Duration::from_millis(30));
        let mut output = vec![0.0f32; 10];

        let started = Instant::now();
        let read = rb.read(&mut output);
        let elapsed = started.elapsed();

        assert_eq!(read, 0);
        assert!(elapsed >= Duration::from_millis(25), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1000), "blocked too long: {:?}", elapsed);
        // Nothing fabricated
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_ring_buffer_short_read() {
        let rb = AudioRingBuffer::new(64);
        rb.write(&[0.5, 0.25]);
        let mut output = [9.0f32; 4];
        assert_eq!(rb.read_timeout(&mut output, Duration::ZERO), 2);
        assert_eq!(output, [0.5, 0.25, 9.0, 9.0]);
    }

    #[test]
    fn test_reader_wakes_on_write() {
        let rb = Arc::new(AudioRingBuffer::with_read_timeout(64, Duration::from_secs(5)));
        let writer = Arc::clone(&rb);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.write(&[0.1, 0.2, 0.3]);
        });

        let started = Instant::now();
        let mut output = [0.0f32; 3];
        let read = rb.read(&mut output);
        handle.join().unwrap();

        assert!(read >= 1);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_full_ring_reports_each_eviction() {
        let rb = AudioRingBuffer::new(3);
        assert_eq!(rb.write(&[1.0, 2.0, 3.0]), 0);
        assert_eq!(rb.write(&[4.0]), 1);
        assert_eq!(rb.dropped_count(), 1);
    }

    #[test]
    fn test_clear() {
        let rb = AudioRingBuffer::new(16);
        rb.write(&[1.0; 8]);
        rb.clear();
        assert_eq!(rb.size(), 0);
    }
}
