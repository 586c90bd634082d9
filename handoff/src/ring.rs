use core::cell::UnsafeCell;
use core::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::{Error, Receiver, Semaphore, Sender};

/// Two batch buffers of `N` words passed between cores.
///
/// The `empty` semaphore counts buffers the writer may fill (initially two),
/// `full` counts buffers waiting for the reader (initially none). The writer
/// fills a whole batch before releasing it, the reader drains a whole batch
/// before handing it back.
pub struct SemaphoreRing<const N: usize> {
    buffers: [UnsafeCell<[u32; N]>; 2],
    sizes: [AtomicUsize; 2],
    empty: Semaphore,
    full: Semaphore,
}

// Note(unsafe): A buffer is only accessed by the side holding its permit.
unsafe impl<const N: usize> Sync for SemaphoreRing<N> {}

impl<const N: usize> Default for SemaphoreRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SemaphoreRing<N> {
    pub const fn new() -> Self {
        Self {
            buffers: [UnsafeCell::new([0; N]), UnsafeCell::new([0; N])],
            sizes: [AtomicUsize::new(0), AtomicUsize::new(0)],
            empty: Semaphore::new(2, 2),
            full: Semaphore::new(0, 2),
        }
    }

    /// Split into the sending and receiving end.
    ///
    /// # Args
    /// * `batch` - Words per batch, at most `N`.
    /// * `timeout_us` - Publish a partial batch this long after its first word.
    pub fn split(
        &mut self,
        batch: usize,
        timeout_us: u32,
    ) -> (RingSender<'_, N>, RingReceiver<'_, N>) {
        let this = &*self;
        (
            RingSender {
                ring: this,
                index: 0,
                len: None,
                batch: batch.clamp(1, N),
                timeout_us,
                since: None,
            },
            RingReceiver {
                ring: this,
                index: 0,
                position: 0,
                len: None,
            },
        )
    }
}

/// Sending end of a [SemaphoreRing].
pub struct RingSender<'a, const N: usize> {
    ring: &'a SemaphoreRing<N>,
    index: usize,
    /// Fill level of the buffer we hold an `empty` permit for.
    len: Option<usize>,
    batch: usize,
    timeout_us: u32,
    since: Option<u32>,
}

impl<const N: usize> RingSender<'_, N> {
    fn publish(&mut self) {
        if let Some(len) = self.len.take() {
            self.ring.sizes[self.index].store(len, Ordering::Release);
            self.ring.full.release();
            self.index ^= 1;
        }
        self.since = None;
    }

    /// Words in the batch being filled.
    pub fn pending(&self) -> usize {
        self.len.unwrap_or(0)
    }
}

impl<const N: usize> Sender for RingSender<'_, N> {
    fn try_send(&mut self, word: u32) -> Result<(), Error> {
        let len = match self.len {
            Some(len) => len,
            None => {
                if !self.ring.empty.try_acquire() {
                    return Err(Error::Full);
                }
                fence(Ordering::Acquire);
                0
            }
        };
        // Note(unsafe): We hold the `empty` permit for this buffer.
        unsafe { (*self.ring.buffers[self.index].get())[len] = word };
        self.len = Some(len + 1);
        if len + 1 >= self.batch {
            self.publish();
        }
        Ok(())
    }

    fn flush(&mut self, now_us: u32) {
        if self.len.is_none() {
            return;
        }
        match self.since {
            None => self.since = Some(now_us),
            Some(since) if now_us.wrapping_sub(since) >= self.timeout_us => {
                self.publish()
            }
            _ => {}
        }
    }
}

/// Receiving end of a [SemaphoreRing].
pub struct RingReceiver<'a, const N: usize> {
    ring: &'a SemaphoreRing<N>,
    index: usize,
    position: usize,
    /// Size of the batch we hold a `full` permit for.
    len: Option<usize>,
}

impl<const N: usize> Receiver for RingReceiver<'_, N> {
    fn try_recv(&mut self) -> Option<u32> {
        let len = match self.len {
            Some(len) => len,
            None => {
                if !self.ring.full.try_acquire() {
                    return None;
                }
                let len = self.ring.sizes[self.index].load(Ordering::Acquire);
                self.len = Some(len);
                self.position = 0;
                len
            }
        };
        // Note(unsafe): We hold the `full` permit for this buffer.
        let word = unsafe { (*self.ring.buffers[self.index].get())[self.position] };
        self.position += 1;
        if self.position >= len {
            self.len = None;
            self.index ^= 1;
            fence(Ordering::Release);
            self.ring.empty.release();
        }
        Some(word)
    }
}
