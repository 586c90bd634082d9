use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::Error;

struct Slot<T, const N: usize> {
    payload: UnsafeCell<[T; N]>,
    size: AtomicUsize,
    ready: AtomicBool,
}

impl<T: Copy, const N: usize> Slot<T, N> {
    const fn new(fill: T) -> Self {
        Self {
            payload: UnsafeCell::new([fill; N]),
            size: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
        }
    }
}

/// Two slots of `N` elements handed back and forth between one producer and
/// one consumer.
///
/// Use [DoubleBuffer::split] to obtain the producer ([Writer]) and consumer
/// ([Reader]) handles. Both start on slot 0 with both slots empty.
///
/// A reset (e.g. on an audio format change) is requested by the producer
/// with [Writer::reset] and carried out by the consumer on its next access.
/// The producer is refused with [Error::Busy] until then. The reset is
/// therefore complete before the consumer reads anything after it.
pub struct DoubleBuffer<T, const N: usize> {
    slots: [Slot<T, N>; 2],
    flush: AtomicBool,
}

// Note(unsafe): A payload is only ever accessed by the side owning its slot as
// designated by the slot's `ready` flag.
unsafe impl<T: Send, const N: usize> Sync for DoubleBuffer<T, N> {}

impl<T: Copy, const N: usize> DoubleBuffer<T, N> {
    /// Create a new double buffer with both slots empty.
    ///
    /// # Args
    /// * `fill` - Initial payload value.
    pub const fn new(fill: T) -> Self {
        Self {
            slots: [Slot::new(fill), Slot::new(fill)],
            flush: AtomicBool::new(false),
        }
    }

    /// Split into producer and consumer handles.
    pub fn split(&mut self) -> (Writer<'_, T, N>, Reader<'_, T, N>) {
        let this = &*self;
        (
            Writer {
                buffer: this,
                index: 0,
                cursor: 0,
            },
            Reader {
                buffer: this,
                index: 0,
                position: 0,
                size: 0,
            },
        )
    }
}

/// Producer handle of a [DoubleBuffer].
pub struct Writer<'a, T, const N: usize> {
    buffer: &'a DoubleBuffer<T, N>,
    index: usize,
    cursor: usize,
}

impl<T: Copy, const N: usize> Writer<'_, T, N> {
    fn slot(&self) -> &Slot<T, N> {
        &self.buffer.slots[self.index]
    }

    /// Whether the current target slot can be written.
    pub fn can_write(&self) -> bool {
        !self.buffer.flush.load(Ordering::Acquire)
            && !self.slot().ready.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), Error> {
        if self.can_write() {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Number of elements written but not yet published.
    pub fn pending(&self) -> usize {
        self.cursor
    }

    /// Fill and publish a complete unit of work in one go.
    ///
    /// Any elements added with [Self::push] or [Self::extend] before are
    /// discarded.
    ///
    /// # Args
    /// * `f` - Fills the payload and returns the number of valid elements.
    ///   The count is clamped to the capacity. Zero publishes nothing.
    ///
    /// # Returns
    /// The number of elements published or [Error::Busy] if the target slot is
    /// still owned by the consumer. `f` is not called in that case.
    pub fn publish_with<F>(&mut self, f: F) -> Result<usize, Error>
    where
        F: FnOnce(&mut [T; N]) -> usize,
    {
        self.check()?;
        // Note(unsafe): `ready` is clear, the consumer does not touch this payload.
        self.cursor = f(unsafe { &mut *self.slot().payload.get() }).min(N);
        self.publish()
    }

    /// Append one element to the current unit of work.
    pub fn push(&mut self, value: T) -> Result<(), Error> {
        self.extend(&[value])
    }

    /// Append all elements of `values` or none of them.
    pub fn extend(&mut self, values: &[T]) -> Result<(), Error> {
        self.check()?;
        let end = self.cursor + values.len();
        if end > N {
            return Err(Error::Full);
        }
        // Note(unsafe): `ready` is clear, the consumer does not touch this payload.
        let payload = unsafe { &mut *self.slot().payload.get() };
        payload[self.cursor..end].copy_from_slice(values);
        self.cursor = end;
        Ok(())
    }

    /// Hand the current unit of work to the consumer and move on to the
    /// other slot.
    ///
    /// # Returns
    /// The number of elements published. Publishing nothing is a no-op.
    pub fn publish(&mut self) -> Result<usize, Error> {
        self.check()?;
        let size = core::mem::take(&mut self.cursor);
        if size == 0 {
            return Ok(0);
        }
        let slot = self.slot();
        slot.size.store(size, Ordering::Relaxed);
        slot.ready.store(true, Ordering::Release);
        self.index ^= 1;
        Ok(size)
    }

    /// Discard all queued and pending data on both sides.
    ///
    /// Until the consumer has carried out the reset, writes are refused
    /// with [Error::Busy].
    pub fn reset(&mut self) {
        self.index = 0;
        self.cursor = 0;
        self.buffer.flush.store(true, Ordering::Release);
    }

    /// Whether a reset is still waiting for the consumer.
    pub fn is_flushing(&self) -> bool {
        self.buffer.flush.load(Ordering::Acquire)
    }
}

/// Consumer handle of a [DoubleBuffer].
pub struct Reader<'a, T, const N: usize> {
    buffer: &'a DoubleBuffer<T, N>,
    index: usize,
    position: usize,
    size: usize,
}

impl<T: Copy, const N: usize> Reader<'_, T, N> {
    fn service_flush(&mut self) {
        if self.buffer.flush.load(Ordering::Acquire) {
            for slot in self.buffer.slots.iter() {
                slot.size.store(0, Ordering::Relaxed);
                slot.ready.store(false, Ordering::Release);
            }
            self.index = 0;
            self.position = 0;
            self.size = 0;
            self.buffer.flush.store(false, Ordering::Release);
        }
    }

    /// Acquire the current slot if it is ready.
    fn acquire(&mut self) -> Option<&[T]> {
        self.service_flush();
        let slot = &self.buffer.slots[self.index];
        if !slot.ready.load(Ordering::Acquire) {
            return None;
        }
        self.size = slot.size.load(Ordering::Relaxed);
        debug_assert!(self.position <= self.size && self.size <= N);
        // Note(unsafe): `ready` is set, the producer does not touch this payload.
        let payload = unsafe { &*slot.payload.get() };
        Some(&payload[..self.size])
    }

    /// Return the current slot to the producer and move on to the other one.
    fn release(&mut self) {
        let slot = &self.buffer.slots[self.index];
        slot.size.store(0, Ordering::Relaxed);
        slot.ready.store(false, Ordering::Release);
        self.position = 0;
        self.size = 0;
        self.index ^= 1;
    }

    /// Take the next element.
    ///
    /// The slot is returned to the producer together with its last element.
    pub fn pop(&mut self) -> Option<T> {
        let position = self.position;
        let value = *self.acquire()?.get(position)?;
        self.position += 1;
        if self.position >= self.size {
            self.release();
        }
        Some(value)
    }

    /// Offer the unread rest of the ready slot to `f`.
    ///
    /// The slot is consumed if `f` returns `true` and kept for a retry
    /// otherwise.
    ///
    /// # Returns
    /// Whether a slot was consumed.
    pub fn consume<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&[T]) -> bool,
    {
        let position = self.position;
        let taken = match self.acquire() {
            Some(data) => f(&data[position..]),
            None => return false,
        };
        if taken {
            self.release();
        }
        taken
    }

    /// Elements left in the slot being drained.
    pub fn remaining(&mut self) -> usize {
        let position = self.position;
        self.acquire().map(|d| d.len() - position).unwrap_or(0)
    }

    /// Number of slots published and not yet consumed.
    pub fn ready_slots(&self) -> usize {
        self.buffer
            .slots
            .iter()
            .filter(|s| s.ready.load(Ordering::Acquire))
            .count()
    }

    /// Read position in the slot being drained.
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure() {
        let mut buf = DoubleBuffer::<u8, 4>::new(0);
        let (mut w, mut r) = buf.split();
        assert_eq!(w.publish_with(|p| {
            p[..2].copy_from_slice(&[1, 2]);
            2
        }), Ok(2));
        assert_eq!(w.publish_with(|p| {
            p[0] = 3;
            1
        }), Ok(1));
        // Both slots are with the consumer.
        assert_eq!(w.push(4), Err(Error::Busy));
        assert_eq!(r.ready_slots(), 2);
        assert_eq!(r.pop(), Some(1));
        assert_eq!(r.position(), 1);
        assert_eq!(r.pop(), Some(2));
        assert_eq!(r.position(), 0);
        // Slot 0 is free again.
        assert_eq!(w.push(4), Ok(()));
        assert_eq!(r.pop(), Some(3));
        assert_eq!(r.pop(), None);
        assert_eq!(w.publish(), Ok(1));
        assert_eq!(r.pop(), Some(4));
    }

    #[test]
    fn extend_is_atomic() {
        let mut buf = DoubleBuffer::<u8, 4>::new(0);
        let (mut w, _r) = buf.split();
        w.extend(&[1, 2, 3]).unwrap();
        assert_eq!(w.extend(&[4, 5]), Err(Error::Full));
        assert_eq!(w.pending(), 3);
        assert_eq!(w.publish_with(|_| 9), Ok(4));
    }

    #[test]
    fn consume_retry() {
        let mut buf = DoubleBuffer::<u8, 4>::new(0);
        let (mut w, mut r) = buf.split();
        w.extend(&[7, 8]).unwrap();
        w.publish().unwrap();
        assert!(!r.consume(|d| {
            assert_eq!(d, &[7, 8]);
            false
        }));
        assert_eq!(r.remaining(), 2);
        assert!(r.consume(|d| d == [7, 8]));
        assert!(!r.consume(|_| true));
    }

    #[test]
    fn reset() {
        let mut buf = DoubleBuffer::<u8, 4>::new(0);
        let (mut w, mut r) = buf.split();
        w.extend(&[1, 2]).unwrap();
        w.publish().unwrap();
        w.extend(&[3]).unwrap();
        w.publish().unwrap();
        assert_eq!(r.pop(), Some(1));
        w.reset();
        assert!(w.is_flushing());
        assert_eq!(w.push(5), Err(Error::Busy));
        // The consumer carries out the reset and finds nothing.
        assert_eq!(r.pop(), None);
        assert_eq!(r.ready_slots(), 0);
        assert_eq!(r.position(), 0);
        assert!(!w.is_flushing());
        w.push(5).unwrap();
        w.publish().unwrap();
        assert_eq!(r.pop(), Some(5));
    }
}
