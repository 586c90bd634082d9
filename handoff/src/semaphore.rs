use core::cell::Cell;
use critical_section::Mutex;

/// Counting semaphore with non-blocking acquisition.
///
/// Permit accounting runs in a `critical_section`, which on multicore targets
/// must be the cross-core implementation (e.g. an RP2040 hardware spinlock).
pub struct Semaphore {
    permits: Mutex<Cell<u8>>,
    max: u8,
}

impl Semaphore {
    /// # Args
    /// * `initial` - Permits available at start.
    /// * `max` - Upper bound of permits.
    pub const fn new(initial: u8, max: u8) -> Self {
        Self {
            permits: Mutex::new(Cell::new(initial)),
            max,
        }
    }

    /// Take a permit if one is available.
    pub fn try_acquire(&self) -> bool {
        critical_section::with(|cs| {
            let permits = self.permits.borrow(cs);
            let available = permits.get();
            if available > 0 {
                permits.set(available - 1);
                true
            } else {
                false
            }
        })
    }

    /// Return a permit.
    ///
    /// # Returns
    /// `false` if all permits were already available.
    pub fn release(&self) -> bool {
        critical_section::with(|cs| {
            let permits = self.permits.borrow(cs);
            let available = permits.get();
            if available < self.max {
                permits.set(available + 1);
                true
            } else {
                false
            }
        })
    }

    pub fn available(&self) -> u8 {
        critical_section::with(|cs| self.permits.borrow(cs).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded() {
        let s = Semaphore::new(1, 2);
        assert!(s.try_acquire());
        assert!(!s.try_acquire());
        assert!(s.release());
        assert!(s.release());
        assert!(!s.release());
        assert_eq!(s.available(), 2);
    }
}
