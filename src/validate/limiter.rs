use std::sync::{Condvar, Mutex, PoisonError};

/// Bounded ticket pool limiting in-flight network calls.
///
/// Built by whoever starts a validation batch and lent to the workers, so
/// several batches may share one limit. Tickets release on drop.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl ConcurrencyLimiter {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a ticket is free.
    pub fn acquire(&self) -> Ticket<'_> {
        // The counter is never left inconsistent by a panicking holder, so a
        // poisoned lock is still usable.
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Ticket { limiter: self }
    }

    fn release(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        self.released.notify_one();
    }
}

#[must_use = "the ticket is released as soon as it is dropped"]
pub struct Ticket<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn never_exceeds_capacity() {
        let limiter = ConcurrencyLimiter::new(2);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _ticket = limiter.acquire();
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    current.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(current.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ticket_released_when_holder_panics() {
        let limiter = ConcurrencyLimiter::new(1);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ticket = limiter.acquire();
            panic!("probe blew up");
        }));
        assert!(outcome.is_err());
        // Would block forever if the ticket leaked.
        let _ticket = limiter.acquire();
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
    }
}
