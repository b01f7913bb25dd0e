#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, examples and benchmarks of the `recycle_pool` package.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::{env, panic, thread};
use std::time::Duration;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under
/// Miri, where thread synchronization primitives are significantly slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog
/// is disabled and the test function is executed directly, so that mutation
/// testing can detect mutations that hang.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode).
/// A panic inside the test is propagated unchanged.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after sending a result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded its {timeout:?} timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected without producing a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Counts constructions and drops of [`Tracked`] objects.
///
/// Cloning the ledger yields another view of the same counters, so a clone can be moved into a
/// pool factory while the test keeps the original.
///
/// # Example
///
/// ```rust
/// use testing::DropLedger;
///
/// let ledger = DropLedger::new();
///
/// let first = ledger.track();
/// let second = ledger.track();
/// assert_eq!(ledger.live(), 2);
///
/// drop(first);
/// assert_eq!(ledger.dropped(), 1);
/// assert_eq!(second.id(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DropLedger {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
}

impl DropLedger {
    /// Creates a ledger with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new tracked object, counting its construction.
    ///
    /// Objects are numbered in creation order, starting from zero.
    #[must_use]
    pub fn track(&self) -> Tracked {
        let id = self.counters.created.fetch_add(1, Ordering::SeqCst);

        Tracked {
            id,
            ledger: self.clone(),
        }
    }

    /// The number of tracked objects ever created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    /// The number of tracked objects that have been dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.counters.dropped.load(Ordering::SeqCst)
    }

    /// The number of tracked objects that have been created but not yet dropped.
    ///
    /// # Panics
    ///
    /// Panics if more objects were dropped than created, which means some object was
    /// dropped twice.
    #[must_use]
    pub fn live(&self) -> usize {
        // Dropped first, so a concurrent create cannot make the difference go negative.
        let dropped = self.dropped();
        let created = self.created();

        created
            .checked_sub(dropped)
            .expect("more tracked objects dropped than created - something was dropped twice")
    }
}

/// An object that records its own drop in the [`DropLedger`] that created it.
#[derive(Debug)]
pub struct Tracked {
    id: usize,
    ledger: DropLedger,
}

impl Tracked {
    /// The creation-order number of this object within its ledger.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_result() {
        let result = with_watchdog(|| "hello world");
        assert_eq!(result, "hello world");
    }

    #[test]
    #[should_panic]
    fn watchdog_propagates_panic() {
        with_watchdog(|| {
            let items: Vec<u32> = Vec::new();
            assert!(!items.is_empty(), "intentional failure");
        });
    }

    #[test]
    fn ledger_counts_lifecycle() {
        let ledger = DropLedger::new();

        let a = ledger.track();
        let b = ledger.track();
        assert_eq!((a.id(), b.id()), (0, 1));
        assert_eq!(ledger.created(), 2);
        assert_eq!(ledger.live(), 2);

        drop(a);
        drop(b);
        assert_eq!(ledger.dropped(), 2);
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn cloned_ledger_shares_counters() {
        let ledger = DropLedger::new();
        let clone = ledger.clone();

        drop(clone.track());

        assert_eq!(ledger.created(), 1);
        assert_eq!(ledger.dropped(), 1);
    }
}
