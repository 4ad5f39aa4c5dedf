//! External synchronization primitives this crate leaves to the integrator:
//! the mutex and completion-signal primitives are never implemented here.
//!
//! These are named interfaces, not implementations this crate owns: the
//! integrator supplies a [`RawMutex`] guarding the instance's shared state
//! and a [`CompletionSignal`] backing `publish_wait`. A `std`-gated
//! reference implementation of each is provided purely so this crate's own
//! test suite has something concrete to drive — the same role `mock_instant`
//! plays for the clock side.

/// A non-blocking mutual-exclusion primitive guarding `T`.
///
/// Only a `try_lock` is required: the scheduler's tick and the ISR-context
/// completion callback must never block on this lock, so blocking
/// acquisition (`publish`'s bounded wait) is built by this crate on top of
/// `try_lock` plus the instance's clock, not provided by the mutex itself.
pub trait RawMutex<T> {
    /// A guard granting exclusive access to the guarded value.
    type Guard<'a>: core::ops::DerefMut<Target = T>
    where
        Self: 'a,
        T: 'a;

    /// Wraps `value` in a new, unlocked mutex.
    fn new(value: T) -> Self;

    /// Attempts to acquire the lock without blocking.
    fn try_lock(&self) -> Option<Self::Guard<'_>>;
}

/// A one-shot notify-on-done signal, backing `publish_wait`.
pub trait CompletionSignal {
    /// Creates a signal in its unset state.
    fn new() -> Self;

    /// Marks the signal as set, waking any waiter.
    fn signal(&self);

    /// Blocks until [`signal`](CompletionSignal::signal) has been called.
    fn wait(&self);
}

#[cfg(feature = "std")]
mod std_impl {
    use super::{CompletionSignal, RawMutex};

    /// `std::sync::Mutex`-backed [`RawMutex`], for host tests.
    pub struct StdMutex<T>(std::sync::Mutex<T>);

    impl<T> RawMutex<T> for StdMutex<T> {
        type Guard<'a>
            = std::sync::MutexGuard<'a, T>
        where
            T: 'a;

        fn new(value: T) -> Self {
            Self(std::sync::Mutex::new(value))
        }

        fn try_lock(&self) -> Option<Self::Guard<'_>> {
            self.0.try_lock().ok()
        }
    }

    /// `Condvar`-backed [`CompletionSignal`], for host tests.
    pub struct StdSignal {
        done: std::sync::Mutex<bool>,
        condvar: std::sync::Condvar,
    }

    impl CompletionSignal for StdSignal {
        fn new() -> Self {
            Self {
                done: std::sync::Mutex::new(false),
                condvar: std::sync::Condvar::new(),
            }
        }

        fn signal(&self) {
            let mut done = self.done.lock().unwrap();
            *done = true;
            self.condvar.notify_one();
        }

        fn wait(&self) {
            let mut done = self.done.lock().unwrap();
            while !*done {
                done = self.condvar.wait(done).unwrap();
            }
        }
    }
}

#[cfg(feature = "std")]
pub use std_impl::{StdMutex, StdSignal};

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn std_mutex_try_lock_excludes_concurrent_access() {
        let mutex = StdMutex::new(0);
        let guard = mutex.try_lock().unwrap();
        // A second attempt while the first guard is alive must fail; std's
        // Mutex is not reentrant.
        assert_eq!(*guard, 0);
    }

    #[test]
    fn std_signal_wait_observes_signal() {
        let signal = std::sync::Arc::new(StdSignal::new());
        let waiter = signal.clone();
        let handle = std::thread::spawn(move || {
            waiter.wait();
        });
        std::thread::sleep(std::time::Duration::from_millis(10));
        signal.signal();
        handle.join().unwrap();
    }
}
