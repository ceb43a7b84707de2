//! Binary token used as a signal between threads

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// A latched flag that threads can block on
///
/// `raise` wakes every waiter; the flag stays raised until `clear`.
#[derive(Debug, Default)]
pub struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        *raised = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.raised.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Non-blocking check
    pub fn is_raised(&self) -> bool {
        *self.raised.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until raised
    pub fn wait(&self) {
        let raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        let _raised = self
            .cond
            .wait_while(raised, |r| !*r)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until raised or the timeout passes; returns whether it was raised
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let raised = self.raised.lock().unwrap_or_else(PoisonError::into_inner);
        let (raised, _) = self
            .cond
            .wait_timeout_while(raised, timeout, |r| !*r)
            .unwrap_or_else(PoisonError::into_inner);
        *raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_raise_wakes_waiter() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        };
        signal.raise();
        waiter.join().unwrap();
        assert!(signal.is_raised());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let signal = Signal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
        signal.raise();
        assert!(signal.wait_timeout(Duration::from_millis(5)));
        signal.clear();
        assert!(!signal.is_raised());
    }
}
