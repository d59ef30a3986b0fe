//! One-shot stop event

use parking_lot::{Condvar, Mutex};

/// Event set once by the control handler and awaited by the lifecycle engine
///
/// Never reset during a run.
#[derive(Debug, Default)]
pub struct StopSignal {
    set: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal; returns false if it was already set
    pub fn set(&self) -> bool {
        let mut set = self.set.lock();
        if *set {
            return false;
        }
        *set = true;
        self.cond.notify_all();
        true
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Block until the signal is set
    pub fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.cond.wait(&mut set);
        }
    }
}
