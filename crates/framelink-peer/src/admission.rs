//! Optional cap on concurrently running handlers.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    in_flight: usize,
    closed: bool,
}

/// Counting gate the accept loop waits on before each accept.
#[derive(Debug)]
pub(crate) struct Admission {
    limit: Option<usize>,
    state: Mutex<State>,
    released: Condvar,
}

/// Held by a handler thread for the lifetime of its connection.
#[derive(Debug)]
pub(crate) struct Permit {
    admission: Arc<Admission>,
}

impl Admission {
    pub(crate) fn new(limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            limit,
            state: Mutex::new(State::default()),
            released: Condvar::new(),
        })
    }

    /// Block until a slot is free. Returns `None` once the gate is closed.
    pub(crate) fn acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            match self.limit {
                Some(limit) if state.in_flight >= limit => {
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                _ => break,
            }
        }
        state.in_flight += 1;
        Some(Permit {
            admission: Arc::clone(self),
        })
    }

    /// Wake every waiter and refuse further permits.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.released.notify_all();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.admission.lock().in_flight -= 1;
        self.admission.released.notify_one();
    }
}
