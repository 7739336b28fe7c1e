use std::sync::{Condvar, Mutex};

/// A small counting semaphore for the global concurrency gate. Built on
/// `Mutex`+`Condvar` rather than `tokio::sync::Semaphore` because the
/// pipeline orchestrator is thread-based, not async (its suspension points
/// are blocking sleeps, not awaited futures).
pub struct Semaphore {
    state: Mutex<usize>,
    available: Condvar,
}

pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Semaphore {
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a slot is free, then hold it until the returned
    /// `Permit` is dropped.
    pub fn acquire(&self) -> Permit<'_> {
        let mut count = self.state.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
        Permit { semaphore: self }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut count = self.semaphore.state.lock().unwrap();
        *count += 1;
        self.semaphore.available.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn blocks_until_a_permit_is_released() {
        let sem = Arc::new(Semaphore::new(1));
        let first = sem.acquire();
        let sem2 = Arc::clone(&sem);
        let handle = thread::spawn(move || {
            let _permit = sem2.acquire();
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        drop(first);
        handle.join().unwrap();
    }
}
