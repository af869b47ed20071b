use parking_lot::Mutex;

use crate::error::{EngineError, Result};

/// Single-slot mutual exclusion: at most one task may be inside `execute` at
/// a time. A second caller while busy gets [`EngineError::Busy`] immediately
/// rather than waiting.
#[derive(Default)]
pub struct ConcurrencyGuard {
    busy: Mutex<bool>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute<T>(&self, task: impl FnOnce() -> T) -> Result<T> {
        {
            let mut busy = self.busy.lock();
            if *busy {
                return Err(EngineError::Busy);
            }
            *busy = true;
        }
        let result = task();
        *self.busy.lock() = false;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_reentry_while_busy() {
        let guard = Arc::new(ConcurrencyGuard::new());
        let g2 = guard.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            g2.execute(|| {
                tx.send(()).unwrap();
                thread::sleep(std::time::Duration::from_millis(100));
            })
        });
        rx.recv().unwrap();
        let result = guard.execute(|| {});
        assert!(matches!(result, Err(EngineError::Busy)));
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn releases_slot_after_completion() {
        let guard = ConcurrencyGuard::new();
        guard.execute(|| {}).unwrap();
        guard.execute(|| {}).unwrap();
    }
}
