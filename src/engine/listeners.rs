use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::status::{SessionStatus, TransferStatus};

/// An observer of engine status transitions.
///
/// Implementations should return quickly; slow listeners are isolated onto
/// their own task and cannot stall the engine or their peers, but the engine
/// does not apply backpressure based on listener progress.
pub trait StatusListener: Send + Sync {
    fn id(&self) -> String;

    fn on_file_status_changed(
        &self,
        path: &str,
        old: Option<TransferStatus>,
        new: TransferStatus,
    ) {
        let _ = (path, old, new);
    }

    fn on_session_status_changed(&self, old: SessionStatus, new: SessionStatus) {
        let _ = (old, new);
    }
}

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub listener: Arc<dyn StatusListener>,
}

/// Spawns one panic-isolated task per listener to deliver a file-status
/// transition. The engine does not wait for delivery.
pub(crate) fn notify_file_changed(
    listeners: Vec<ListenerEntry>,
    path: String,
    old: Option<TransferStatus>,
    new: TransferStatus,
) {
    for entry in listeners {
        let path = path.clone();
        let old = old.clone();
        let new = new.clone();
        tokio::spawn(async move {
            let listener = entry.listener;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_file_status_changed(&path, old, new);
            }));
            if let Err(panic) = result {
                tracing::warn!(
                    listener = %listener.id(),
                    path = %path,
                    "status listener panicked: {:?}",
                    panic_message(&panic)
                );
            }
        });
    }
}

/// Spawns one panic-isolated task per listener to deliver a session-status
/// transition.
pub(crate) fn notify_session_changed(
    listeners: Vec<ListenerEntry>,
    old: SessionStatus,
    new: SessionStatus,
) {
    for entry in listeners {
        let old = old.clone();
        let new = new.clone();
        tokio::spawn(async move {
            let listener = entry.listener;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_session_status_changed(old, new);
            }));
            if let Err(panic) = result {
                tracing::warn!(
                    listener = %listener.id(),
                    "status listener panicked: {:?}",
                    panic_message(&panic)
                );
            }
        });
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        id: String,
        hits: Arc<AtomicUsize>,
        panics: bool,
    }

    impl StatusListener for CountingListener {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn on_file_status_changed(
            &self,
            _path: &str,
            _old: Option<TransferStatus>,
            _new: TransferStatus,
        ) {
            if self.panics {
                panic!("boom");
            }
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_other_listeners() {
        let good_hits = Arc::new(AtomicUsize::new(0));
        let bad = Arc::new(CountingListener {
            id: "bad".into(),
            hits: Arc::new(AtomicUsize::new(0)),
            panics: true,
        });
        let good = Arc::new(CountingListener {
            id: "good".into(),
            hits: good_hits.clone(),
            panics: false,
        });

        let entries = vec![
            ListenerEntry { listener: bad },
            ListenerEntry { listener: good },
        ];

        let status = TransferStatus::new("f", "s", 10);
        notify_file_changed(entries, "f".to_string(), None, status);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(good_hits.load(Ordering::SeqCst), 1);
    }
}
