use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cooperative cancellation shared by every worker of one operation.
///
/// Clones observe the same state. Besides polling [`CancelToken::is_cancelled`],
/// blocking loops can wait on [`CancelToken::channel`] inside
/// `crossbeam_channel::select!`: the channel disconnects on cancel.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<Inner>,
    rx: Receiver<()>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    tx: Mutex<Option<Sender<()>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // dropping the only sender wakes every select! waiting on `channel`
        self.inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Never yields a message; becomes ready (disconnected) once cancelled
    pub fn channel(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
