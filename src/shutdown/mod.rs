//! Process-wide cancellation for long-running requests.
//!
//! `Shutdown` is owned by `main`; every blocking dequeue receives a
//! `CancelSignal` cloned from it and checks it between polls, so a pending
//! long poll ends as soon as shutdown starts instead of holding the
//! server open for its full timeout.
//!
//! Client disconnects need no signal: axum drops the handler future, which
//! drops the poll loop with it.

use tokio::sync::watch;

/// Sending side of the cancellation signal.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel every current and future `CancelSignal`. Idempotent.
    pub fn trigger(&self) {
        let already = self.tx.send_replace(true);
        if !already {
            tracing::info!(
                waiters = self.tx.receiver_count(),
                "Shutdown triggered, cancelling pending long polls"
            );
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side, cheap to clone.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is triggered. Pends forever if the
    /// `Shutdown` was dropped without triggering.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
