use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Process-scoped scheduler handle that decides when a server stops
///
/// A `Reactor` is created once, handed to the server, and passed to
/// handlers when a connection closes. Any clone can stop it; every
/// clone observes the stop.
///
/// # Examples
///
/// ```
/// use wsecho::Reactor;
///
/// # tokio_test::block_on(async {
/// let reactor = Reactor::new();
/// let observer = reactor.clone();
///
/// reactor.stop();
/// observer.stopped().await;
/// assert!(observer.is_stopped());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Reactor {
    stop_tx: Arc<broadcast::Sender<()>>,
    stopped: Arc<AtomicBool>,
}

impl Reactor {
    pub fn new() -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            stop_tx: Arc::new(stop_tx),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops the reactor. Calling it again has no effect.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Reactor stopped");
        // No receivers just means nobody is waiting yet; the flag covers late waiters.
        let _ = self.stop_tx.send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once the reactor has been stopped
    pub async fn stopped(&self) {
        // Subscribe before checking the flag so a concurrent stop cannot be missed.
        let mut stop_rx = self.stop_tx.subscribe();
        if self.is_stopped() {
            return;
        }
        let _ = stop_rx.recv().await;
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}
