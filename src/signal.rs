//! Caller-side cancellation of in-flight requests.

use std::sync::Arc;

use tokio::sync::watch;

/// Triggers the [`AbortSignal`]s created from it.
#[derive(Debug)]
pub struct AbortController {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    /// Creates a controller that has not been aborted.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns a signal tied to this controller.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Aborts every request carrying a signal of this controller.
    pub fn abort(&self) {
        self.sender.send_replace(true);
    }
}

/// Observes whether an [`AbortController`] has been aborted.
///
/// Passed in the request options, the signal races the transport call. It
/// has no effect once a response has been received.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Returns `true` if the controller has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the controller is aborted.
    ///
    /// Never resolves if the controller is dropped without aborting.
    pub async fn aborted(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
