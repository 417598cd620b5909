//! Ctrl-C latch
//!
//! A transition is never cancelled midway, so an interrupt that arrives while
//! one is running is remembered and acted on once it finishes.

use std::future::Future;

use tokio::sync::watch;

/// Remembers whether an interrupt has been received
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Start listening for Ctrl-C
    ///
    /// Must be awaited before the first transition: the handler is installed
    /// before this returns, and from then on the signal no longer terminates
    /// the process.
    pub async fn ctrl_c() -> Self {
        let mut signal = Box::pin(tokio::signal::ctrl_c());
        // The first poll installs the handler
        let early = tokio::select! {
            biased;
            result = &mut signal => Some(result),
            _ = std::future::ready(()) => None,
        };

        Self::from_signal(async move {
            let result = match early {
                Some(result) => result,
                None => signal.await,
            };
            // Without a listener nothing could ever end the cycle, so treat
            // the failure as an interrupt
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
    }

    /// Latch on an arbitrary signal future
    pub fn from_signal<F>(signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            signal.await;
            tracing::info!("Interrupt received");
            let _ = tx.send(true);
        });
        Self { rx }
    }

    /// Whether an interrupt has already arrived
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once an interrupt has arrived, immediately if it already has
    pub async fn requested(&mut self) {
        // A closed channel means the listener gave up; wait forever
        if self.rx.wait_for(|hit| *hit).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
