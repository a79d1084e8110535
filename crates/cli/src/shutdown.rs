use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Process exit status for a finished command.
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// 128 + SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Token shared by every import of this process, cancelled on the first
/// SIGINT or SIGTERM.
#[derive(Clone)]
pub struct Shutdown {
    token: CancellationToken,
    signalled: Arc<AtomicBool>,
}

impl Shutdown {
    /// Starts listening for termination signals in the background.
    pub fn listen() -> Self {
        let shutdown = Self::with_token(CancellationToken::new());
        let listener = shutdown.clone();
        tokio::spawn(async move {
            let name = wait_for_signal().await;
            info!(signal = name, "Stopping running imports");
            listener.trigger();
        });
        shutdown
    }

    fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            signalled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn trigger(&self) {
        self.signalled.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn requested(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

async fn wait_for_signal() -> &'static str {
    tokio::select! {
        _ = interrupt() => "SIGINT",
        _ = terminate() => "SIGTERM",
    }
}

async fn interrupt() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "Cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            error!(error = %err, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
