//! OS signal handling.

use crate::lifecycle::shutdown::Shutdown;

/// Resolve when SIGINT (Ctrl+C) or, on unix, SIGTERM arrives. Returns the
/// signal name.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = ctrl_c() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; listening for Ctrl+C only");
                ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        "SIGINT"
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Termination signal received");
        shutdown.trigger();
    });
}
