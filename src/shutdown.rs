use tokio_util::sync::CancellationToken;

/// Install handlers for SIGINT, SIGTERM and SIGQUIT.
///
/// The returned token is cancelled when the first of them arrives.
pub fn shutdown_signal() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let signals = Signals::install()?;

    let trigger = token.clone();
    tokio::spawn(async move {
        let name = signals.recv().await;
        tracing::info!("terminating: via signal {name}");
        trigger.cancel();
    });

    Ok(token)
}

#[cfg(unix)]
struct Signals {
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending().await
            }
        }
    }
}
