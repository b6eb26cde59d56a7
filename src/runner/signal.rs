//! Cancellation driven by OS signals
//!
//! [`listen`] is called once per invocation; the returned guard stops the
//! listener when the invocation is over.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Observes a cancellation request
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Requests cancellation of every token created with it
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A connected handle and token
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, token) = Self::pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle
    /// is gone without cancelling
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Stops the signal listener when dropped
#[derive(Debug)]
pub struct SignalGuard {
    handle: JoinHandle<()>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Turn SIGHUP, SIGINT, SIGTERM and SIGQUIT into cancellation requests
#[cfg(unix)]
pub fn listen() -> std::io::Result<(CancelToken, SignalGuard)> {
    use tokio::signal::unix::{signal, SignalKind};

    let (handle, token) = CancelToken::pair();
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let task = tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = hangup.recv() => "SIGHUP",
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = quit.recv() => "SIGQUIT",
            };
            info!(signal = name, "received signal, cancelling");
            handle.cancel();
        }
    });

    Ok((token, SignalGuard { handle: task }))
}

/// Turn Ctrl-C into cancellation requests
#[cfg(not(unix))]
pub fn listen() -> std::io::Result<(CancelToken, SignalGuard)> {
    let (handle, token) = CancelToken::pair();
    let task = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, cancelling");
            handle.cancel();
        }
    });
    Ok((token, SignalGuard { handle: task }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_token() {
        let (handle, mut token) = CancelToken::pair();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
        });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("token was not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_never_pends() {
        let mut token = CancelToken::never();
        let result = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_listen_and_drop_guard() {
        let (token, guard) = listen().unwrap();
        assert!(!token.is_cancelled());
        drop(guard);
    }
}
