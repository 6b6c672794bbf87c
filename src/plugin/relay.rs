// src/plugin/relay.rs

use std::fmt;
use std::io;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Address plus close callback handed to a plugin invocation.
///
/// The plugin connects to the address; closing the hook drops those
/// connections, which the plugin treats as a request to terminate. The hook
/// closes itself on drop if it was never fired.
pub struct CancelHook {
    addr: String,
    close: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelHook {
    pub fn new(addr: impl Into<String>, close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            addr: addr.into(),
            close: Some(Box::new(close)),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Close the hook. Only the first call has an effect.
    pub fn fire(&mut self) {
        if let Some(close) = self.close.take() {
            close();
        }
    }
}

impl fmt::Debug for CancelHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHook")
            .field("addr", &self.addr)
            .field("fired", &self.close.is_none())
            .finish()
    }
}

impl Drop for CancelHook {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Source of cancellation hooks.
pub trait SignalRelay: Send + Sync {
    fn new_hook(&self) -> io::Result<CancelHook>;
}

/// Relay listening on an ephemeral loopback TCP port.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketRelay;

impl SignalRelay for SocketRelay {
    fn new_hook(&self) -> io::Result<CancelHook> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| io::Error::other(format!("no async runtime for signal relay: {e}")))?;

        let std_listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
        std_listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(std_listener)?;
        let addr = listener.local_addr()?;

        let (close_tx, mut close_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut connections = Vec::new();
            loop {
                tokio::select! {
                    _ = &mut close_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "plugin connected to signal relay");
                            connections.push(stream);
                        }
                        Err(e) => {
                            warn!(error = %e, "signal relay accept failed; closing relay");
                            break;
                        }
                    },
                }
            }
            debug!(
                connections = connections.len(),
                "signal relay closed; dropping plugin connections"
            );
        });

        Ok(CancelHook::new(addr.to_string(), move || {
            let _ = close_tx.send(());
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use tokio::time::{Duration, timeout};

    use super::*;

    #[test]
    fn hook_fires_once_and_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut hook = CancelHook::new("addr", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hook.fire();
        hook.fire();
        drop(hook);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        drop(CancelHook::new("addr", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn socket_relay_needs_runtime() {
        assert!(SocketRelay.new_hook().is_err());
    }

    #[tokio::test]
    async fn closing_hook_disconnects_plugin() {
        let mut hook = SocketRelay.new_hook().unwrap();
        let mut stream = TcpStream::connect(hook.addr()).await.unwrap();

        // Give the relay a chance to accept before closing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        hook.fire();

        let mut buf = [0u8; 1];
        let read = timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("relay did not close connection");
        assert_eq!(read.unwrap_or(0), 0);
    }
}
