//! CDP Proxy (spec §4.6, C6): lets external clients speak CDP to the
//! browser without exposing the raw debugging port.
//!
//! The per-connection contract is a straight relay: accept the inbound
//! WebSocket upgrade, open a second WebSocket to the browser's live
//! `wsEndpoint`, and splice frames between them until either side closes or
//! the browser disconnects.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Result, RuntimeError};
use crate::events::{EventSender, RuntimeEvent};

/// Marker trait bundling the bounds a proxied connection needs, so it can be
/// named as a trait object (`dyn AsyncDuplex`).
pub trait AsyncDuplex: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncDuplex for T {}

/// A boxed, type-erased duplex stream for an accepted connection.
pub type BoxedDuplex = Box<dyn AsyncDuplex>;

/// A handler overriding the proxy's default relay behavior entirely (spec
/// §4.6 step 1).
#[async_trait]
pub trait ProxyHandler: Send + Sync {
    async fn handle(&self, stream: BoxedDuplex, ws_endpoint: &str) -> Result<()>;
}

/// Relays raw CDP WebSocket traffic between external clients and the live
/// browser, or delegates to a registered [`ProxyHandler`].
pub struct CdpProxy {
    driver: Arc<dyn Driver>,
    events: EventSender,
    custom_handler: RwLock<Option<Arc<dyn ProxyHandler>>>,
}

impl CdpProxy {
    pub fn new(driver: Arc<dyn Driver>, events: EventSender) -> Self {
        Self {
            driver,
            events,
            custom_handler: RwLock::new(None),
        }
    }

    /// Override the default relay with a custom handler.
    pub fn set_handler(&self, handler: Arc<dyn ProxyHandler>) {
        *self.custom_handler.write() = Some(handler);
    }

    /// Clear a previously registered custom handler.
    pub fn clear_handler(&self) {
        *self.custom_handler.write() = None;
    }

    /// Proxy one already-accepted connection (spec §4.6's `proxyWebSocket`).
    ///
    /// `stream` is whatever transport the embedder already upgraded (a raw
    /// TCP stream, a TLS stream, …); this relays CDP frames over it.
    pub async fn proxy_websocket<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ws_endpoint = self.driver.get_ws_endpoint();

        if let Some(handler) = self.custom_handler.read().clone() {
            let boxed: BoxedDuplex = Box::new(stream);
            return handler
                .handle(boxed, ws_endpoint.as_deref().unwrap_or_default())
                .await;
        }

        let Some(ws_endpoint) = ws_endpoint else {
            return Err(RuntimeError::WebSocketNotReady);
        };

        self.relay(stream, &ws_endpoint).await
    }

    async fn relay<S>(&self, stream: S, ws_endpoint: &str) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let client_ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| RuntimeError::NetworkLaunch {
                stage: crate::error::NetworkLaunchStage::Proxy,
                message: format!("failed to accept client websocket upgrade: {e}"),
            })?;
        let (upstream_ws, _) = tokio_tungstenite::connect_async(ws_endpoint)
            .await
            .map_err(|e| RuntimeError::NetworkLaunch {
                stage: crate::error::NetworkLaunchStage::Proxy,
                message: format!("failed to connect to browser endpoint: {e}"),
            })?;

        let (mut client_write, mut client_read) = client_ws.split();
        let (mut up_write, mut up_read) = upstream_ws.split();
        let mut disconnects = self.events.subscribe();

        let client_to_upstream = async {
            while let Some(frame) = client_read.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(msg) => {
                        if up_write.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            }
        };
        let upstream_to_client = async {
            while let Some(frame) = up_read.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(msg) => {
                        if client_write.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            }
        };
        let watch_disconnect = async {
            loop {
                match disconnects.recv().await {
                    Ok(RuntimeEvent::Disconnected
                    | RuntimeEvent::Close(_)
                    | RuntimeEvent::FileProtocolAbort) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        };

        tokio::select! {
            () = client_to_upstream => {}
            () = upstream_to_client => {}
            () = watch_disconnect => {
                debug!("proxy connection closed: browser disconnected");
            }
        }

        debug!("cdp proxy connection closed");
        Ok(())
    }
}

impl std::fmt::Debug for CdpProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpProxy")
            .field("has_custom_handler", &self.custom_handler.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BrowserHandle, LaunchOutcome, PrimaryPage};
    use crate::config::SessionConfig;

    struct StubDriver;

    #[async_trait]
    impl Driver for StubDriver {
        async fn launch(&self, _config: &SessionConfig) -> Result<LaunchOutcome> {
            unimplemented!()
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
        fn force_close(&self) {}
        fn get_browser(&self) -> Option<BrowserHandle> {
            None
        }
        fn get_primary_page(&self) -> Option<PrimaryPage> {
            None
        }
        fn get_ws_endpoint(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn proxy_without_live_endpoint_fails_fast() {
        let (tx, _rx) = tokio::sync::broadcast::channel(8);
        let proxy = CdpProxy::new(Arc::new(StubDriver), tx);
        let (client, _server) = tokio::io::duplex(1024);
        let result = proxy.proxy_websocket(client).await;
        assert!(matches!(result, Err(RuntimeError::WebSocketNotReady)));
    }
}
