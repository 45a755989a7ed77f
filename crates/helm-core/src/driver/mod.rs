//! Driver (spec §4.2, C2): a thin, launcher-agnostic abstraction over a
//! concrete browser process.

mod chromium;
pub mod launch_args;

use std::sync::Arc;

use async_trait::async_trait;
use helm_cdp::CdpConnection;

use crate::config::SessionConfig;
use crate::error::Result;

pub use chromium::ChromiumDriver;

/// A live browser connection. Cheap to clone; all clones share the same
/// underlying CDP connection.
#[derive(Debug, Clone)]
pub struct BrowserHandle {
    connection: Arc<CdpConnection>,
    ws_endpoint: String,
}

impl BrowserHandle {
    pub(crate) fn new(connection: Arc<CdpConnection>, ws_endpoint: String) -> Self {
        Self {
            connection,
            ws_endpoint,
        }
    }

    /// The underlying CDP connection, for issuing browser-level commands.
    pub fn connection(&self) -> &Arc<CdpConnection> {
        &self.connection
    }

    /// The browser's raw DevTools WebSocket endpoint.
    pub fn ws_endpoint(&self) -> &str {
        &self.ws_endpoint
    }
}

/// A reference to the session's primary page target.
#[derive(Debug, Clone)]
pub struct PrimaryPage {
    pub target_id: String,
    pub session_id: String,
}

/// Result of a successful [`Driver::launch`].
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub browser: BrowserHandle,
    pub primary_page: PrimaryPage,
    pub ws_endpoint: String,
}

/// Launcher-agnostic driver contract the Orchestrator programs against.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Launch a new browser per `config`. Fails with a categorized error
    /// (spec §7) on any step.
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchOutcome>;

    /// Gracefully close the browser, allowing up to a configured grace
    /// period for the process to exit on its own.
    async fn close(&self) -> Result<()>;

    /// Kill the underlying process immediately, bypassing graceful
    /// shutdown. Used from the Error branch.
    fn force_close(&self);

    /// The live browser handle, or `None` if not currently live.
    fn get_browser(&self) -> Option<BrowserHandle>;

    /// The live primary page reference, or `None` if not currently live.
    fn get_primary_page(&self) -> Option<PrimaryPage>;

    /// The live browser's raw DevTools WebSocket endpoint.
    fn get_ws_endpoint(&self) -> Option<String>;
}
