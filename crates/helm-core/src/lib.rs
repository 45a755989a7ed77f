//! # Helm Core - Browser Automation Runtime
//!
//! A single-node runtime that owns one Chromium process end to end: launch,
//! fingerprint/context injection, a CDP proxy for external clients, plugin
//! lifecycle hooks, and storage extraction, coordinated through a retrying
//! orchestrator.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use helm_core::config::SessionConfig;
//! use helm_core::driver::ChromiumDriver;
//! use helm_core::fingerprint::DefaultFingerprintGenerator;
//! use helm_core::orchestrator::Orchestrator;
//!
//! # async fn example() -> Result<(), helm_core::error::RuntimeError> {
//! let (events, _rx) = tokio::sync::broadcast::channel(256);
//! let driver = Arc::new(ChromiumDriver::new(events.clone()));
//! let orchestrator = Orchestrator::new(driver, Arc::new(DefaultFingerprintGenerator), events);
//!
//! let browser = orchestrator.launch(SessionConfig::default()).await?;
//! let state = orchestrator.get_browser_state().await?;
//! println!("{} cookies restored", state.cookies.len());
//!
//! orchestrator.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`scheduler`] - Critical-task timeouts and tracked background work
//! - [`driver`] - Launcher-agnostic browser process control
//! - [`plugin`] - Lifecycle observer registry
//! - [`session`] - The session lifecycle state machine
//! - [`fingerprint`] - Fingerprint generation and per-page injection
//! - [`cdp_proxy`] - Raw CDP WebSocket relay for external clients
//! - [`state_extractor`] - Cookie/localStorage/sessionStorage extraction
//! - [`retry`] - Exponential-backoff retry policy
//! - [`orchestrator`] - The public facade composing everything above
//! - [`config`] - Session configuration and fingerprint data model
//! - [`events`] - The runtime's public event bus
//! - [`error`] - The unified error taxonomy

pub mod cdp_proxy;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod orchestrator;
pub mod plugin;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod state_extractor;
pub mod types;

pub use config::{Fingerprint, SessionConfig, SessionContext};
pub use error::{Result, RuntimeError};
pub use events::{LogEvent, LogKind, RuntimeEvent};
pub use orchestrator::Orchestrator;
pub use session::SessionState;
