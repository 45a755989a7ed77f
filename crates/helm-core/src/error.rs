//! Error taxonomy for the browser runtime.
//!
//! Every fallible operation in the runtime maps its failure onto one of the
//! variants below. Each variant carries enough context to decide whether the
//! retry manager should retry it (see [`RuntimeError::is_retryable`]) and
//! what category to surface to callers without leaking internal detail.

use std::time::Duration;

use thiserror::Error;

/// The stage at which a [`RuntimeError::BrowserProcess`] failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserProcessStage {
    /// Failed while spawning or connecting to the browser process.
    Launch,
    /// Failed while accessing an existing page.
    PageAccess,
    /// Failed while refreshing the primary page.
    PageRefresh,
    /// Failed while setting up a newly observed target.
    TargetSetup,
}

impl std::fmt::Display for BrowserProcessStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Launch => "launch",
            Self::PageAccess => "page-access",
            Self::PageRefresh => "page-refresh",
            Self::TargetSetup => "target-setup",
        };
        write!(f, "{s}")
    }
}

/// The stage at which a [`RuntimeError::NetworkLaunch`] failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkLaunchStage {
    /// The browser never exposed a usable `wsEndpoint`.
    WsEndpoint,
    /// The CDP proxy could not reach the endpoint.
    Proxy,
}

impl std::fmt::Display for NetworkLaunchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WsEndpoint => "wsEndpoint",
            Self::Proxy => "proxy",
        };
        write!(f, "{s}")
    }
}

/// The stage at which a [`RuntimeError::Fingerprint`] failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintStage {
    /// Generating or restoring the fingerprint record failed.
    Generation,
    /// Injecting an already-available fingerprint into a page failed.
    Injection,
}

/// The stage at which a [`RuntimeError::SessionContext`] failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionContextStage {
    /// Applying restored cookies failed.
    Cookies,
    /// Applying restored localStorage/sessionStorage failed.
    Storage,
}

/// What kind of prerequisite was missing for a [`RuntimeError::ResourceUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// An extension path did not exist.
    Extensions,
    /// The user data profile could not be read or written.
    Profile,
}

/// Kind of teardown-phase failure for [`RuntimeError::Cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupKind {
    /// Draining background tasks did not finish cleanly.
    Drain,
    /// Closing the driver failed.
    DriverClose,
    /// Extracting state during teardown failed.
    StateExtraction,
}

/// The runtime's unified error type.
///
/// Every variant carries a discriminant `isRetryable` is derived from via
/// [`RuntimeError::is_retryable`] rather than stored directly, so callers
/// always get a consistent answer from the same classification rules the
/// retry manager uses.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Config validation failed.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// A prerequisite on disk was missing.
    #[error("resource unavailable ({kind:?}): {message}")]
    ResourceUnavailable {
        /// Which kind of resource.
        kind: ResourceKind,
        /// Human-readable detail.
        message: String,
    },

    /// The launcher failed.
    #[error("browser process error at {stage}: {message}")]
    BrowserProcess {
        /// Which stage of the browser process lifecycle failed.
        stage: BrowserProcessStage,
        /// Human-readable detail.
        message: String,
    },

    /// The launched browser did not expose a usable control plane.
    #[error("network launch error at {stage}: {message}")]
    NetworkLaunch {
        /// Which stage failed.
        stage: NetworkLaunchStage,
        /// Human-readable detail.
        message: String,
    },

    /// The fingerprint pipeline failed.
    #[error("fingerprint error ({stage:?}): {message}")]
    Fingerprint {
        /// Which stage failed.
        stage: FingerprintStage,
        /// Human-readable detail.
        message: String,
    },

    /// Applying the restored session context failed.
    #[error("session context error ({stage:?}): {message}")]
    SessionContext {
        /// Which stage failed.
        stage: SessionContextStage,
        /// Human-readable detail.
        message: String,
    },

    /// A plugin hook failed. Never fatal to the surrounding transition.
    #[error("plugin '{name}' failed in {stage}: {message}")]
    Plugin {
        /// The plugin's registered name.
        name: String,
        /// The lifecycle hook that failed.
        stage: String,
        /// Human-readable detail.
        message: String,
    },

    /// A teardown-phase failure. Logged; never blocks the transition.
    #[error("cleanup error ({kind:?}): {message}")]
    Cleanup {
        /// Which cleanup phase.
        kind: CleanupKind,
        /// Human-readable detail.
        message: String,
    },

    /// The outer launch timeout elapsed.
    #[error("launch timed out after {0:?}")]
    LaunchTimeout(Duration),

    /// A `runCritical` task overshot its timeout.
    #[error("critical task '{label}' timed out after {timeout:?}")]
    CriticalTimeout {
        /// The task's label.
        label: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The requested operation is not valid from the current state.
    #[error("operation '{op}' is not valid from state '{from}'")]
    InvalidState {
        /// The state the machine was in.
        from: String,
        /// The operation that was attempted.
        op: String,
    },

    /// `proxyWebSocket` was called without a live endpoint.
    #[error("CDP websocket endpoint is not ready")]
    WebSocketNotReady,

    /// An accessor was called before the first successful launch.
    #[error("browser is not initialized")]
    BrowserNotInitialized,

    /// The session was aborted because a page attempted to load `file://`.
    #[error("file:// navigation attempted, runtime is shutting down")]
    FileProtocolAbort,

    /// A wrapped CDP transport/protocol error.
    #[error("CDP error: {0}")]
    Cdp(#[from] helm_cdp::CdpError),

    /// All attempts of a retried operation failed.
    #[error("operation '{name}' failed after {attempts} attempts: {last_error}")]
    Retry {
        /// The operation's name.
        name: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last error observed.
        last_error: Box<RuntimeError>,
        /// Every error observed across all attempts, in order.
        all_errors: Vec<String>,
    },
}

impl RuntimeError {
    /// Whether the retry manager should retry an operation that failed with
    /// this error.
    ///
    /// This mirrors the classification table in the error handling design:
    /// launch-stage process/network errors are retryable, everything else
    /// that represents a structural or validation failure is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BrowserProcess { stage, .. } => *stage == BrowserProcessStage::Launch,
            Self::NetworkLaunch { .. } => true,
            Self::LaunchTimeout(_) => true,
            Self::ConfigurationInvalid(_)
            | Self::ResourceUnavailable { .. }
            | Self::Fingerprint {
                stage: FingerprintStage::Generation,
                ..
            }
            | Self::SessionContext {
                stage: SessionContextStage::Cookies,
                ..
            }
            | Self::Plugin { .. }
            | Self::Cleanup { .. }
            | Self::CriticalTimeout { .. }
            | Self::InvalidState { .. }
            | Self::WebSocketNotReady
            | Self::BrowserNotInitialized
            | Self::FileProtocolAbort
            | Self::Retry { .. } => false,
            Self::Fingerprint {
                stage: FingerprintStage::Injection,
                ..
            }
            | Self::SessionContext {
                stage: SessionContextStage::Storage,
                ..
            } => false,
            Self::Cdp(_) => true,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_launch_stage_browser_process_errors_are_retryable() {
        assert!(
            RuntimeError::BrowserProcess {
                stage: BrowserProcessStage::Launch,
                message: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !RuntimeError::BrowserProcess {
                stage: BrowserProcessStage::PageAccess,
                message: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn fingerprint_generation_is_fatal_injection_is_not() {
        assert!(
            !RuntimeError::Fingerprint {
                stage: FingerprintStage::Generation,
                message: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !RuntimeError::Fingerprint {
                stage: FingerprintStage::Injection,
                message: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn retry_and_invalid_state_are_never_retryable() {
        assert!(
            !RuntimeError::Retry {
                name: "launch".to_string(),
                attempts: 3,
                last_error: Box::new(RuntimeError::WebSocketNotReady),
                all_errors: Vec::new(),
            }
            .is_retryable()
        );
        assert!(
            !RuntimeError::InvalidState {
                from: "draining".to_string(),
                op: "launch".to_string(),
            }
            .is_retryable()
        );
    }
}
