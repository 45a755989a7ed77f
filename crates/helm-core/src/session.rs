//! Session State Machine (spec §4.4, C4).
//!
//! A thin state tag plus the data that is valid exactly when `state == Live`
//! (spec §3 invariant: "a live-state field is non-null iff state == live").

use crate::config::SessionConfig;
use crate::driver::{BrowserHandle, PrimaryPage};

/// The reason a `live` session moved to `error`, recorded so `recover()` and
/// `terminate()` know whether a `forceClose` is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedFrom {
    Launching,
    Live,
    Draining,
}

/// Session lifecycle tag (spec §4.4).
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Launching,
    Live(LiveSession),
    Draining,
    Closed,
    Error { failed_from: FailedFrom },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Launching => "launching",
            Self::Live(_) => "live",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub fn live(&self) -> Option<&LiveSession> {
        match self {
            Self::Live(live) => Some(live),
            _ => None,
        }
    }
}

/// Data that exists only while `SessionState::Live`.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub browser: BrowserHandle,
    pub primary_page: PrimaryPage,
    pub config: SessionConfig,
    pub fingerprint: crate::config::Fingerprint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_name_matches_spec_vocabulary() {
        assert_eq!(SessionState::Idle.name(), "idle");
        assert_eq!(SessionState::Launching.name(), "launching");
        assert_eq!(SessionState::Draining.name(), "draining");
        assert_eq!(SessionState::Closed.name(), "closed");
        assert_eq!(
            SessionState::Error {
                failed_from: FailedFrom::Live
            }
            .name(),
            "error"
        );
    }

    #[test]
    fn only_live_state_is_live() {
        assert!(!SessionState::Idle.is_live());
        assert!(!SessionState::Draining.is_live());
        assert!(
            SessionState::Error {
                failed_from: FailedFrom::Launching
            }
            .live()
            .is_none()
        );
    }
}
