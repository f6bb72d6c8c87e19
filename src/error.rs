//! Error taxonomy for the browser-facing layers.
//!
//! The classification drives recovery: `DeadSession` is recoverable via a
//! single rebuild, `Timeout` means "stop loading and let explicit waits take
//! over", `Transient` gets bounded retries, and `ElementNotFound` degrades to
//! an absent value instead of aborting a batch.

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Errors raised by session, navigation, and extraction code.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser could not be launched at all. Aborts the run.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// The browser process or its control channel is gone. Recoverable by
    /// rebuilding the session, bounded to one retry after rebuild.
    #[error("browser session dead: {0}")]
    DeadSession(String),

    /// A deadline elapsed. Not a navigation failure; callers stop further
    /// loading and proceed with explicit waits.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Something went wrong that a bounded retry with a pacing delay may fix.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A DOM element could not be resolved. Per-item skip, never fatal to a
    /// batch.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The target site presented a login wall that did not clear after the
    /// operator prompt cycle.
    #[error("login required on target site")]
    LoginRequired,

    /// No live session handle; `create` or `rebuild` must run first.
    #[error("no live browser session")]
    NotConnected,
}

/// Message substrings that indicate the browser session is unusable and must
/// be recreated, as opposed to a merely slow or failed single request.
const DEAD_SESSION_MARKERS: &[&str] = &[
    "invalid session id",
    "not connected to devtools",
    "session deleted",
    "session closed",
    "disconnected",
    "browser not reachable",
    "connection closed",
    "websocket",
];

impl ScrapeError {
    /// Classify a CDP error into the recovery taxonomy.
    ///
    /// Channel and websocket failures mean the control connection to the
    /// browser is gone; everything else affecting a single call is transient.
    pub fn from_cdp(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => ScrapeError::Timeout("CDP request deadline elapsed".into()),
            CdpError::Ws(e) => ScrapeError::DeadSession(format!("websocket: {e}")),
            CdpError::ChannelSendError(e) => {
                ScrapeError::DeadSession(format!("control channel: {e}"))
            }
            CdpError::NoResponse => {
                ScrapeError::DeadSession("no response from browser instance".into())
            }
            other => {
                let msg = other.to_string();
                if is_dead_session_message(&msg) {
                    ScrapeError::DeadSession(msg)
                } else {
                    ScrapeError::Transient(msg)
                }
            }
        }
    }

}

/// Substring check shared by the CDP classifier and tests.
pub fn is_dead_session_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    DEAD_SESSION_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_session_markers_match_case_insensitively() {
        assert!(is_dead_session_message("Invalid Session ID: xyz"));
        assert!(is_dead_session_message("chrome browser not reachable"));
        assert!(is_dead_session_message("tab session deleted by browser"));
        assert!(!is_dead_session_message("element is stale"));
        assert!(!is_dead_session_message("no node with given id"));
    }

    #[test]
    fn timeout_classifies_as_timeout() {
        let err = ScrapeError::from_cdp(CdpError::Timeout);
        assert!(matches!(err, ScrapeError::Timeout(_)));
    }
}
