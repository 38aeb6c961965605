/// Session state definitions for the crawl worker
///
/// A crawler instance runs at most one session at a time. The session moves
/// `Idle -> Running -> {Done | Error}` and back to `Idle` on an explicit clear.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Represents the overall state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session has run since the last clear
    #[default]
    Idle,

    /// The worker is fetching pages
    Running,

    /// The frontier emptied, the page bound was hit, or a stop was requested
    Done,

    /// The session hit an unrecoverable condition (bad or unreachable seed)
    Error,
}

impl SessionStatus {
    /// Returns true if this is a terminal state of a finished session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true if a worker is active
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if moving from this state to `next` is allowed
    ///
    /// Starting a new session is accepted from any non-running state, which
    /// implicitly resets a finished session.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::Running, Self::Done | Self::Error) => true,
            (Self::Running, _) => false,
            (_, Self::Running) => true,
            (Self::Done | Self::Error, Self::Idle) => true,
            (Self::Idle, Self::Idle) => true,
            _ => false,
        }
    }

    /// Returns the lowercase name used in status payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current (or last) session
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub status: SessionStatus,

    /// The target currently being fetched, if any
    pub current_target: Option<String>,

    pub started_at: Option<DateTime<Utc>>,

    /// Time since start, or the final duration once the session ended
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
