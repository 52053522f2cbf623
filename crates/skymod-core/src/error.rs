//! # Engine Errors
//!
//! Only failures that end a run are errors. A rejected registration is a
//! [`CandidateOutcome::Failed`](crate::engine::CandidateOutcome::Failed)
//! and a snapshot write failure is a warning; neither appears here.

use std::fmt;

use crate::directory::DirectoryError;
use crate::identity::IdentityError;

/// Which remote read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Resolving the caller's own identity at startup.
    Session,
    /// Reconstructing list membership from the owner's list items.
    Membership,
    /// Walking search results.
    Search,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Membership => write!(f, "membership"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// Fatal errors from a registration run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An invocation parameter is unusable (blank list id, blank query).
    #[error("invalid configuration: {0}")]
    Config(#[from] IdentityError),

    /// The directory rejected the caller's credentials.
    #[error("login rejected by directory: {0}")]
    Authentication(#[source] DirectoryError),

    /// A remote read failed; the run cannot continue safely.
    #[error("{phase} fetch failed: {source}")]
    Fetch {
        phase: FetchPhase,
        #[source]
        source: DirectoryError,
    },
}

impl EngineError {
    /// Classify a read failure: credential problems are authentication
    /// errors whatever phase hit them.
    pub fn from_fetch(phase: FetchPhase, source: DirectoryError) -> Self {
        if source.is_auth() {
            Self::Authentication(source)
        } else {
            Self::Fetch { phase, source }
        }
    }
}
