//! Authenticated XRPC sessions.
//!
//! A session is created on the first call that needs one and reused for the
//! rest of the process. Before each reuse the client asks its
//! [`SessionValidator`]; a `false` verdict makes the next call
//! re-authenticate.

use serde::{Deserialize, Serialize};

/// `com.atproto.server.createSession` request body.
#[derive(Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

/// An authenticated session.
///
/// Custom `Debug` implementation redacts both tokens.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub refresh_jwt: String,
    /// The account's DID.
    pub did: String,
    pub handle: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_jwt", &"[REDACTED]")
            .field("refresh_jwt", &"[REDACTED]")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Decides whether an established session may be reused.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, session: &Session) -> bool;
}

/// Treats every established session as valid for the life of the process.
///
/// There is no expiry check yet; a real implementation would call
/// `com.atproto.server.getSession` or inspect the access token's `exp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeValid;

impl SessionValidator for AssumeValid {
    fn validate(&self, _session: &Session) -> bool {
        true
    }
}
