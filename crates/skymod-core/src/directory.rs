//! # Remote Directory Boundary
//!
//! The `RemoteDirectory` trait abstracts the AT Protocol service the engine
//! reads from and writes to. The production implementation lives in
//! `skymod-client`; tests use in-memory fakes. Session handling is the
//! implementation's business: the first call that needs a session
//! establishes it, and every later call reuses it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::identity::{Candidate, Cursor, Identity, ListItem, ListReference, Page, SearchQuery};

/// Transport-neutral failure reported by a [`RemoteDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Credentials were rejected or the session is no longer accepted.
    #[error("authentication failed: {reason}")]
    Unauthorized { reason: String },

    /// The request never produced a response.
    #[error("transport error calling {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The service answered with a non-success status (including duplicate
    /// and validation rejections on writes).
    #[error("{endpoint} returned {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response could not be decoded.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

impl DirectoryError {
    /// Whether this failure is a credential problem rather than a data one.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Account, search and list-management operations of the remote service.
///
/// Implementations must be `Send + Sync`. The trait is object-safe to support
/// runtime selection between the live client and test fakes.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Identity of the authenticated caller.
    async fn resolve_self(&self) -> Result<Identity, DirectoryError>;

    /// One page of list-item records in `owner`'s repository, across all of
    /// the owner's lists.
    async fn list_items(
        &self,
        owner: &Identity,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<ListItem>, DirectoryError>;

    /// One page of accounts matching `query`.
    async fn search_accounts(
        &self,
        query: &SearchQuery,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<Candidate>, DirectoryError>;

    /// Create a list-item record making `subject` a member of `list`.
    async fn create_list_item(
        &self,
        owner: &Identity,
        list: &ListReference,
        subject: &Identity,
        created_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError>;

    /// Human-readable name for log lines.
    fn directory_name(&self) -> &str;
}
