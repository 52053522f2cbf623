//! # Identifier Newtypes
//!
//! Every value that crosses the directory boundary gets its own type, so an
//! account's [`Identity`] can never be passed where a [`ListReference`] or a
//! display [`Handle`] is expected.
//!
//! ## Snapshot Invariant
//!
//! The membership snapshot stores one identity per line. [`Identity::parse`]
//! rejects any value containing whitespace, which keeps that format
//! unambiguous without escaping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Collection name of list-item records in an AT Protocol repository.
pub const LIST_ITEM_COLLECTION: &str = "app.bsky.graph.listitem";

/// Collection name of list records in an AT Protocol repository.
pub const LIST_COLLECTION: &str = "app.bsky.graph.list";

/// Errors from identifier construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Input was empty after trimming.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which identifier was being parsed.
        kind: &'static str,
    },

    /// Input contained whitespace inside the value.
    #[error("{kind} must not contain whitespace: {value:?}")]
    Whitespace {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}

fn validate_token(kind: &'static str, raw: &str) -> Result<String, IdentityError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Empty { kind });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(IdentityError::Whitespace {
            kind,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Stable, globally unique account identifier (a DID such as `did:plc:...`).
///
/// Never reused and never mutated by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Parse an identity, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        validate_token("identity", raw).map(Self)
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable account label. Mutable on the remote side, so it is only
/// ever used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// AT-URI of the target moderation list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListReference(String);

impl ListReference {
    /// Build the reference for list `list_id` owned by `owner`:
    /// `at://{owner}/app.bsky.graph.list/{list_id}`.
    pub fn for_list(owner: &Identity, list_id: &str) -> Result<Self, IdentityError> {
        let list_id = validate_token("list id", list_id)?;
        Ok(Self(format!("at://{owner}/{LIST_COLLECTION}/{list_id}")))
    }

    /// Wrap a reference exactly as the directory reported it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque pagination continuation token. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Convert a cursor as received on the wire. Absent and empty tokens
    /// both mean "no more pages".
    pub fn from_wire(raw: Option<String>) -> Option<Self> {
        raw.filter(|c| !c.is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free-text account search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty { kind: "search query" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a paginated remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Where the next page starts; `None` on the last page.
    pub cursor: Option<Cursor>,
}

/// A list-item record: `subject` is a member of `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub subject: Identity,
    pub list: ListReference,
}

/// One account returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub identity: Identity,
    pub handle: Handle,
}
