//! # skymod-core -- Deduplicated List Registration
//!
//! Finds accounts matching a search query on an AT Protocol directory and
//! adds each one to a moderation list owned by the caller, at most once,
//! across any number of runs.
//!
//! ## Components
//!
//! - [`membership`]: the set of identities already on the list, backed by
//!   a newline-delimited snapshot file so later runs skip the remote walk.
//! - [`pagination`]: cursor walk shared by the list-item and search reads.
//! - [`engine`]: the skip-or-register loop over search results.
//! - [`directory`]: the `RemoteDirectory` boundary. HTTP lives in
//!   `skymod-client`; this crate never touches the network itself.
//!
//! ## Crate Policy
//!
//! - Strictly sequential: one page, one registration at a time.
//! - Per-candidate write failures are outcomes, not errors.
//! - No `.unwrap()` outside tests.

pub mod directory;
pub mod engine;
pub mod error;
pub mod identity;
pub mod membership;
pub mod pagination;

pub use directory::{DirectoryError, RemoteDirectory};
pub use engine::{
    CandidateOutcome, CandidateReport, EngineConfig, ModerationContext, RegistrationEngine,
    RunSummary,
};
pub use error::{EngineError, FetchPhase};
pub use identity::{
    Candidate, Cursor, Handle, Identity, IdentityError, ListItem, ListReference, Page,
    SearchQuery,
};
pub use membership::{AddOutcome, MembershipCache, MembershipSource, SnapshotStore};
pub use pagination::{for_each_item, Paginator, PAGE_SIZE};
