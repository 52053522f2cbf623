//! In-memory `RemoteDirectory` for engine and membership tests.

#![allow(dead_code)]

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skymod_core::{
    Candidate, Cursor, DirectoryError, Handle, Identity, ListItem, ListReference, Page,
    RemoteDirectory, SearchQuery,
};

pub const OWNER: &str = "did:plc:owner";
pub const LIST_ID: &str = "3kmodlist";

pub fn id(raw: &str) -> Identity {
    Identity::parse(raw).unwrap()
}

pub fn owner() -> Identity {
    id(OWNER)
}

pub fn target_list() -> ListReference {
    ListReference::for_list(&owner(), LIST_ID).unwrap()
}

pub fn other_list() -> ListReference {
    ListReference::for_list(&owner(), "3kotherlist").unwrap()
}

pub fn candidate(did: &str) -> Candidate {
    let handle = did.rsplit(':').next().unwrap_or(did);
    Candidate {
        identity: id(did),
        handle: Handle::new(format!("{handle}.bsky.social")),
    }
}

#[derive(Debug, Default)]
struct State {
    records: Vec<ListItem>,
    accounts: Vec<Candidate>,
    reject_writes: HashSet<Identity>,
    fail_list_at_call: Option<usize>,
    fail_search_at_call: Option<usize>,
    unauthorized: bool,
    writes: Vec<Identity>,
    list_calls: usize,
    search_calls: usize,
}

/// Fake directory serving fixed-size pages with offset cursors.
#[derive(Debug)]
pub struct FakeDirectory {
    page_size: usize,
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            state: Mutex::new(State::default()),
        }
    }

    /// Existing list-item records in the owner's repository.
    pub fn with_records(self, records: Vec<ListItem>) -> Self {
        self.state.lock().records = records;
        self
    }

    /// Search results, in the order the directory returns them.
    pub fn with_accounts(self, accounts: Vec<Candidate>) -> Self {
        self.state.lock().accounts = accounts;
        self
    }

    pub fn reject_writes_for(self, did: &str) -> Self {
        self.state.lock().reject_writes.insert(id(did));
        self
    }

    /// Fail the n-th (1-based) list-items call.
    pub fn fail_list_at(self, call: usize) -> Self {
        self.state.lock().fail_list_at_call = Some(call);
        self
    }

    /// Fail the n-th (1-based) search call.
    pub fn fail_search_at(self, call: usize) -> Self {
        self.state.lock().fail_search_at_call = Some(call);
        self
    }

    pub fn unauthorized(self) -> Self {
        self.state.lock().unauthorized = true;
        self
    }

    /// Every successful registration, in order.
    pub fn writes(&self) -> Vec<Identity> {
        self.state.lock().writes.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn search_calls(&self) -> usize {
        self.state.lock().search_calls
    }

    fn page<T: Clone>(&self, all: &[T], cursor: Option<Cursor>, limit: u32) -> Page<T> {
        let start: usize = cursor.map(|c| c.as_str().parse().unwrap()).unwrap_or(0);
        let size = self.page_size.min(limit as usize);
        let end = (start + size).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        Page {
            items: all[start..end].to_vec(),
            cursor: Cursor::from_wire(next),
        }
    }
}

#[async_trait]
impl RemoteDirectory for FakeDirectory {
    async fn resolve_self(&self) -> Result<Identity, DirectoryError> {
        if self.state.lock().unauthorized {
            return Err(DirectoryError::Unauthorized {
                reason: "Invalid identifier or password".into(),
            });
        }
        Ok(owner())
    }

    async fn list_items(
        &self,
        owner: &Identity,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<ListItem>, DirectoryError> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.unauthorized {
            return Err(DirectoryError::Unauthorized {
                reason: "ExpiredToken".into(),
            });
        }
        if state.fail_list_at_call == Some(state.list_calls) {
            return Err(DirectoryError::Transport {
                endpoint: "GET com.atproto.repo.listRecords".into(),
                reason: "connection reset".into(),
            });
        }
        assert_eq!(owner.as_str(), OWNER);
        let records = state.records.clone();
        Ok(self.page(&records, cursor, limit))
    }

    async fn search_accounts(
        &self,
        _query: &SearchQuery,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<Candidate>, DirectoryError> {
        let mut state = self.state.lock();
        state.search_calls += 1;
        if state.fail_search_at_call == Some(state.search_calls) {
            return Err(DirectoryError::Rejected {
                endpoint: "GET app.bsky.actor.searchActors".into(),
                status: 502,
                body: "upstream unavailable".into(),
            });
        }
        let accounts = state.accounts.clone();
        Ok(self.page(&accounts, cursor, limit))
    }

    async fn create_list_item(
        &self,
        _owner: &Identity,
        list: &ListReference,
        subject: &Identity,
        _created_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock();
        if state.reject_writes.contains(subject) {
            return Err(DirectoryError::Rejected {
                endpoint: "POST com.atproto.repo.createRecord".into(),
                status: 400,
                body: "InvalidRequest".into(),
            });
        }
        state.writes.push(subject.clone());
        state.records.push(ListItem {
            subject: subject.clone(),
            list: list.clone(),
        });
        Ok(())
    }

    fn directory_name(&self) -> &str {
        "FakeDirectory"
    }
}
