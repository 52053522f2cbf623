//! # Membership Cache
//!
//! The set of identities already on the target list. A run consults it
//! before every registration and extends it after every success.
//!
//! ## Persistence
//!
//! The durable copy is a plain text snapshot, one identity per line, no
//! header. It is written two ways:
//!
//! - [`SnapshotStore::rehydrate`] after a full remote walk: complete
//!   rewrite, sorted ascending, swapped in by rename.
//! - [`SnapshotStore::record`] after each registration: one appended line.
//!
//! ## Invariant
//!
//! Every identity registered successfully is in the in-memory set before
//! the next candidate is considered. Extra identities only cost a skip;
//! missing ones would cost a duplicate record, so the snapshot is trusted
//! only as a superset of what this tool wrote.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::directory::{DirectoryError, RemoteDirectory};
use crate::identity::{Identity, ListReference};
use crate::pagination::{for_each_item, PAGE_SIZE};

/// Default snapshot file name, relative to the working directory.
pub const DEFAULT_SNAPSHOT: &str = "ignore.txt";

/// Newline-delimited snapshot file of member identities.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. Blank lines are ignored; lines that are not a
    /// valid identity are skipped with a warning.
    pub fn read(&self) -> io::Result<HashSet<Identity>> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut members = HashSet::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match Identity::parse(line) {
                Ok(id) => {
                    members.insert(id);
                }
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    "skipping snapshot line: {e}"
                ),
            }
        }
        Ok(members)
    }

    /// Replace the snapshot with exactly `members`, sorted ascending.
    pub fn rehydrate<'a>(&self, members: impl IntoIterator<Item = &'a Identity>) -> io::Result<()> {
        let mut sorted: Vec<&Identity> = members.into_iter().collect();
        sorted.sort();

        let mut content = String::new();
        for id in sorted {
            content.push_str(id.as_str());
            content.push('\n');
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
    }

    /// Append one identity, creating the snapshot if it does not exist.
    ///
    /// A last line without its terminator is closed first so the new
    /// identity lands on a line of its own.
    pub fn record(&self, id: &Identity) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }
        writeln!(file, "{id}")
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT)
    }
}

/// Where a loaded membership set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipSource {
    /// Read from the local snapshot.
    Snapshot,
    /// Reconstructed by walking the owner's list items.
    Remote,
}

/// Result of [`MembershipCache::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Already a member; nothing written.
    AlreadyPresent,
    /// Added in memory and appended to the snapshot.
    Persisted,
    /// Added in memory, but the snapshot append failed.
    NotPersisted,
}

/// In-memory membership set plus its durable snapshot.
#[derive(Debug)]
pub struct MembershipCache {
    members: HashSet<Identity>,
    store: SnapshotStore,
}

impl MembershipCache {
    /// A cache with no known members. `add` works immediately.
    pub fn empty(store: SnapshotStore) -> Self {
        Self {
            members: HashSet::new(),
            store,
        }
    }

    /// Load from the snapshot alone.
    pub fn from_snapshot(store: SnapshotStore) -> io::Result<Self> {
        let members = store.read()?;
        tracing::info!(
            path = %store.path().display(),
            count = members.len(),
            "membership loaded from snapshot"
        );
        Ok(Self { members, store })
    }

    /// Rebuild membership from the directory: walk every list item in
    /// `owner`'s repository, keep the ones on `list`, then rewrite the
    /// snapshot.
    ///
    /// A fetch failure is returned; a snapshot write failure is only logged.
    pub async fn hydrate_from_remote<D>(
        store: SnapshotStore,
        directory: &D,
        list: &ListReference,
        owner: &Identity,
    ) -> Result<Self, DirectoryError>
    where
        D: RemoteDirectory + ?Sized,
    {
        let mut members = HashSet::new();
        let scanned = for_each_item(
            |cursor| directory.list_items(owner, cursor, PAGE_SIZE),
            |item| {
                if item.list == *list {
                    members.insert(item.subject);
                }
            },
        )
        .await?;

        tracing::info!(
            directory = directory.directory_name(),
            scanned,
            count = members.len(),
            "membership hydrated from remote"
        );

        if let Err(e) = store.rehydrate(&members) {
            tracing::warn!(
                path = %store.path().display(),
                "failed to write membership snapshot: {e}"
            );
        }

        Ok(Self { members, store })
    }

    /// Load membership, preferring the snapshot unless `refresh` is set or
    /// the snapshot cannot be read.
    pub async fn load<D>(
        store: SnapshotStore,
        directory: &D,
        list: &ListReference,
        owner: &Identity,
        refresh: bool,
    ) -> Result<(Self, MembershipSource), DirectoryError>
    where
        D: RemoteDirectory + ?Sized,
    {
        if !refresh {
            match Self::from_snapshot(store.clone()) {
                Ok(cache) => return Ok((cache, MembershipSource::Snapshot)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %store.path().display(), "no membership snapshot");
                }
                Err(e) => tracing::warn!(
                    path = %store.path().display(),
                    "unreadable membership snapshot, hydrating from remote: {e}"
                ),
            }
        }

        let cache = Self::hydrate_from_remote(store, directory, list, owner).await?;
        Ok((cache, MembershipSource::Remote))
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Record a new member. Idempotent.
    ///
    /// The in-memory insert always happens, so the rest of this run skips
    /// `id` even if the snapshot append fails.
    pub fn add(&mut self, id: Identity) -> AddOutcome {
        if self.members.contains(&id) {
            return AddOutcome::AlreadyPresent;
        }

        let outcome = match self.store.record(&id) {
            Ok(()) => AddOutcome::Persisted,
            Err(e) => {
                tracing::warn!(
                    identity = %id,
                    path = %self.store.path().display(),
                    "failed to append to membership snapshot: {e}"
                );
                AddOutcome::NotPersisted
            }
        };
        self.members.insert(id);
        outcome
    }
}
