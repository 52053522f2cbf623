//! # Registration Engine
//!
//! Walks the search results for a query and adds every account that is not
//! yet on the list, one at a time, in the order the directory returns them.
//!
//! ## Run Phases
//!
//! 1. Load membership (snapshot, or a full remote walk).
//! 2. Pause for [`EngineConfig::pacing`] so the write phase does not start
//!    in the same burst as a large read phase.
//! 3. For each candidate: skip if known, otherwise create the list item and
//!    extend the membership cache.
//!
//! A failed registration is recorded as [`CandidateOutcome::Failed`] and the
//! walk moves on. A failed page read ends the run with an [`EngineError`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::directory::RemoteDirectory;
use crate::error::{EngineError, FetchPhase};
use crate::identity::{Handle, Identity, ListReference, SearchQuery};
use crate::membership::{
    AddOutcome, MembershipCache, MembershipSource, SnapshotStore, DEFAULT_SNAPSHOT,
};
use crate::pagination::{Paginator, PAGE_SIZE};

/// Default pause between the membership read and the first registration.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Session-scoped state shared by every phase of a run: the directory
/// connection, the caller's identity, and the target list.
#[derive(Debug)]
pub struct ModerationContext<D> {
    pub directory: D,
    pub owner: Identity,
    pub list: ListReference,
}

impl<D: RemoteDirectory> ModerationContext<D> {
    /// Resolve the caller through `directory` and derive the reference of
    /// their list `list_id`. This is the first remote call of a run, so bad
    /// credentials surface here.
    pub async fn resolve(directory: D, list_id: &str) -> Result<Self, EngineError> {
        let owner = directory
            .resolve_self()
            .await
            .map_err(|e| EngineError::from_fetch(FetchPhase::Session, e))?;
        let list = ListReference::for_list(&owner, list_id)?;
        Ok(Self {
            directory,
            owner,
            list,
        })
    }
}

/// Tunables for a [`RegistrationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Membership snapshot file.
    pub snapshot: PathBuf,
    /// Pause before the write phase.
    pub pacing: Duration,
    /// Ignore any existing snapshot and rebuild membership remotely.
    pub refresh: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
            pacing: DEFAULT_PACING,
            refresh: false,
        }
    }
}

/// What happened to one search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Already a member of the list.
    Skipped,
    /// List item created. `persisted` is false if the snapshot append failed.
    Registered { persisted: bool },
    /// The directory rejected the registration.
    Failed { reason: String },
}

/// Outcome of one candidate, with what is needed to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    /// 1-based position in the search results.
    pub position: usize,
    pub identity: Identity,
    pub handle: Handle,
    pub outcome: CandidateOutcome,
}

/// Totals and per-candidate outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<CandidateReport>,
    /// Candidates newly added to the list.
    pub registered: usize,
    /// Candidates examined.
    pub seen: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CandidateOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CandidateOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&CandidateOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Skip-or-register loop over search results.
pub struct RegistrationEngine<D> {
    context: ModerationContext<D>,
    config: EngineConfig,
    membership: Option<(MembershipCache, MembershipSource)>,
}

impl<D: RemoteDirectory> RegistrationEngine<D> {
    pub fn new(context: ModerationContext<D>, config: EngineConfig) -> Self {
        Self {
            context,
            config,
            membership: None,
        }
    }

    pub fn context(&self) -> &ModerationContext<D> {
        &self.context
    }

    /// The membership cache, once loaded.
    pub fn membership(&self) -> Option<&MembershipCache> {
        self.membership.as_ref().map(|(cache, _)| cache)
    }

    /// Load membership if not loaded yet. Returns where it came from and
    /// how many members it holds.
    ///
    /// `run` calls this itself; calling it first only lets the caller
    /// report membership before the write phase starts.
    pub async fn prepare(&mut self) -> Result<(MembershipSource, usize), EngineError> {
        let (cache, source) =
            ensure_membership(&self.context, &self.config, &mut self.membership).await?;
        Ok((source, cache.len()))
    }

    /// Register every search result for `query` that is not yet a member.
    pub async fn run(&mut self, query: &SearchQuery) -> Result<RunSummary, EngineError> {
        self.run_with_progress(query, |_| {}).await
    }

    /// Like [`run`](Self::run), handing each candidate's report to
    /// `on_candidate` as soon as its outcome is known.
    pub async fn run_with_progress(
        &mut self,
        query: &SearchQuery,
        mut on_candidate: impl FnMut(&CandidateReport),
    ) -> Result<RunSummary, EngineError> {
        let (cache, _) =
            ensure_membership(&self.context, &self.config, &mut self.membership).await?;

        if !self.config.pacing.is_zero() {
            tracing::debug!(pacing = ?self.config.pacing, "pausing before write phase");
            tokio::time::sleep(self.config.pacing).await;
        }

        let ModerationContext {
            directory,
            owner,
            list,
        } = &self.context;

        tracing::info!(query = %query, list = %list, "walking search results");

        let mut summary = RunSummary::default();
        let mut paginator =
            Paginator::new(|cursor| directory.search_accounts(query, cursor, PAGE_SIZE));

        while let Some(batch) = paginator
            .next_page()
            .await
            .map_err(|e| EngineError::from_fetch(FetchPhase::Search, e))?
        {
            for candidate in batch {
                summary.seen += 1;
                let position = summary.seen;

                let outcome = if cache.contains(&candidate.identity) {
                    tracing::debug!(position, handle = %candidate.handle, "already registered");
                    CandidateOutcome::Skipped
                } else {
                    match directory
                        .create_list_item(owner, list, &candidate.identity, Utc::now())
                        .await
                    {
                        Ok(()) => {
                            summary.registered += 1;
                            let persisted =
                                cache.add(candidate.identity.clone()) != AddOutcome::NotPersisted;
                            tracing::info!(
                                position,
                                identity = %candidate.identity,
                                handle = %candidate.handle,
                                "registered"
                            );
                            CandidateOutcome::Registered { persisted }
                        }
                        Err(e) => {
                            tracing::warn!(
                                position,
                                identity = %candidate.identity,
                                handle = %candidate.handle,
                                "registration failed: {e}"
                            );
                            CandidateOutcome::Failed {
                                reason: e.to_string(),
                            }
                        }
                    }
                };

                let report = CandidateReport {
                    position,
                    identity: candidate.identity,
                    handle: candidate.handle,
                    outcome,
                };
                on_candidate(&report);
                summary.reports.push(report);
            }
        }

        tracing::info!(
            seen = summary.seen,
            registered = summary.registered,
            pages = paginator.pages_fetched(),
            "search exhausted"
        );

        Ok(summary)
    }
}

async fn ensure_membership<'a, D: RemoteDirectory>(
    context: &ModerationContext<D>,
    config: &EngineConfig,
    slot: &'a mut Option<(MembershipCache, MembershipSource)>,
) -> Result<(&'a mut MembershipCache, MembershipSource), EngineError> {
    let loaded = match slot.take() {
        Some(loaded) => loaded,
        None => MembershipCache::load(
            SnapshotStore::new(config.snapshot.clone()),
            &context.directory,
            &context.list,
            &context.owner,
            config.refresh,
        )
        .await
        .map_err(|e| EngineError::from_fetch(FetchPhase::Membership, e))?,
    };
    let (cache, source) = slot.insert(loaded);
    Ok((cache, *source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(position: usize, outcome: CandidateOutcome) -> CandidateReport {
        CandidateReport {
            position,
            identity: Identity::parse(&format!("did:plc:{position}")).unwrap(),
            handle: Handle::new(format!("user{position}.test")),
            outcome,
        }
    }

    #[test]
    fn summary_counts_outcomes() {
        let summary = RunSummary {
            reports: vec![
                report(1, CandidateOutcome::Skipped),
                report(2, CandidateOutcome::Registered { persisted: true }),
                report(
                    3,
                    CandidateOutcome::Failed {
                        reason: "rejected".into(),
                    },
                ),
                report(4, CandidateOutcome::Skipped),
            ],
            registered: 1,
            seen: 4,
        };
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn default_config_matches_cli_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.snapshot, PathBuf::from("ignore.txt"));
        assert_eq!(config.pacing, Duration::from_secs(2));
        assert!(!config.refresh);
    }
}
