//! # skymod-cli -- Bulk moderation-list registration
//!
//! Provides the `skymod` command:
//!
//! ```bash
//! skymod alice.bsky.social app-password 3kmodlist "crypto giveaway"
//! skymod -v --refresh --snapshot state/ignore.txt alice.bsky.social app-password 3kmodlist spam
//! ```
//!
//! Every account the search returns is added to the list unless it is
//! already a member. Membership is cached in a local snapshot, so an
//! interrupted run can simply be restarted.
//!
//! Progress goes to stdout, diagnostics to stderr via `tracing`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use url::Url;

use skymod_client::{DirectoryConfig, XrpcClient};
use skymod_core::membership::DEFAULT_SNAPSHOT;
use skymod_core::{
    CandidateOutcome, CandidateReport, EngineConfig, MembershipSource, ModerationContext,
    RegistrationEngine, SearchQuery,
};

/// Arguments for a registration run.
#[derive(Args)]
pub struct RunArgs {
    /// Account handle or email to log in with.
    #[arg(value_name = "IDENTIFIER")]
    pub identifier: String,

    /// Account app password.
    #[arg(value_name = "PASSWORD")]
    pub password: String,

    /// Record key of the moderation list, the last segment of its URL.
    #[arg(value_name = "LIST_ID")]
    pub list_id: String,

    /// Account search query.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Membership snapshot file.
    #[arg(long, default_value = DEFAULT_SNAPSHOT)]
    pub snapshot: PathBuf,

    /// Seconds to wait between loading membership and the first write.
    #[arg(long, default_value_t = 2)]
    pub pacing_secs: u64,

    /// Rebuild membership from the list even if a snapshot exists.
    #[arg(long)]
    pub refresh: bool,

    /// AT Protocol service URL. Overrides SKYMOD_SERVICE_URL.
    #[arg(long)]
    pub service_url: Option<Url>,
}

impl std::fmt::Debug for RunArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunArgs")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .field("list_id", &self.list_id)
            .field("query", &self.query)
            .field("snapshot", &self.snapshot)
            .field("pacing_secs", &self.pacing_secs)
            .field("refresh", &self.refresh)
            .field("service_url", &self.service_url)
            .finish()
    }
}

/// Default log filter for a `-v` count. `RUST_LOG` takes precedence.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,skymod=info,skymod_cli=info,skymod_core=info,skymod_client=info",
        1 => "warn,skymod=debug,skymod_cli=debug,skymod_core=debug,skymod_client=debug",
        _ => "trace",
    }
}

/// Execute a registration run.
///
/// Returns exit code 0 once the search is exhausted, whether or not
/// individual registrations failed. Configuration, login and fetch failures
/// are returned as errors.
pub async fn run(args: RunArgs) -> Result<u8> {
    let query = SearchQuery::new(&args.query).context("invalid search query")?;

    let mut config = DirectoryConfig::new(args.identifier.as_str(), args.password.as_str())
        .context("invalid directory configuration")?;
    if let Some(url) = args.service_url.clone() {
        config = config.with_service_url(url);
    }
    tracing::debug!(?config, "directory configuration");

    let client = XrpcClient::new(config).context("failed to build XRPC client")?;
    let context = ModerationContext::resolve(client, &args.list_id)
        .await
        .context("failed to establish moderation context")?;

    println!("caller: {}", context.owner);
    println!("list:   {}", context.list);

    let mut engine = RegistrationEngine::new(
        context,
        EngineConfig {
            snapshot: args.snapshot.clone(),
            pacing: Duration::from_secs(args.pacing_secs),
            refresh: args.refresh,
        },
    );

    let (source, members) = engine
        .prepare()
        .await
        .context("failed to load list membership")?;
    println!("{}", membership_line(source, members, &args.snapshot));

    let summary = engine
        .run_with_progress(&query, |report| println!("{}", progress_line(report)))
        .await
        .context("search failed")?;

    println!("🎉 newly registered: {}", summary.registered);
    tracing::info!(
        seen = summary.seen,
        skipped = summary.skipped(),
        failed = summary.failed(),
        "run complete"
    );

    Ok(0)
}

fn membership_line(source: MembershipSource, members: usize, snapshot: &std::path::Path) -> String {
    match source {
        MembershipSource::Snapshot => {
            format!("members: {members} (from snapshot {})", snapshot.display())
        }
        MembershipSource::Remote => format!("members: {members} (from list records)"),
    }
}

/// One stdout line for a candidate outcome.
pub fn progress_line(report: &CandidateReport) -> String {
    let n = report.position;
    let handle = &report.handle;
    match &report.outcome {
        CandidateOutcome::Registered { persisted: true } => {
            format!("✅ {n} registered: {handle}")
        }
        CandidateOutcome::Registered { persisted: false } => {
            format!("✅ {n} registered: {handle} (snapshot not updated)")
        }
        CandidateOutcome::Skipped => format!("⚠️ {n} skipped (already registered): {handle}"),
        CandidateOutcome::Failed { reason } => format!("❌ {n} failed: {handle} ({reason})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use skymod_core::{Handle, Identity};

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> Result<RunArgs, clap::Error> {
        TestCli::try_parse_from(argv).map(|cli| cli.args)
    }

    fn report(position: usize, outcome: CandidateOutcome) -> CandidateReport {
        CandidateReport {
            position,
            identity: Identity::parse("did:plc:abc").unwrap(),
            handle: Handle::new("abc.bsky.social"),
            outcome,
        }
    }

    #[test]
    fn positional_arguments_and_defaults() {
        let args = parse(&["skymod", "alice.test", "pw", "3kmodlist", "crypto giveaway"]).unwrap();
        assert_eq!(args.identifier, "alice.test");
        assert_eq!(args.list_id, "3kmodlist");
        assert_eq!(args.query, "crypto giveaway");
        assert_eq!(args.snapshot, PathBuf::from("ignore.txt"));
        assert_eq!(args.pacing_secs, 2);
        assert!(!args.refresh);
        assert!(args.service_url.is_none());
    }

    #[test]
    fn options_override_defaults() {
        let args = parse(&[
            "skymod",
            "--snapshot",
            "/tmp/members.txt",
            "--pacing-secs",
            "0",
            "--refresh",
            "--service-url",
            "http://127.0.0.1:2583",
            "alice.test",
            "pw",
            "3kmodlist",
            "spam",
        ])
        .unwrap();
        assert_eq!(args.snapshot, PathBuf::from("/tmp/members.txt"));
        assert_eq!(args.pacing_secs, 0);
        assert!(args.refresh);
        assert_eq!(
            args.service_url.map(|u| u.to_string()),
            Some("http://127.0.0.1:2583/".to_string())
        );
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        assert!(parse(&["skymod", "alice.test", "pw", "3kmodlist"]).is_err());
        assert!(parse(&["skymod", "a", "b", "c", "d", "e"]).is_err());
    }

    #[test]
    fn invalid_service_url_is_rejected() {
        assert!(parse(&["skymod", "--service-url", "not a url", "a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let args = parse(&["skymod", "alice.test", "hunter2", "3kmodlist", "spam"]).unwrap();
        let rendered = format!("{args:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn progress_lines_match_outcomes() {
        assert_eq!(
            progress_line(&report(1, CandidateOutcome::Registered { persisted: true })),
            "✅ 1 registered: abc.bsky.social"
        );
        assert_eq!(
            progress_line(&report(2, CandidateOutcome::Skipped)),
            "⚠️ 2 skipped (already registered): abc.bsky.social"
        );
        assert_eq!(
            progress_line(&report(
                3,
                CandidateOutcome::Failed {
                    reason: "rate limited".into()
                }
            )),
            "❌ 3 failed: abc.bsky.social (rate limited)"
        );
    }

    #[test]
    fn unpersisted_registration_is_flagged() {
        let line = progress_line(&report(4, CandidateOutcome::Registered { persisted: false }));
        assert!(line.starts_with("✅ 4 registered"));
        assert!(line.ends_with("(snapshot not updated)"));
    }

    #[test]
    fn verbosity_levels_widen() {
        assert!(verbosity_filter(0).contains("skymod_core=info"));
        assert!(verbosity_filter(1).contains("skymod_core=debug"));
        assert_eq!(verbosity_filter(5), "trace");
    }

    #[test]
    fn default_filter_keeps_run_summary_from_library() {
        assert!(verbosity_filter(0).contains("skymod_cli=info"));
        assert!(verbosity_filter(1).contains("skymod_cli=debug"));
    }

    #[tokio::test]
    async fn blank_query_fails_before_any_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("ignore.txt");
        let mut args = parse(&["skymod", "alice.test", "pw", "3kmodlist", " "]).unwrap();
        args.snapshot = snapshot.clone();
        args.service_url = Some(Url::parse("http://127.0.0.1:9").unwrap());

        let err = run(args).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid search query"));
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn missing_password_fails_before_any_remote_call() {
        let mut args = parse(&["skymod", "alice.test", "", "3kmodlist", "spam"]).unwrap();
        args.service_url = Some(Url::parse("http://127.0.0.1:9").unwrap());

        let err = run(args).await.unwrap_err();
        assert!(format!("{err:#}").contains("account password is required"));
    }
}
