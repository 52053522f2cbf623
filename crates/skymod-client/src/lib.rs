//! # skymod-client -- Typed XRPC client for AT Protocol services
//!
//! Implements [`skymod_core::RemoteDirectory`] over HTTPS against a PDS such
//! as `bsky.social`. Four XRPC methods are used:
//!
//! | Method | NSID | Operation |
//! |--------|------|-----------|
//! | POST | `com.atproto.server.createSession` | Log in |
//! | GET  | `com.atproto.repo.listRecords` | Existing list items |
//! | GET  | `app.bsky.actor.searchActors` | Account search |
//! | POST | `com.atproto.repo.createRecord` | Add a list item |
//!
//! ## Sessions
//!
//! The session is created lazily by the first call that needs it and then
//! shared by every later call; see [`session`].
//!
//! ## Retries
//!
//! None. A transport error is returned immediately and the engine decides
//! whether it is fatal.

pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use config::DirectoryConfig;
pub use error::XrpcError;
pub use session::{AssumeValid, Session, SessionValidator};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use skymod_core::identity::LIST_ITEM_COLLECTION;
use skymod_core::{
    Candidate, Cursor, DirectoryError, Handle, Identity, ListItem, ListReference, Page,
    RemoteDirectory, SearchQuery,
};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const LIST_RECORDS: &str = "com.atproto.repo.listRecords";
const SEARCH_ACTORS: &str = "app.bsky.actor.searchActors";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

/// XRPC client bound to one account.
pub struct XrpcClient {
    http: reqwest::Client,
    service_url: url::Url,
    identifier: String,
    password: Zeroizing<String>,
    session: Mutex<Option<Arc<Session>>>,
    validator: Box<dyn SessionValidator>,
}

impl std::fmt::Debug for XrpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrpcClient")
            .field("service_url", &self.service_url)
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .field("session", &self.session.lock().as_deref())
            .finish()
    }
}

impl XrpcClient {
    /// Create a new client from configuration. No request is sent until the
    /// first operation.
    pub fn new(config: DirectoryConfig) -> Result<Self, XrpcError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| XrpcError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            service_url: config.service_url,
            identifier: config.identifier,
            password: config.password,
            session: Mutex::new(None),
            validator: Box::new(AssumeValid),
        })
    }

    /// Replace the session validator.
    pub fn with_validator(mut self, validator: impl SessionValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// The current session, creating one if there is none or the validator
    /// rejects the cached one.
    pub async fn session(&self) -> Result<Arc<Session>, XrpcError> {
        let cached = self.session.lock().clone();
        if let Some(session) = cached {
            if self.validator.validate(&session) {
                return Ok(session);
            }
            tracing::info!(did = %session.did, "session rejected by validator, logging in again");
        }

        let session = Arc::new(self.create_session().await?);
        *self.session.lock() = Some(Arc::clone(&session));
        Ok(session)
    }

    async fn create_session(&self) -> Result<Session, XrpcError> {
        let endpoint = format!("POST {CREATE_SESSION}");
        let body = session::CreateSessionRequest {
            identifier: &self.identifier,
            password: self.password.as_str(),
        };

        let resp = self
            .http
            .post(self.method_url(CREATE_SESSION))
            .json(&body)
            .send()
            .await
            .map_err(|e| XrpcError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let session: Session = decode(endpoint, resp).await?;
        tracing::info!(did = %session.did, handle = %session.handle, "session established");
        Ok(session)
    }

    /// One page of `app.bsky.graph.listitem` records in `repo`.
    pub async fn list_records(
        &self,
        repo: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<types::ListRecordsResponse, XrpcError> {
        let session = self.session().await?;
        let endpoint = format!("GET {LIST_RECORDS}");

        let mut query = vec![
            ("repo", repo.to_string()),
            ("collection", LIST_ITEM_COLLECTION.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let resp = self
            .http
            .get(self.method_url(LIST_RECORDS))
            .bearer_auth(&session.access_jwt)
            .query(&query)
            .send()
            .await
            .map_err(|e| XrpcError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        decode(endpoint, resp).await
    }

    /// One page of actor search results.
    pub async fn search_actors(
        &self,
        q: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<types::SearchActorsResponse, XrpcError> {
        let session = self.session().await?;
        let endpoint = format!("GET {SEARCH_ACTORS}");

        let mut query = vec![("q", q.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let resp = self
            .http
            .get(self.method_url(SEARCH_ACTORS))
            .bearer_auth(&session.access_jwt)
            .query(&query)
            .send()
            .await
            .map_err(|e| XrpcError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        decode(endpoint, resp).await
    }

    /// Create a list-item record in `repo`.
    pub async fn create_list_item_record(
        &self,
        repo: &str,
        record: &types::ListItemRecord,
    ) -> Result<types::CreateRecordResponse, XrpcError> {
        let session = self.session().await?;
        let endpoint = format!("POST {CREATE_RECORD}");
        let body = types::CreateRecordRequest {
            repo,
            collection: LIST_ITEM_COLLECTION,
            record,
        };

        let resp = self
            .http
            .post(self.method_url(CREATE_RECORD))
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()
            .await
            .map_err(|e| XrpcError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        decode(endpoint, resp).await
    }

    fn method_url(&self, nsid: &str) -> String {
        format!(
            "{}/xrpc/{nsid}",
            self.service_url.as_str().trim_end_matches('/')
        )
    }
}

/// Decode a successful JSON response, or turn a failed one into
/// [`XrpcError::Api`], parsing the XRPC error envelope when present.
async fn decode<T: DeserializeOwned>(
    endpoint: String,
    resp: reqwest::Response,
) -> Result<T, XrpcError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<types::XrpcErrorBody>(&body) {
            Ok(envelope) if envelope.error.is_some() => {
                (envelope.error, envelope.message.unwrap_or_default())
            }
            _ => (None, body),
        };
        return Err(XrpcError::Api {
            endpoint,
            status,
            code,
            message,
        });
    }

    resp.json()
        .await
        .map_err(|e| XrpcError::Deserialization {
            endpoint,
            source: e,
        })
}

#[async_trait]
impl RemoteDirectory for XrpcClient {
    async fn resolve_self(&self) -> Result<Identity, DirectoryError> {
        let session = self.session().await?;
        Identity::parse(&session.did).map_err(|e| DirectoryError::Malformed {
            endpoint: format!("POST {CREATE_SESSION}"),
            reason: e.to_string(),
        })
    }

    async fn list_items(
        &self,
        owner: &Identity,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<ListItem>, DirectoryError> {
        let resp = self
            .list_records(owner.as_str(), cursor.as_ref().map(Cursor::as_str), limit)
            .await?;

        let mut items = Vec::with_capacity(resp.records.len());
        for record in resp.records {
            let value: types::ListItemRecord = match serde_json::from_value(record.value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(uri = %record.uri, "skipping undecodable list item: {e}");
                    continue;
                }
            };
            match Identity::parse(&value.subject) {
                Ok(subject) => items.push(ListItem {
                    subject,
                    list: ListReference::from_raw(value.list),
                }),
                Err(e) => tracing::warn!(uri = %record.uri, "skipping list item: {e}"),
            }
        }

        Ok(Page {
            items,
            cursor: Cursor::from_wire(resp.cursor),
        })
    }

    async fn search_accounts(
        &self,
        query: &SearchQuery,
        cursor: Option<Cursor>,
        limit: u32,
    ) -> Result<Page<Candidate>, DirectoryError> {
        let resp = self
            .search_actors(query.as_str(), cursor.as_ref().map(Cursor::as_str), limit)
            .await?;

        let mut items = Vec::with_capacity(resp.actors.len());
        for actor in resp.actors {
            match Identity::parse(&actor.did) {
                Ok(identity) => items.push(Candidate {
                    identity,
                    handle: Handle::new(actor.handle),
                }),
                Err(e) => tracing::warn!(handle = %actor.handle, "skipping search result: {e}"),
            }
        }

        Ok(Page {
            items,
            cursor: Cursor::from_wire(resp.cursor),
        })
    }

    async fn create_list_item(
        &self,
        owner: &Identity,
        list: &ListReference,
        subject: &Identity,
        created_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        let record = types::ListItemRecord {
            record_type: LIST_ITEM_COLLECTION.to_string(),
            subject: subject.as_str().to_string(),
            list: list.as_str().to_string(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let created = self.create_list_item_record(owner.as_str(), &record).await?;
        tracing::debug!(uri = %created.uri, subject = %subject, "list item created");
        Ok(())
    }

    fn directory_name(&self) -> &str {
        "XrpcClient"
    }
}
