//! Wire types for the XRPC methods the client calls.
//!
//! Response types tolerate fields they do not model; the lexicons grow new
//! optional fields without notice.

use serde::{Deserialize, Serialize};

/// XRPC error envelope, returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `com.atproto.repo.listRecords` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub records: Vec<RepoRecord>,
}

/// One record from a repository listing. `value` is decoded per collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRecord {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
    pub value: serde_json::Value,
}

/// `app.bsky.graph.listitem` record body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemRecord {
    #[serde(rename = "$type", default = "list_item_type")]
    pub record_type: String,
    /// DID of the account placed on the list.
    pub subject: String,
    /// AT-URI of the list.
    pub list: String,
    pub created_at: String,
}

fn list_item_type() -> String {
    skymod_core::identity::LIST_ITEM_COLLECTION.to_string()
}

/// `app.bsky.actor.searchActors` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchActorsResponse {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub actors: Vec<ProfileView>,
}

/// `app.bsky.actor.defs#profileView`, reduced to what reporting needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// `com.atproto.repo.createRecord` request body.
#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub record: &'a ListItemRecord,
}

/// `com.atproto.repo.createRecord` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordResponse {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_item_record_serializes_with_type_tag() {
        let record = ListItemRecord {
            record_type: list_item_type(),
            subject: "did:plc:subject".into(),
            list: "at://did:plc:owner/app.bsky.graph.list/3k".into(),
            created_at: "2026-01-15T12:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["$type"], "app.bsky.graph.listitem");
        assert_eq!(json["createdAt"], "2026-01-15T12:00:00Z");
        assert_eq!(json["subject"], "did:plc:subject");
    }

    #[test]
    fn list_records_response_defaults_missing_cursor() {
        let resp: ListRecordsResponse =
            serde_json::from_value(serde_json::json!({ "records": [] })).unwrap();
        assert!(resp.cursor.is_none());
        assert!(resp.records.is_empty());
    }

    #[test]
    fn profile_view_ignores_unmodelled_fields() {
        let view: ProfileView = serde_json::from_value(serde_json::json!({
            "did": "did:plc:abc",
            "handle": "abc.bsky.social",
            "displayName": "ABC",
            "avatar": "https://cdn.example/abc.jpg",
            "labels": []
        }))
        .unwrap();
        assert_eq!(view.display_name.as_deref(), Some("ABC"));
    }
}
