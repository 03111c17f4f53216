//! Typed view of the `custom_fields` JSON bag on an issue.
//!
//! The bag is open-ended: the host application stores its own keys there. The
//! sync engine owns `externalId` and `externalSync` and must round-trip every
//! other key untouched, so unknown keys are captured in [`SyncedIssueCustomFields::extra`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::provider_type::ProviderType;

/// JSON key holding the external identifier.
pub const EXTERNAL_ID_KEY: &str = "externalId";
/// JSON key holding the sync bookkeeping object.
pub const EXTERNAL_SYNC_KEY: &str = "externalSync";

/// Custom fields of an issue that was imported from (or linked to) a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedIssueCustomFields {
    /// `{provider}:{repositoryUrl}:{issueId}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_sync: Option<ExternalSync>,

    /// Keys owned by someone else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sync bookkeeping written by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSync {
    pub provider_type: ProviderType,
    pub repository_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    /// First time the issue was imported or linked. Never rewritten.
    pub synced_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_advisory: Option<bool>,
}

impl SyncedIssueCustomFields {
    /// Parse from the stored JSON. `null` yields an empty bag.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    /// Parse the stored JSON, falling back to an empty engine section when
    /// `externalId`/`externalSync` are unreadable. Foreign keys are kept
    /// either way.
    #[must_use]
    pub fn recover(value: &Value) -> Self {
        Self::from_json(value).unwrap_or_else(|_| {
            let mut extra = value.as_object().cloned().unwrap_or_default();
            extra.remove(EXTERNAL_ID_KEY);
            extra.remove(EXTERNAL_SYNC_KEY);
            Self {
                extra,
                ..Self::default()
            }
        })
    }

    /// Serialize back into a JSON object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Read `externalId` from a raw bag without requiring the rest to be well formed.
#[must_use]
pub fn external_id_of(value: &Value) -> Option<&str> {
    value.get(EXTERNAL_ID_KEY).and_then(Value::as_str)
}

/// Read `externalSync.repositoryUrl` from a raw bag.
#[must_use]
pub fn synced_repository_url_of(value: &Value) -> Option<&str> {
    value
        .get(EXTERNAL_SYNC_KEY)
        .and_then(|sync| sync.get("repositoryUrl"))
        .and_then(Value::as_str)
}
