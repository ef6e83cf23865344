use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest TTL the hosting service accepts for a record set.
pub const MIN_TTL: Duration = Duration::from_secs(60);

// ============ Pagination ============

/// Offset/limit window requested from a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Index of the first item to return.
    pub offset: u32,
    /// Maximum number of items to return.
    pub limit: u32,
}

/// One page of a list endpoint, as returned by the service.
///
/// `next_offset` comes from the service itself: it may skip or compact the
/// collection, so it is not necessarily `offset + count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items in this page, in server order.
    pub items: Vec<T>,
    /// Number of items the server reports for this page.
    pub count: u32,
    /// Offset to request for the following page.
    pub next_offset: u32,
}

// ============ Zone ============

/// A DNS zone as seen by callers. Only the name is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Zone {
    /// Zone name, e.g. `example.org.`.
    pub name: String,
}

/// A zone as returned by the service's zone listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireZone {
    /// Provider-internal zone ID.
    pub id: String,
    /// Zone name.
    pub name: String,
}

// ============ Record sets (wire) ============

/// A single value of a record set on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireRecord {
    /// Record value (address, target, text...).
    pub content: String,
    /// Whether the value is administratively disabled.
    #[serde(default)]
    pub disabled: bool,
}

/// A record set as listed, created or updated through the service API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecordSet {
    /// Provider-internal ID; empty before creation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Absolute owner name.
    pub name: String,
    /// Record type, e.g. `A`, `TXT`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// TTL in seconds.
    pub ttl: u32,
    /// Every value of the set, enabled and disabled.
    pub records: Vec<WireRecord>,
}

// ============ Record sets (canonical) ============

/// Identity of a record set within a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordSetKey {
    /// Owner name, relative to the zone apex (`@` for the apex).
    pub name: String,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: String,
}

impl RecordSetKey {
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
        }
    }
}

impl std::fmt::Display for RecordSetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.record_type, self.name)
    }
}

/// Canonical unit of reconciliation.
///
/// Values live in exactly one of two sets: `enabled` values are served,
/// `disabled` values exist remotely but are suppressed. The sets are always
/// disjoint; use [`RecordSet::enable`] to move a value across.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordSet {
    /// `(name, type)` identity.
    pub key: RecordSetKey,
    /// Provider-internal ID; empty if the set has not been created yet.
    pub id: String,
    /// Effective TTL, never below [`MIN_TTL`].
    pub ttl: Duration,
    /// Live values.
    pub enabled: BTreeSet<String>,
    /// Suppressed values still tracked remotely.
    pub disabled: BTreeSet<String>,
}

/// Record sets of one zone, keyed by identity.
pub type RecordSets = BTreeMap<RecordSetKey, RecordSet>;

// ============ Flat records ============

/// One flat DNS record, the representation callers work with.
///
/// Reconciliation groups these by `(name, record_type)`. In deletion requests
/// an empty `record_type` or an empty `data` acts as a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Owner name relative to the zone.
    pub name: String,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time to live. Zero means unspecified.
    #[serde(with = "crate::utils::serde_time::duration_secs")]
    pub ttl: Duration,
    /// Record value.
    pub data: String,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: Duration,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl,
            data: data.into(),
        }
    }

    /// Identity of the record set this record belongs to.
    pub fn key(&self) -> RecordSetKey {
        RecordSetKey::new(self.name.clone(), self.record_type.clone())
    }
}

// ============ Auth ============

/// Credentials for the password-scoped token exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Service user name.
    pub username: String,
    /// Service user password.
    pub password: String,
    /// Account (domain) the user belongs to.
    pub account_id: String,
    /// Project the token is scoped to.
    pub project_name: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("account_id", &self.account_id)
            .field("project_name", &self.project_name)
            .finish()
    }
}

/// A bearer token with its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Opaque token value sent with every API call.
    pub value: String,
    /// When the token was issued; also used as the token's generation stamp.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being usable.
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Whether the token must be refreshed before use at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"***")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
