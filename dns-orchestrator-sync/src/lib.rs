//! # dns-orchestrator-sync
//!
//! Reconciles a desired list of DNS records against the record sets held by a
//! zone-hosting service whose API is paginated, rate limited and protected by
//! short-lived bearer tokens.
//!
//! ## Building blocks
//!
//! | Module | What it does |
//! |--------|--------------|
//! | [`pagination`] | Offset/limit listings as lazy [`Stream`](futures::Stream)s |
//! | [`zone_index`] | Zone name to zone ID cache |
//! | [`rrset`] | Record-set model, wire conversions, TTL merge |
//! | [`reconcile`] | Create/update/delete planning for replace, append and delete |
//! | [`auth`] | Token lifecycle with single-flight refresh |
//! | [`client`] | Authenticated, retried transport over a [`DnsApi`] |
//! | [`provider`] | The public reconciliation API, [`SyncProvider`] |
//!
//! The remote API itself is abstracted behind the [`DnsApi`] trait; the token
//! exchange behind [`Authenticator`], with [`KeystoneAuthenticator`] as the
//! HTTP implementation.
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dns_orchestrator_sync::{
//!     CallContext, Credentials, DnsApi, KeystoneAuthenticator, Record, SyncProvider,
//! };
//!
//! # async fn demo(api: Arc<dyn DnsApi>) -> dns_orchestrator_sync::Result<()> {
//! let credentials = Credentials {
//!     username: "robot".to_string(),
//!     password: "secret".to_string(),
//!     account_id: "123456".to_string(),
//!     project_name: "dns".to_string(),
//! };
//! let provider = SyncProvider::new(api, Arc::new(KeystoneAuthenticator::default()), credentials);
//! let ctx = CallContext::new().with_timeout(Duration::from_secs(60));
//!
//! // Replace every enabled "www" A record of the zone
//! let outcome = provider
//!     .set_records(
//!         &ctx,
//!         "example.org.",
//!         &[Record::new("www", "A", Duration::from_secs(300), "192.0.2.1")],
//!     )
//!     .await;
//!
//! for record in &outcome.records {
//!     println!("applied {} {} -> {}", record.name, record.record_type, record.data);
//! }
//! let applied = outcome.into_result()?;
//! # let _ = applied;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`SyncError`]; mutating calls return a
//! [`SyncOutcome`] that pairs the applied records with the aggregate error.
//!
//! | Variant | Meaning | Retried |
//! |---------|---------|---------|
//! | `NetworkError`, `Timeout`, `RateLimited`, `ServerError` | Transient failure | Yes |
//! | `Unauthorized` | Token rejected even after a refresh | No |
//! | `InvalidCredentials` | Credential exchange refused | No |
//! | `ZoneNotFound` | Zone name not visible to the account | No |
//! | `Cancelled`, `DeadlineExceeded` | Caller gave up | No |
//! | `PartialFailure` | Some record set calls failed | No |

pub mod auth;
pub mod client;
pub mod context;
pub mod error;
pub mod keystone;
pub mod pagination;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod rrset;
pub mod traits;
pub mod types;
pub mod utils;
pub mod zone_index;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use auth::TokenManager;
pub use client::AuthenticatedApi;
pub use context::CallContext;
pub use error::{OperationFailure, OperationKind, Result, SyncError};
pub use keystone::KeystoneAuthenticator;
pub use pagination::{PAGE_SIZE, collect_all, paginate};
pub use provider::{SyncOutcome, SyncProvider, SyncProviderBuilder};
pub use reconcile::Change;
pub use retry::RetryPolicy;
pub use rrset::{merge_ttl, record_sets_from_records};
pub use traits::{Authenticator, DnsApi};
pub use types::{
    AuthToken, Credentials, MIN_TTL, Page, PageRequest, Record, RecordSet, RecordSetKey,
    RecordSets, WireRecord, WireRecordSet, WireZone, Zone,
};
pub use zone_index::ZoneIndex;
