//! Reconciliation API over one zone-hosting account.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{DEFAULT_SAFETY_MARGIN, TokenManager};
use crate::client::AuthenticatedApi;
use crate::context::CallContext;
use crate::error::{OperationFailure, OperationKind, Result, SyncError};
use crate::pagination::{PAGE_SIZE, collect_all};
use crate::reconcile::{Change, plan_append, plan_delete, plan_replace};
use crate::retry::RetryPolicy;
use crate::rrset::record_sets_from_records;
use crate::traits::{Authenticator, DnsApi};
use crate::types::{Credentials, Record, RecordSet, RecordSets, Zone};
use crate::zone_index::ZoneIndex;

/// Result of a mutating reconciliation call.
///
/// `records` always lists what was applied remotely, even when some calls
/// failed. `error` is `None` on full success, [`SyncError::PartialFailure`]
/// when some create/update/delete calls failed, or the error that stopped the
/// call before anything was dispatched (zone lookup, listing).
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Records successfully applied.
    pub records: Vec<Record>,
    /// Aggregate error, if anything failed.
    pub error: Option<SyncError>,
}

impl SyncOutcome {
    fn failed(error: SyncError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Full success as `Ok`, anything else as `Err`.
    ///
    /// A partial failure keeps the applied records inside
    /// [`SyncError::PartialFailure::applied`](SyncError::PartialFailure).
    pub fn into_result(self) -> Result<Vec<Record>> {
        match self.error {
            None => Ok(self.records),
            Some(error) => Err(error),
        }
    }
}

/// DNS record synchronization provider.
///
/// Cheap to share: wrap it in an `Arc` and call it from many tasks. The zone
/// ID cache and the token are shared; record sets are fetched fresh for every
/// call.
///
/// # Construction
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dns_orchestrator_sync::{Credentials, DnsApi, KeystoneAuthenticator, RetryPolicy, SyncProvider};
///
/// # fn demo(api: Arc<dyn DnsApi>) {
/// let credentials = Credentials {
///     username: "robot".to_string(),
///     password: "secret".to_string(),
///     account_id: "123456".to_string(),
///     project_name: "dns".to_string(),
/// };
///
/// let provider = SyncProvider::builder(api, Arc::new(KeystoneAuthenticator::default()), credentials)
///     .page_size(1_000)
///     .retry_policy(RetryPolicy::no_retry())
///     .build();
/// # }
/// ```
pub struct SyncProvider {
    api: Arc<AuthenticatedApi>,
    zones: ZoneIndex,
}

/// Builder for [`SyncProvider`].
pub struct SyncProviderBuilder {
    api: Arc<dyn DnsApi>,
    authenticator: Arc<dyn Authenticator>,
    credentials: Credentials,
    page_size: u32,
    retry: RetryPolicy,
    token_safety_margin: Duration,
}

impl SyncProviderBuilder {
    fn new(
        api: Arc<dyn DnsApi>,
        authenticator: Arc<dyn Authenticator>,
        credentials: Credentials,
    ) -> Self {
        Self {
            api,
            authenticator,
            credentials,
            page_size: PAGE_SIZE,
            retry: RetryPolicy::default(),
            token_safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }

    /// Items requested per page from list endpoints (default: 10000).
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Retry policy for every API call (default: 3 tries within 5 seconds).
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// How long before its declared expiry a token is refreshed (default: 1 hour).
    #[must_use]
    pub fn token_safety_margin(mut self, margin: Duration) -> Self {
        self.token_safety_margin = margin;
        self
    }

    /// Build the [`SyncProvider`] instance.
    pub fn build(self) -> SyncProvider {
        let tokens = TokenManager::new(self.authenticator, self.credentials)
            .with_retry_policy(self.retry)
            .with_safety_margin(self.token_safety_margin);
        let api = Arc::new(AuthenticatedApi::new(self.api, tokens, self.page_size));

        SyncProvider {
            zones: ZoneIndex::new(Arc::clone(&api)),
            api,
        }
    }
}

impl SyncProvider {
    /// Creates a provider with default settings.
    pub fn new(
        api: Arc<dyn DnsApi>,
        authenticator: Arc<dyn Authenticator>,
        credentials: Credentials,
    ) -> Self {
        Self::builder(api, authenticator, credentials).build()
    }

    /// Returns a builder for customizing the provider configuration.
    pub fn builder(
        api: Arc<dyn DnsApi>,
        authenticator: Arc<dyn Authenticator>,
        credentials: Credentials,
    ) -> SyncProviderBuilder {
        SyncProviderBuilder::new(api, authenticator, credentials)
    }

    /// 列出账号下所有 zone
    pub async fn list_zones(&self, ctx: &CallContext) -> Result<Vec<Zone>> {
        let names = self.zones.list_all(ctx).await?;
        Ok(names.into_iter().map(|name| Zone { name }).collect())
    }

    /// 获取 zone 中所有启用的记录
    pub async fn get_records(&self, ctx: &CallContext, zone: &str) -> Result<Vec<Record>> {
        let (_, sets) = self.current(ctx, zone).await?;
        Ok(sets.values().flat_map(RecordSet::to_records).collect())
    }

    /// 替换：使 zone 中启用的记录与 `records` 一致
    pub async fn set_records(&self, ctx: &CallContext, zone: &str, records: &[Record]) -> SyncOutcome {
        let desired = record_sets_from_records(records);
        self.reconcile(ctx, zone, "set records", |previous| {
            plan_replace(previous, &desired)
        })
        .await
    }

    /// 追加：添加或重新启用 `records`，不删除任何记录
    pub async fn append_records(
        &self,
        ctx: &CallContext,
        zone: &str,
        records: &[Record],
    ) -> SyncOutcome {
        let desired = record_sets_from_records(records);
        self.reconcile(ctx, zone, "append records", |previous| {
            plan_append(previous, &desired)
        })
        .await
    }

    /// 删除：移除 `records` 中列出的启用值
    ///
    /// An empty `record_type` matches every type under the same name; an
    /// empty `data` removes every enabled value of the matched sets.
    pub async fn delete_records(
        &self,
        ctx: &CallContext,
        zone: &str,
        records: &[Record],
    ) -> SyncOutcome {
        self.reconcile(ctx, zone, "delete records", |previous| {
            plan_delete(previous, records)
        })
        .await
    }

    /// Resolve `zone` and fetch its record sets.
    async fn current(&self, ctx: &CallContext, zone: &str) -> Result<(String, RecordSets)> {
        let zone_id = self.zones.resolve(ctx, zone).await?;
        let raw = collect_all(self.api.record_sets(ctx, &zone_id)).await?;

        let sets: RecordSets = raw
            .iter()
            .map(|set| RecordSet::from_wire(set, zone))
            .map(|set| (set.key.clone(), set))
            .collect();
        log::debug!("Fetched {} record set(s) of zone {zone}", sets.len());

        Ok((zone_id, sets))
    }

    async fn reconcile<P>(&self, ctx: &CallContext, zone: &str, what: &str, plan: P) -> SyncOutcome
    where
        P: FnOnce(&RecordSets) -> Vec<Change>,
    {
        let (zone_id, previous) = match self.current(ctx, zone).await {
            Ok(current) => current,
            Err(e) => {
                if e.is_expected() {
                    log::warn!("[{what}] {zone}: {e}");
                } else {
                    log::error!("[{what}] {zone}: {e}");
                }
                return SyncOutcome::failed(e);
            }
        };

        let changes = plan(&previous);
        log::debug!("[{what}] {zone}: {} change(s) planned", changes.len());

        self.apply(ctx, zone, &zone_id, what, &changes).await
    }

    /// Dispatch every change concurrently and aggregate the results.
    async fn apply(
        &self,
        ctx: &CallContext,
        zone: &str,
        zone_id: &str,
        what: &str,
        changes: &[Change],
    ) -> SyncOutcome {
        let futures: Vec<_> = changes
            .iter()
            .map(|change| self.apply_one(ctx, zone, zone_id, change))
            .collect();
        let results = futures::future::join_all(futures).await;

        let mut records = Vec::new();
        let mut failures = Vec::new();
        let (mut created, mut updated, mut deleted) = (0, 0, 0);

        for (change, result) in changes.iter().zip(results) {
            match result {
                Ok(applied) => {
                    match change.kind {
                        OperationKind::Create => created += 1,
                        OperationKind::Update => updated += 1,
                        OperationKind::Delete => deleted += 1,
                    }
                    records.extend(applied);
                }
                Err(reason) => {
                    let failure = OperationFailure {
                        operation: change.kind,
                        key: change.set.key.clone(),
                        reason,
                    };
                    if failure.reason.is_expected() {
                        log::warn!("[{what}] {zone}: {failure}");
                    } else {
                        log::error!("[{what}] {zone}: {failure}");
                    }
                    failures.push(failure);
                }
            }
        }

        log::info!(
            "[{what}] {zone}: {created} created, {updated} updated, {deleted} deleted, {} failed",
            failures.len()
        );

        let error = (!failures.is_empty()).then(|| SyncError::PartialFailure {
            failures,
            applied: records.clone(),
        });
        SyncOutcome { records, error }
    }

    async fn apply_one(
        &self,
        ctx: &CallContext,
        zone: &str,
        zone_id: &str,
        change: &Change,
    ) -> Result<Vec<Record>> {
        match change.kind {
            OperationKind::Create => {
                let created = self
                    .api
                    .create_record_set(ctx, zone_id, &change.set.to_wire(zone))
                    .await?;
                Ok(RecordSet::from_wire(&created, zone).to_records())
            }
            OperationKind::Update => {
                self.api
                    .update_record_set(ctx, zone_id, &change.set.id, &change.set.to_wire(zone))
                    .await?;
                Ok(change.applied.clone())
            }
            OperationKind::Delete => {
                self.api
                    .delete_record_set(ctx, zone_id, &change.set.id)
                    .await?;
                Ok(change.applied.clone())
            }
        }
    }
}
