//! 共享测试工具：内存中的 zone 托管服务与身份服务

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dns_orchestrator_sync::{
    AuthToken, Authenticator, Credentials, DnsApi, Page, PageRequest, Result, SyncError,
    SyncProvider, WireRecordSet, WireZone,
};
use tokio::sync::RwLock;

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

pub const ZONE: &str = "example.org.";

pub fn credentials() -> Credentials {
    Credentials {
        username: "robot".to_string(),
        password: "hunter2".to_string(),
        account_id: "123456".to_string(),
        project_name: "dns".to_string(),
    }
}

// ===== FakeZoneHost =====

#[derive(Default)]
struct HostState {
    zones: Vec<WireZone>,
    sets: HashMap<String, Vec<WireRecordSet>>,
    valid_tokens: HashSet<String>,
    /// 对应绝对名称的 create 请求失败
    failing_names: HashSet<String>,
    next_id: u32,
    requests: usize,
}

impl HostState {
    fn authorize(&mut self, token: &AuthToken) -> Result<()> {
        self.requests += 1;
        if self.valid_tokens.contains(&token.value) {
            Ok(())
        } else {
            Err(SyncError::Unauthorized {
                raw_message: Some("token expired".to_string()),
            })
        }
    }

    fn sets_mut(&mut self, zone_id: &str) -> Result<&mut Vec<WireRecordSet>> {
        if !self.zones.iter().any(|z| z.id == zone_id) {
            return Err(SyncError::Api {
                status: Some(404),
                raw_message: format!("zone {zone_id} not found"),
            });
        }
        Ok(self.sets.entry(zone_id.to_string()).or_default())
    }
}

fn page<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let start = (request.offset as usize).min(items.len());
    let end = start.saturating_add(request.limit as usize).min(items.len());
    let count = u32::try_from(end - start).unwrap_or(u32::MAX);
    Page {
        items: items[start..end].to_vec(),
        count,
        next_offset: request.offset + count,
    }
}

/// Zone-hosting service that only accepts tokens issued by [`FakeIdentity`].
#[derive(Default)]
pub struct FakeZoneHost {
    state: RwLock<HostState>,
}

impl FakeZoneHost {
    pub async fn add_zone(&self, id: &str, name: &str) {
        self.state.write().await.zones.push(WireZone {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub async fn add_record_set(&self, zone_id: &str, set: WireRecordSet) {
        self.state
            .write()
            .await
            .sets
            .entry(zone_id.to_string())
            .or_default()
            .push(set);
    }

    pub async fn record_sets(&self, zone_id: &str) -> Vec<WireRecordSet> {
        self.state
            .read()
            .await
            .sets
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 使所有已签发的 token 失效
    pub async fn revoke_tokens(&self) {
        self.state.write().await.valid_tokens.clear();
    }

    pub async fn fail_creates_for(&self, absolute_name: &str) {
        self.state
            .write()
            .await
            .failing_names
            .insert(absolute_name.to_string());
    }

    pub async fn requests(&self) -> usize {
        self.state.read().await.requests
    }

    async fn accept_token(&self, value: &str) {
        self.state
            .write()
            .await
            .valid_tokens
            .insert(value.to_string());
    }
}

#[async_trait]
impl DnsApi for FakeZoneHost {
    async fn list_zones(
        &self,
        token: &AuthToken,
        filter: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<WireZone>> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        let zones: Vec<WireZone> = state
            .zones
            .iter()
            .filter(|z| filter.is_none_or(|f| z.name.contains(f)))
            .cloned()
            .collect();
        Ok(page(&zones, request))
    }

    async fn list_record_sets(
        &self,
        token: &AuthToken,
        zone_id: &str,
        request: PageRequest,
    ) -> Result<Page<WireRecordSet>> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        Ok(page(state.sets_mut(zone_id)?, request))
    }

    async fn create_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set: &WireRecordSet,
    ) -> Result<WireRecordSet> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        if state.failing_names.contains(&set.name) {
            return Err(SyncError::Api {
                status: Some(409),
                raw_message: format!("{} conflicts with an existing record", set.name),
            });
        }

        state.next_id += 1;
        let created = WireRecordSet {
            id: format!("rrset-{}", state.next_id),
            ..set.clone()
        };
        state.sets_mut(zone_id)?.push(created.clone());
        Ok(created)
    }

    async fn update_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set_id: &str,
        set: &WireRecordSet,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        let stored = state
            .sets_mut(zone_id)?
            .iter_mut()
            .find(|s| s.id == set_id)
            .ok_or_else(|| SyncError::Api {
                status: Some(404),
                raw_message: format!("record set {set_id} not found"),
            })?;
        *stored = WireRecordSet {
            id: set_id.to_string(),
            ..set.clone()
        };
        Ok(())
    }

    async fn delete_record_set(&self, token: &AuthToken, zone_id: &str, set_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.sets_mut(zone_id)?.retain(|s| s.id != set_id);
        Ok(())
    }
}

// ===== FakeIdentity =====

/// Identity service issuing 24h tokens that [`FakeZoneHost`] accepts.
pub struct FakeIdentity {
    host: Arc<FakeZoneHost>,
    issued: AtomicUsize,
    delay: Duration,
}

impl FakeIdentity {
    pub fn new(host: Arc<FakeZoneHost>) -> Self {
        Self {
            host,
            issued: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeIdentity {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken> {
        if credentials.password != "hunter2" {
            return Err(SyncError::InvalidCredentials {
                raw_message: Some("The request you have made requires authentication.".into()),
            });
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let value = format!("gAAAAA-{n}");
        self.host.accept_token(&value).await;

        let issued_at = Utc::now() + chrono::Duration::milliseconds(i64::try_from(n).unwrap_or(0));
        Ok(AuthToken {
            value,
            issued_at,
            expires_at: issued_at + chrono::Duration::hours(24),
        })
    }
}

// ===== TestContext =====

pub struct TestContext {
    pub host: Arc<FakeZoneHost>,
    pub identity: Arc<FakeIdentity>,
    pub provider: SyncProvider,
}

impl TestContext {
    /// One zone, small pages so listings span several requests.
    pub async fn new() -> Self {
        Self::with_identity(FakeIdentity::new).await
    }

    pub async fn with_identity(make: impl FnOnce(Arc<FakeZoneHost>) -> FakeIdentity) -> Self {
        let host = Arc::new(FakeZoneHost::default());
        host.add_zone("zone-1", ZONE).await;

        let identity = Arc::new(make(Arc::clone(&host)));
        let provider = SyncProvider::builder(
            Arc::clone(&host) as Arc<dyn DnsApi>,
            Arc::clone(&identity) as Arc<dyn Authenticator>,
            credentials(),
        )
        .page_size(2)
        .build();

        Self {
            host,
            identity,
            provider,
        }
    }
}
