//! 测试辅助模块
//!
//! 提供内存中的 DNS API 与凭证交换 mock。

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{OperationKind, Result, SyncError};
use crate::traits::{Authenticator, DnsApi};
use crate::types::{AuthToken, Credentials, Page, PageRequest, WireRecordSet, WireZone};

pub fn test_credentials() -> Credentials {
    Credentials {
        username: "robot".to_string(),
        password: "hunter2".to_string(),
        account_id: "123456".to_string(),
        project_name: "dns".to_string(),
    }
}

// ===== MockDnsApi =====

/// One call received by [`MockDnsApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListZones {
        filter: Option<String>,
        offset: u32,
    },
    ListRecordSets {
        zone_id: String,
        offset: u32,
    },
    Create {
        zone_id: String,
        set: WireRecordSet,
    },
    Update {
        zone_id: String,
        set_id: String,
        set: WireRecordSet,
    },
    Delete {
        zone_id: String,
        set_id: String,
    },
}

#[derive(Default)]
struct MockState {
    zones: Vec<WireZone>,
    sets: HashMap<String, Vec<WireRecordSet>>,
    calls: Vec<ApiCall>,
    tokens_seen: Vec<String>,
    rejected_tokens: HashSet<String>,
    /// 依次弹出，作为下一次调用的错误
    queued_errors: VecDeque<SyncError>,
    /// (操作, 绝对名称) -> 错误
    failures: Vec<(OperationKind, String, SyncError)>,
    next_id: u32,
}

impl MockState {
    fn check_token(&mut self, token: &AuthToken) -> Result<()> {
        self.tokens_seen.push(token.value.clone());
        if let Some(error) = self.queued_errors.pop_front() {
            return Err(error);
        }
        if self.rejected_tokens.contains(&token.value) {
            return Err(SyncError::Unauthorized {
                raw_message: Some("The request you have made requires authentication.".into()),
            });
        }
        Ok(())
    }

    fn injected_failure(&self, operation: OperationKind, name: &str) -> Result<()> {
        match self
            .failures
            .iter()
            .find(|(op, n, _)| *op == operation && n == name)
        {
            Some((_, _, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn zone_sets(&mut self, zone_id: &str) -> Result<&mut Vec<WireRecordSet>> {
        if !self.zones.iter().any(|z| z.id == zone_id) {
            return Err(SyncError::Api {
                status: Some(404),
                raw_message: format!("zone {zone_id} not found"),
            });
        }
        Ok(self.sets.entry(zone_id.to_string()).or_default())
    }
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let start = (page.offset as usize).min(items.len());
    let end = start.saturating_add(page.limit as usize).min(items.len());
    let items = items[start..end].to_vec();
    let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
    Page {
        items,
        count,
        next_offset: page.offset + count,
    }
}

/// In-memory zone-hosting service.
pub struct MockDnsApi {
    state: Mutex<MockState>,
}

impl MockDnsApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    #[must_use]
    pub fn with_zone(mut self, id: &str, name: &str) -> Self {
        self.state.get_mut().zones.push(WireZone {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_record_set(mut self, zone_id: &str, set: WireRecordSet) -> Self {
        self.state
            .get_mut()
            .sets
            .entry(zone_id.to_string())
            .or_default()
            .push(set);
        self
    }

    /// 之后使用该 token 的调用返回 `Unauthorized`
    pub async fn reject_token(&self, value: &str) {
        self.state.lock().await.rejected_tokens.insert(value.to_string());
    }

    /// 下一次调用返回 `error`
    pub async fn fail_next(&self, error: SyncError) {
        self.state.lock().await.queued_errors.push_back(error);
    }

    /// 针对某个 record set（绝对名称）的 create/update/delete 返回 `error`
    pub async fn fail_on(&self, operation: OperationKind, name: &str, error: SyncError) {
        self.state
            .lock()
            .await
            .failures
            .push((operation, name.to_string(), error));
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that changed state, in order.
    pub async fn mutations(&self) -> Vec<ApiCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    ApiCall::Create { .. } | ApiCall::Update { .. } | ApiCall::Delete { .. }
                )
            })
            .collect()
    }

    pub async fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().await.tokens_seen.clone()
    }

    pub async fn record_sets(&self, zone_id: &str) -> Vec<WireRecordSet> {
        self.state
            .lock()
            .await
            .sets
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DnsApi for MockDnsApi {
    async fn list_zones(
        &self,
        token: &AuthToken,
        filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<WireZone>> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall::ListZones {
            filter: filter.map(str::to_string),
            offset: page.offset,
        });
        state.check_token(token)?;

        let zones: Vec<WireZone> = state
            .zones
            .iter()
            .filter(|z| filter.is_none_or(|f| z.name.contains(f)))
            .cloned()
            .collect();
        Ok(page_of(&zones, page))
    }

    async fn list_record_sets(
        &self,
        token: &AuthToken,
        zone_id: &str,
        page: PageRequest,
    ) -> Result<Page<WireRecordSet>> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall::ListRecordSets {
            zone_id: zone_id.to_string(),
            offset: page.offset,
        });
        state.check_token(token)?;

        let sets = state.zone_sets(zone_id)?;
        Ok(page_of(sets, page))
    }

    async fn create_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set: &WireRecordSet,
    ) -> Result<WireRecordSet> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall::Create {
            zone_id: zone_id.to_string(),
            set: set.clone(),
        });
        state.check_token(token)?;
        state.injected_failure(OperationKind::Create, &set.name)?;

        state.next_id += 1;
        let created = WireRecordSet {
            id: format!("rs-{}", state.next_id),
            ..set.clone()
        };
        state.zone_sets(zone_id)?.push(created.clone());
        Ok(created)
    }

    async fn update_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set_id: &str,
        set: &WireRecordSet,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall::Update {
            zone_id: zone_id.to_string(),
            set_id: set_id.to_string(),
            set: set.clone(),
        });
        state.check_token(token)?;
        state.injected_failure(OperationKind::Update, &set.name)?;

        let stored = state
            .zone_sets(zone_id)?
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

    async fn delete_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set_id: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ApiCall::Delete {
            zone_id: zone_id.to_string(),
            set_id: set_id.to_string(),
        });
        state.check_token(token)?;

        let name = state
            .zone_sets(zone_id)?
            .iter()
            .find(|s| s.id == set_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        state.injected_failure(OperationKind::Delete, &name)?;

        state.zone_sets(zone_id)?.retain(|s| s.id != set_id);
        Ok(())
    }
}

// ===== MockAuthenticator =====

/// Issues tokens named `token-1`, `token-2`... with distinct issue stamps.
pub struct MockAuthenticator {
    calls: AtomicUsize,
    delay: Duration,
    lifetime: chrono::Duration,
    /// 如果 Some，authenticate 时返回此错误
    error: Mutex<Option<SyncError>>,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            lifetime: chrono::Duration::hours(24),
            error: Mutex::new(None),
        }
    }

    /// Make every exchange take `delay`, so concurrent callers overlap.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Server-declared token lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub async fn set_error(&self, error: Option<SyncError>) {
        *self.error.lock().await = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.error.lock().await.clone() {
            return Err(error);
        }

        let issued_at = Utc::now() + chrono::Duration::milliseconds(i64::try_from(n).unwrap_or(0));
        Ok(AuthToken {
            value: format!("token-{n}"),
            issued_at,
            expires_at: issued_at + self.lifetime,
        })
    }
}
