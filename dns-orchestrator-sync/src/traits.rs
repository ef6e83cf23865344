use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AuthToken, Credentials, Page, PageRequest, WireRecordSet, WireZone};

/// 远程 DNS 托管服务 API
///
/// Every call receives the bearer token explicitly; token lifecycle is handled
/// by the caller. Implementations map a rejected or expired token to
/// [`SyncError::Unauthorized`](crate::SyncError::Unauthorized) so the transport
/// can re-authenticate, and transient failures to the retryable variants.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// 获取 zone 列表 (分页)，`filter` 按名称过滤
    async fn list_zones(
        &self,
        token: &AuthToken,
        filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<WireZone>>;

    /// 获取 zone 下的 record set 列表 (分页)
    async fn list_record_sets(
        &self,
        token: &AuthToken,
        zone_id: &str,
        page: PageRequest,
    ) -> Result<Page<WireRecordSet>>;

    /// 创建 record set，返回服务端保存的结果（含 ID）
    async fn create_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set: &WireRecordSet,
    ) -> Result<WireRecordSet>;

    /// 整体替换 record set
    async fn update_record_set(
        &self,
        token: &AuthToken,
        zone_id: &str,
        set_id: &str,
        set: &WireRecordSet,
    ) -> Result<()>;

    /// 删除 record set
    async fn delete_record_set(&self, token: &AuthToken, zone_id: &str, set_id: &str)
    -> Result<()>;
}

/// 凭证交换：用账号密码换取 bearer token
///
/// Rejected credentials must surface as
/// [`SyncError::InvalidCredentials`](crate::SyncError::InvalidCredentials);
/// they are never retried.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken>;
}
