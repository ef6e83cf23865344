//! Authenticated transport over a [`DnsApi`].
//!
//! Every call goes through [`TokenManager::execute`], so it picks up a valid
//! token, survives a mid-request token rejection and is retried on transient
//! failures. List endpoints are exposed as lazy streams.

use std::sync::Arc;

use futures::Stream;

use crate::auth::TokenManager;
use crate::context::CallContext;
use crate::error::Result;
use crate::pagination::paginate;
use crate::traits::DnsApi;
use crate::types::{Page, PageRequest, WireRecordSet, WireZone};

pub struct AuthenticatedApi {
    api: Arc<dyn DnsApi>,
    tokens: TokenManager,
    page_size: u32,
}

impl AuthenticatedApi {
    pub fn new(api: Arc<dyn DnsApi>, tokens: TokenManager, page_size: u32) -> Self {
        Self {
            api,
            tokens,
            page_size,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn zones_page(
        &self,
        ctx: &CallContext,
        filter: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<WireZone>> {
        self.tokens
            .execute(ctx, "list zones", |token| async move {
                self.api.list_zones(&token, filter, page).await
            })
            .await
    }

    async fn record_sets_page(
        &self,
        ctx: &CallContext,
        zone_id: &str,
        page: PageRequest,
    ) -> Result<Page<WireRecordSet>> {
        self.tokens
            .execute(ctx, "list record sets", |token| async move {
                self.api.list_record_sets(&token, zone_id, page).await
            })
            .await
    }

    /// 所有 zone，`filter` 交给服务端按名称过滤
    pub fn zones<'a>(
        &'a self,
        ctx: &'a CallContext,
        filter: Option<&'a str>,
    ) -> impl Stream<Item = Result<WireZone>> + 'a {
        paginate(self.page_size, move |page| self.zones_page(ctx, filter, page))
    }

    /// zone 下的所有 record set
    pub fn record_sets<'a>(
        &'a self,
        ctx: &'a CallContext,
        zone_id: &'a str,
    ) -> impl Stream<Item = Result<WireRecordSet>> + 'a {
        paginate(self.page_size, move |page| {
            self.record_sets_page(ctx, zone_id, page)
        })
    }

    pub async fn create_record_set(
        &self,
        ctx: &CallContext,
        zone_id: &str,
        set: &WireRecordSet,
    ) -> Result<WireRecordSet> {
        self.tokens
            .execute(ctx, "create record set", |token| async move {
                self.api.create_record_set(&token, zone_id, set).await
            })
            .await
    }

    pub async fn update_record_set(
        &self,
        ctx: &CallContext,
        zone_id: &str,
        set_id: &str,
        set: &WireRecordSet,
    ) -> Result<()> {
        self.tokens
            .execute(ctx, "update record set", |token| async move {
                self.api.update_record_set(&token, zone_id, set_id, set).await
            })
            .await
    }

    pub async fn delete_record_set(
        &self,
        ctx: &CallContext,
        zone_id: &str,
        set_id: &str,
    ) -> Result<()> {
        self.tokens
            .execute(ctx, "delete record set", |token| async move {
                self.api.delete_record_set(&token, zone_id, set_id).await
            })
            .await
    }
}
