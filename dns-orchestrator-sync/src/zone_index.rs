//! zone 名称 -> zone ID 缓存
//!
//! Populated lazily from the zone listing. A lookup miss lists the zones
//! matching the requested name and keeps every pair the listing returned.
//! Entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::AuthenticatedApi;
use crate::context::CallContext;
use crate::error::{Result, SyncError};
use crate::pagination::collect_all;

pub struct ZoneIndex {
    api: Arc<AuthenticatedApi>,
    ids: RwLock<HashMap<String, String>>,
}

impl ZoneIndex {
    pub fn new(api: Arc<AuthenticatedApi>) -> Self {
        Self {
            api,
            ids: RwLock::new(HashMap::new()),
        }
    }

    /// 解析 zone 名称为 ID
    pub async fn resolve(&self, ctx: &CallContext, name: &str) -> Result<String> {
        if let Some(id) = self.ids.read().await.get(name) {
            return Ok(id.clone());
        }

        let filter = (!name.is_empty()).then_some(name);
        let found = self.load(ctx, filter).await?;

        found.get(name).cloned().ok_or_else(|| {
            log::warn!("Zone '{name}' not found among {} listed zone(s)", found.len());
            SyncError::ZoneNotFound {
                zone: name.to_string(),
            }
        })
    }

    /// 列出所有 zone 名称（按名称排序），同时填充缓存
    pub async fn list_all(&self, ctx: &CallContext) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.load(ctx, None).await?.into_keys().collect();
        names.sort();
        Ok(names)
    }

    async fn load(&self, ctx: &CallContext, filter: Option<&str>) -> Result<HashMap<String, String>> {
        let zones = collect_all(self.api.zones(ctx, filter)).await?;
        let found: HashMap<String, String> =
            zones.into_iter().map(|zone| (zone.name, zone.id)).collect();

        log::debug!(
            "Listed {} zone(s) (filter: {})",
            found.len(),
            filter.unwrap_or("<none>")
        );
        self.ids
            .write()
            .await
            .extend(found.iter().map(|(name, id)| (name.clone(), id.clone())));

        Ok(found)
    }
}
