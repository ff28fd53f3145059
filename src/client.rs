//! The three catalog queries on top of the query cache.

use std::sync::Arc;

use crate::api::CatalogApi;
use crate::error::Result;
use crate::query::{QueryCache, QueryKey, QueryOptions, QueryState};
use crate::types::{CatalogItemDetail, CatalogPage};

/// Catalog client plus one cache per result type. Built once by the app and
/// handed to whatever needs catalog data; `clear` tears the caches down.
#[derive(Clone)]
pub struct QueryClient {
    api: Arc<dyn CatalogApi>,
    limit: u32,
    pages: QueryCache<CatalogPage>,
    details: QueryCache<CatalogItemDetail>,
}

impl QueryClient {
    pub fn new(api: Arc<dyn CatalogApi>, limit: u32, options: QueryOptions) -> Self {
        Self {
            api,
            limit: limit.max(1),
            pages: QueryCache::new("pages", options),
            details: QueryCache::new("details", options),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn api(&self) -> &Arc<dyn CatalogApi> {
        &self.api
    }

    fn list_fetcher(
        &self,
        offset: u32,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<CatalogPage>> + Send + Sync + 'static
    {
        let api = Arc::clone(&self.api);
        let limit = self.limit;
        move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.list_items(limit, offset).await })
        }
    }

    fn detail_fetcher(
        &self,
        id: &str,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<CatalogItemDetail>>
           + Send
           + Sync
           + 'static {
        let api = Arc::clone(&self.api);
        let id = id.to_string();
        move || {
            let api = Arc::clone(&api);
            let id = id.clone();
            Box::pin(async move { api.get_item_by_id(&id).await })
        }
    }

    fn page_offset(&self, page: u32) -> u32 {
        page.max(1).saturating_sub(1).saturating_mul(self.limit)
    }

    /// Page `page` (1-based) of the paginated view.
    pub async fn paginated(&self, page: u32) -> Result<Arc<CatalogPage>> {
        let offset = self.page_offset(page);
        self.pages
            .fetch(QueryKey::paginated_list(page), self.list_fetcher(offset))
            .await
    }

    pub async fn refetch_paginated(&self, page: u32) -> Result<Arc<CatalogPage>> {
        let offset = self.page_offset(page);
        self.pages
            .refetch(QueryKey::paginated_list(page), self.list_fetcher(offset))
            .await
    }

    pub fn paginated_state(&self, page: u32) -> QueryState<CatalogPage> {
        self.pages.state(&QueryKey::paginated_list(page))
    }

    /// Page of the infinite feed starting at `offset`.
    pub async fn infinite_page(&self, offset: u32) -> Result<Arc<CatalogPage>> {
        self.pages
            .fetch(QueryKey::infinite_page(offset), self.list_fetcher(offset))
            .await
    }

    pub async fn refetch_infinite_page(&self, offset: u32) -> Result<Arc<CatalogPage>> {
        self.pages
            .refetch(QueryKey::infinite_page(offset), self.list_fetcher(offset))
            .await
    }

    pub async fn detail(&self, id: &str) -> Result<Arc<CatalogItemDetail>> {
        self.details
            .fetch(QueryKey::detail(id), self.detail_fetcher(id))
            .await
    }

    pub async fn refetch_detail(&self, id: &str) -> Result<Arc<CatalogItemDetail>> {
        self.details
            .refetch(QueryKey::detail(id), self.detail_fetcher(id))
            .await
    }

    pub fn detail_state(&self, id: &str) -> QueryState<CatalogItemDetail> {
        self.details.state(&QueryKey::detail(id))
    }

    /// Network came back: everything is stale, views refetch on their next read.
    pub fn on_reconnect(&self) {
        log::info!("[client] reconnected, invalidating cached queries");
        self.pages.invalidate_all();
        self.details.invalidate_all();
    }

    pub fn clear(&self) {
        self.pages.clear();
        self.details.clear();
    }
}
