//! HTTP client for the catalog service.
//!
//! Two reads: `GET /pokemon?limit=&offset=` and `GET /pokemon/<id>`.
//! One best-effort call per invocation; retries belong to the query cache.

use async_trait::async_trait;
use std::sync::OnceLock;
use url::Url;

use crate::error::{RemoteFetchError, Result};
use crate::types::{parse_detail, parse_list, sprite_url, CatalogItemDetail, CatalogPage};

pub const DEFAULT_API_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Read operations of the remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_items(&self, limit: u32, offset: u32) -> Result<CatalogPage>;
    async fn get_item_by_id(&self, id: &str) -> Result<CatalogItemDetail>;
}

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .user_agent(concat!("dexview/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default()
    })
}

#[derive(Clone, Debug)]
pub struct HttpCatalogClient {
    base_url: String,
    sprite_base: String,
}

impl Default for HttpCatalogClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_SPRITE_URL)
    }
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, sprite_base: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            sprite_base: sprite_base.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Conventional image locator for `id`.
    pub fn sprite_url(&self, id: &str) -> String {
        sprite_url(&self.sprite_base, id)
    }

    fn list_url(&self, limit: u32, offset: u32) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/pokemon", self.base_url))
            .map_err(|e| RemoteFetchError::new(format!("invalid api url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    fn detail_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| RemoteFetchError::new(format!("invalid api url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RemoteFetchError::new("invalid api url: cannot be a base"))?
            .pop_if_empty()
            .extend(["pokemon", id]);
        Ok(url)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list_items(&self, limit: u32, offset: u32) -> Result<CatalogPage> {
        if limit == 0 {
            return Err(RemoteFetchError::new("list limit must be positive"));
        }
        let url = self.list_url(limit, offset)?;
        log::debug!("[api] GET {url}");

        let res = http_client().get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            log::warn!("[api] list limit={limit} offset={offset} -> {status}");
            return Err(RemoteFetchError::with_status(
                format!("failed to fetch item list ({status})"),
                status.as_u16(),
            ));
        }
        let body = res.text().await?;
        let page = parse_list(&body)?;
        log::info!(
            "[api] list offset={offset}: {} items of {}",
            page.items.len(),
            page.total_count
        );
        Ok(page)
    }

    async fn get_item_by_id(&self, id: &str) -> Result<CatalogItemDetail> {
        if id.is_empty() {
            return Err(RemoteFetchError::item_not_found(id));
        }
        let url = self.detail_url(id)?;
        log::debug!("[api] GET {url}");

        let res = http_client().get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            log::warn!("[api] detail {id} -> {status}");
            return Err(RemoteFetchError {
                status: Some(status.as_u16()),
                ..RemoteFetchError::item_not_found(id)
            });
        }
        let body = res.text().await?;
        parse_detail(&body, &self.sprite_base)
    }
}
