use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RemoteFetchError;

/// One row of the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemSummary {
    pub name: String,
    /// Locator of the detail resource, e.g. `https://pokeapi.co/api/v2/pokemon/25/`.
    pub detail_reference: String,
}

impl CatalogItemSummary {
    /// Identifier used for detail lookups and routing.
    pub fn id(&self) -> Option<&str> {
        item_id_from_locator(&self.detail_reference)
    }
}

/// One page of the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    pub total_count: u64,
    pub next_cursor: Option<String>,
    pub previous_cursor: Option<String>,
    pub items: Vec<CatalogItemSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemDetail {
    pub identifier: u32,
    pub name: String,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
    pub categories: Vec<String>,
    pub image_locator: String,
}

/// Last non-empty path segment of a locator: `".../pokemon/25/"` -> `"25"`.
/// Query and fragment are ignored.
pub fn item_id_from_locator(locator: &str) -> Option<&str> {
    let path = match locator.find(['?', '#']) {
        Some(i) => &locator[..i],
        None => locator,
    };
    path.split('/').filter(|s| !s.is_empty()).next_back()
}

// ===============================
// Wire shapes
// ===============================

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<ListResult>,
}

#[derive(Debug, Deserialize)]
struct ListResult {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    types: Vec<TypeSlot>,
    sprites: Sprites,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Sprites {
    front_default: Option<String>,
}

impl From<ListResponse> for CatalogPage {
    fn from(r: ListResponse) -> Self {
        CatalogPage {
            total_count: r.count,
            next_cursor: r.next,
            previous_cursor: r.previous,
            items: r
                .results
                .into_iter()
                .map(|it| CatalogItemSummary {
                    name: it.name,
                    detail_reference: it.url,
                })
                .collect(),
        }
    }
}

impl DetailResponse {
    /// `sprite_base` supplies the conventional image when the payload has none.
    pub(crate) fn into_detail(self, sprite_base: &str) -> CatalogItemDetail {
        let image_locator = self
            .sprites
            .front_default
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| sprite_url(sprite_base, &self.id.to_string()));
        CatalogItemDetail {
            identifier: self.id,
            name: self.name,
            height: self.height,
            weight: self.weight,
            categories: self.types.into_iter().map(|t| t.kind.name).collect(),
            image_locator,
        }
    }
}

/// Conventional image locator: `<base>/<id>.png`.
pub fn sprite_url(base: &str, id: &str) -> String {
    format!("{}/{}.png", base.trim_end_matches('/'), id)
}

/// Decode a list body, rejecting unexpected shapes.
pub fn parse_list(body: &str) -> Result<CatalogPage, RemoteFetchError> {
    serde_json::from_str::<ListResponse>(body)
        .map(CatalogPage::from)
        .map_err(|e| RemoteFetchError::new(format!("malformed item list: {e}")))
}

/// Decode a detail body, rejecting unexpected shapes.
pub fn parse_detail(body: &str, sprite_base: &str) -> Result<CatalogItemDetail, RemoteFetchError> {
    serde_json::from_str::<DetailResponse>(body)
        .map(|d| d.into_detail(sprite_base))
        .map_err(|e| RemoteFetchError::new(format!("malformed item detail: {e}")))
}

/// Events delivered to the app loop by background fetch tasks.
#[derive(Debug, Clone)]
pub enum AppEvent {
    PageLoaded {
        page: u32,
        result: Result<Arc<CatalogPage>, RemoteFetchError>,
    },
    DetailLoaded {
        id: String,
        result: Result<Arc<CatalogItemDetail>, RemoteFetchError>,
    },
    Feed {
        epoch: u64,
        event: FeedEvent,
    },
    /// Connectivity came back after a transport failure.
    Reconnected,
}

/// Progress of the infinite-scroll feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Fetching { cursor: u32 },
    Appended {
        items: Vec<CatalogItemSummary>,
        total_loaded: usize,
        exhausted: bool,
    },
    Failed(RemoteFetchError),
}
