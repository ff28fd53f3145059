//! dexview - terminal catalog viewer for PokeAPI
//!
//! Browses the creature list in two modes (numbered pages and an infinite
//! "load more" feed) and opens a detail screen per item.
//!
//! ## Architecture
//!
//! - `api`: reqwest client for the two catalog reads
//! - `query` / `client`: keyed cache with staleness, retries and deduplication
//! - `pagination`: page-number window with ellipsis compression
//! - `infinite`: cursor bookkeeping for the feed, driven by a visibility signal
//! - `app` / `ui`: terminal view state and ratatui rendering
//!
//! ## Usage
//!
//! ```bash
//! cargo run --features native -- /pokemon/25
//! ```

// Core modules
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod infinite;
pub mod pagination;
pub mod query;
pub mod types;
pub mod util_text;

// View layer
pub mod app;
pub mod fetch;
pub mod router;
pub mod theme;
pub mod ui;

// Re-export commonly used types
pub use api::{CatalogApi, HttpCatalogClient};
pub use app::App;
pub use client::QueryClient;
pub use config::{Config, ListView};
pub use error::RemoteFetchError;
pub use types::{AppEvent, CatalogItemDetail, CatalogItemSummary, CatalogPage};
