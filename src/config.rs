use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;
use std::time::Duration;

use crate::api::{DEFAULT_API_URL, DEFAULT_SPRITE_URL};
use crate::query::QueryOptions;
use crate::theme::Theme;

/// Browsing mode of the list screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListView {
    Pagination,
    LoadMore,
}

impl std::str::FromStr for ListView {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pagination" | "pages" => Ok(ListView::Pagination),
            "load-more" | "loadmore" | "infinite" | "scroll" => Ok(ListView::LoadMore),
            _ => Err(anyhow!("Invalid view '{s}'. Valid options: pagination, load-more")),
        }
    }
}

impl std::fmt::Display for ListView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListView::Pagination => write!(f, "pagination"),
            ListView::LoadMore => write!(f, "load-more"),
        }
    }
}

/// dexview - terminal catalog viewer for PokeAPI
///
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "dexview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal catalog viewer for PokeAPI", long_about = None)]
pub struct CliArgs {
    /// Route to open on start: `/` or `/pokemon/<id>`
    pub route: Option<String>,

    /// Catalog API base URL
    #[arg(long, env = "DEX_API_URL")]
    pub api_url: Option<String>,

    /// Base URL of the sprite images (`<base>/<id>.png`)
    #[arg(long, env = "DEX_SPRITE_URL")]
    pub sprite_url: Option<String>,

    /// Items per page (1-100)
    #[arg(long, env = "DEX_PAGE_LIMIT")]
    pub page_limit: Option<u32>,

    /// How long fetched results stay fresh, in milliseconds (0-3600000)
    #[arg(long, env = "DEX_STALE_MS")]
    pub stale_ms: Option<u64>,

    /// Extra attempts for failed fetches (0-10)
    #[arg(long, env = "DEX_RETRIES")]
    pub retries: Option<u32>,

    /// Initial list view: pagination or load-more
    #[arg(long, env = "DEX_VIEW", value_parser = clap::value_parser!(ListView))]
    pub view: Option<ListView>,

    /// Color theme: nord, amber-crt, green-phosphor
    #[arg(long, env = "DEX_THEME")]
    pub theme: Option<String>,

    /// Target UI rendering FPS (1-120)
    #[arg(long, env = "DEX_RENDER_FPS")]
    pub render_fps: Option<u32>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, env = "DEX_LOG_FILE")]
    pub log_file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub sprite_url: String,
    pub page_limit: u32,
    pub stale_ms: u64,
    pub retries: u32,
    pub view: ListView,
    pub theme: Theme,
    pub render_fps: u32,
    pub log_file: String,
    pub route: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            sprite_url: DEFAULT_SPRITE_URL.to_string(),
            page_limit: 20,
            stale_ms: 5 * 60 * 1000,
            retries: 2,
            view: ListView::Pagination,
            theme: Theme::default(),
            render_fps: 30,
            log_file: "./dexview.log".to_string(),
            route: None,
        }
    }
}

impl Config {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            stale_time: Duration::from_millis(self.stale_ms),
            retry: self.retries,
            ..QueryOptions::default()
        }
    }

    /// Print current configuration (useful for debugging)
    pub fn log_summary(&self) {
        log::info!("dexview configuration:");
        log::info!("  API URL: {}", self.api_url);
        log::info!("  Sprite URL: {}", self.sprite_url);
        log::info!("  Page limit: {}", self.page_limit);
        log::info!("  Stale time: {}ms", self.stale_ms);
        log::info!("  Retries: {}", self.retries);
        log::info!("  View: {}", self.view);
        log::info!("  Theme: {}", self.theme);
        log::info!("  Render FPS: {}", self.render_fps);
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load configuration from CLI args and environment variables
/// Priority: CLI args > Environment variables > Defaults
pub fn load() -> Result<Config> {
    from_args(CliArgs::parse())
}

/// Resolve parsed args into a validated config.
pub fn from_args(args: CliArgs) -> Result<Config> {
    let defaults = Config::default();

    let api_url = args
        .api_url
        .or_else(|| env::var("DEX_API_URL").ok())
        .unwrap_or(defaults.api_url);
    validate_url(&api_url, "DEX_API_URL")?;

    let sprite_url = args
        .sprite_url
        .or_else(|| env::var("DEX_SPRITE_URL").ok())
        .unwrap_or(defaults.sprite_url);
    validate_url(&sprite_url, "DEX_SPRITE_URL")?;

    let page_limit = args
        .page_limit
        .or_else(|| env_parsed("DEX_PAGE_LIMIT"))
        .unwrap_or(defaults.page_limit);
    let page_limit = validate_in_range(page_limit, 1, 100, "DEX_PAGE_LIMIT")?;

    let stale_ms = args
        .stale_ms
        .or_else(|| env_parsed("DEX_STALE_MS"))
        .unwrap_or(defaults.stale_ms);
    let stale_ms = validate_in_range(stale_ms, 0, 3_600_000, "DEX_STALE_MS")?;

    let retries = args
        .retries
        .or_else(|| env_parsed("DEX_RETRIES"))
        .unwrap_or(defaults.retries);
    let retries = validate_in_range(retries, 0, 10, "DEX_RETRIES")?;

    let view = args
        .view
        .or_else(|| env_parsed("DEX_VIEW"))
        .unwrap_or(defaults.view);

    let theme = match args.theme.or_else(|| env::var("DEX_THEME").ok()) {
        Some(name) => Theme::from_str(&name).map_err(|e| anyhow!(e))?,
        None => defaults.theme,
    };

    let render_fps = args
        .render_fps
        .or_else(|| env_parsed("DEX_RENDER_FPS"))
        .unwrap_or(defaults.render_fps);
    let render_fps = validate_in_range(render_fps, 1, 120, "DEX_RENDER_FPS")?;

    let log_file = args
        .log_file
        .or_else(|| env::var("DEX_LOG_FILE").ok())
        .unwrap_or(defaults.log_file);

    Ok(Config {
        api_url,
        sprite_url,
        page_limit,
        stale_ms,
        retries,
        view,
        theme,
        render_fps,
        log_file,
        route: args.route,
    })
}
