//! Client routes of the viewer
//!
//! ## Supported Routes
//!
//! - `/` - item list
//! - `/pokemon/<id>` - item detail
//!
//! ## Robust Parsing
//!
//! - Scheme form: `dexview://pokemon/25` (case-insensitive, any slash count)
//! - Hash form: `#/pokemon/25`
//! - Path form: `/pokemon/25` or `pokemon/25`
//! - Query and fragment stripping: `/pokemon/25?from=list#top`
//!
//! ## Example
//!
//! ```rust,ignore
//! use dexview::router::{parse, Route};
//!
//! assert_eq!(parse("/pokemon/25"), Some(Route::Detail { id: "25".into() }));
//! ```

/// Strip query and fragment from URL path
#[inline]
fn strip_query_frag(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

/// Extract path after dexview:// scheme (case-insensitive, handles variants)
#[inline]
fn after_scheme(raw: &str) -> Option<&str> {
    let s = raw.trim();
    let rest = if let Some(pos) = s.find("://") {
        if !s[..pos].eq_ignore_ascii_case("dexview") {
            return None;
        }
        &s[pos + 3..]
    } else {
        let (scheme, rest) = s.split_once(':')?;
        if !scheme.eq_ignore_ascii_case("dexview") {
            return None;
        }
        rest
    };
    Some(rest.trim_start_matches('/'))
}

/// Identifiers are routed verbatim, so only URL-safe ones are accepted.
fn is_url_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/`
    List,
    /// `/pokemon/<id>`
    Detail { id: String },
}

impl Route {
    pub fn detail(id: impl Into<String>) -> Self {
        Route::Detail { id: id.into() }
    }

    /// Canonical path form.
    pub fn path(&self) -> String {
        match self {
            Route::List => "/".to_string(),
            Route::Detail { id } => format!("/pokemon/{id}"),
        }
    }
}

/// Parse a route from any accepted form. Returns `None` for unknown routes
/// and for identifiers that are not URL-safe.
pub fn parse(raw: &str) -> Option<Route> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(Route::List);
    }

    let path = if let Some(rest) = after_scheme(s) {
        rest
    } else if let Some(rest) = s.strip_prefix("#/") {
        rest
    } else if s == "#" {
        ""
    } else {
        s.trim_start_matches('/')
    };

    let path = strip_query_frag(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    match segments.next().map(|s| s.to_ascii_lowercase()).as_deref() {
        None => Some(Route::List),
        Some("pokemon") => {
            let id = segments.next()?;
            if segments.next().is_some() || !is_url_safe_id(id) {
                return None;
            }
            Some(Route::detail(id))
        }
        _ => None,
    }
}
