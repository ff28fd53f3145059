//! Error type for remote catalog reads.

use thiserror::Error;

/// Failure of a catalog read: transport error, non-success status or an
/// undecodable body. The message is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteFetchError {
    pub message: String,
    /// HTTP status when the server answered.
    pub status: Option<u16>,
}

impl RemoteFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn item_not_found(id: &str) -> Self {
        Self::new(format!("item {id} not found"))
    }
}

impl From<reqwest::Error> for RemoteFetchError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        Self {
            message: format!("request failed: {e}"),
            status,
        }
    }
}

pub type Result<T> = std::result::Result<T, RemoteFetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let e = RemoteFetchError::item_not_found("25");
        assert_eq!(e.to_string(), "item 25 not found");
        assert_eq!(e.status, None);
    }

    #[test]
    fn status_is_kept() {
        let e = RemoteFetchError::with_status("boom", 503);
        assert_eq!(e.status, Some(503));
        assert_eq!(e.to_string(), "boom");
    }
}
