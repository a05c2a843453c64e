//! Types for server configuration and unauthenticated endpoints.

use serde::{Deserialize, Serialize};

/// Configuration for connecting to a media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server origin (e.g., "https://books.example.com")
    pub url: String,
    /// API token sent as a bearer token
    pub access_token: Option<String>,
    /// Path prefix the server is mounted under (e.g., "/audiobookshelf"), empty for the root
    pub router_base_path: String,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: None,
            router_base_path: String::new(),
        }
    }

    /// Create a config with an existing API token.
    pub fn with_token(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: Some(access_token.into()),
            router_base_path: String::new(),
        }
    }

    /// Set the router base path.
    #[must_use]
    pub fn router_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.router_base_path = base_path.into();
        self
    }
}

/// Response from `GET /ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub success: bool,
}

/// Normalize a router base path to either "" or "/segment[/segment...]".
pub(crate) fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
