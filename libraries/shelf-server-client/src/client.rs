//! Main media server client.

use crate::error::{Result, ServerClientError};
use crate::session::SessionClient;
use crate::types::{normalize_base_path, PingResponse, ServerConfig};
use async_trait::async_trait;
use reqwest::Client;
use shelf_core::{
    EpisodeId, LibraryItemId, PlaybackSession, PlaybackSessionApi, SessionId, ShelfError,
    StartSessionRequest, SyncPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Client for the playback session API of a media server.
///
/// # Example
///
/// ```ignore
/// use shelf_server_client::{ServerConfig, ShelfServerClient};
///
/// let config = ServerConfig::with_token("https://books.example.com", "token")
///     .router_base_path("/audiobookshelf");
/// let client = ShelfServerClient::new(config)?;
///
/// client.test_connection().await?;
/// ```
pub struct ShelfServerClient {
    http: Client,
    config: Arc<RwLock<ServerConfig>>,
}

impl ShelfServerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        // Validate URL
        if config.url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        // Parse and normalize URL
        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        Url::parse(&url).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;

        let normalized_config = ServerConfig {
            url,
            access_token: config.access_token.filter(|t| !t.is_empty()),
            router_base_path: normalize_base_path(&config.router_base_path),
        };

        // Create HTTP client with reasonable defaults
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("ShelfPlayer/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        Ok(Self {
            http,
            config: Arc::new(RwLock::new(normalized_config)),
        })
    }

    /// Get the server URL.
    pub async fn url(&self) -> String {
        self.config.read().await.url.clone()
    }

    /// Get the normalized router base path ("" when mounted at the root).
    pub async fn router_base_path(&self) -> String {
        self.config.read().await.router_base_path.clone()
    }

    /// Check if the client has an access token.
    pub async fn is_authenticated(&self) -> bool {
        self.config.read().await.access_token.is_some()
    }

    /// Replace (or clear) the API token.
    pub async fn set_token(&self, access_token: Option<String>) {
        let mut config = self.config.write().await;
        config.access_token = access_token.filter(|t| !t.is_empty());
    }

    /// Test the connection to the server.
    ///
    /// This does not require authentication.
    pub async fn test_connection(&self) -> Result<PingResponse> {
        let url = format!("{}/ping", self.api_base().await);

        debug!(url = %url, "Testing server connection");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        let status = response.status();

        if status.is_success() {
            let ping: PingResponse = response.json().await.map_err(|e| {
                ServerClientError::ParseError(format!("Failed to parse ping response: {}", e))
            })?;

            info!(success = ping.success, "Connected to server");

            Ok(ping)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(ServerClientError::ServerError {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }

    /// Get a handle for session operations.
    ///
    /// Returns an error if no API token is configured.
    pub async fn sessions(&self) -> Result<SessionClientHandle> {
        let config = self.config.read().await;
        let access_token = config
            .access_token
            .clone()
            .ok_or(ServerClientError::AuthRequired)?;
        let url = format!("{}{}", config.url, config.router_base_path);
        drop(config);

        Ok(SessionClientHandle {
            http: self.http.clone(),
            url,
            access_token,
        })
    }

    async fn api_base(&self) -> String {
        let config = self.config.read().await;
        format!("{}{}", config.url, config.router_base_path)
    }
}

/// Handle for session operations.
///
/// This is returned by `ShelfServerClient::sessions()`.
pub struct SessionClientHandle {
    http: Client,
    url: String,
    access_token: String,
}

impl SessionClientHandle {
    /// Get the session client.
    pub fn client(&self) -> SessionClient<'_> {
        SessionClient::new(&self.http, &self.url, &self.access_token)
    }
}

#[async_trait]
impl PlaybackSessionApi for ShelfServerClient {
    async fn start_session(
        &self,
        library_item_id: &LibraryItemId,
        episode_id: Option<&EpisodeId>,
        request: &StartSessionRequest,
    ) -> shelf_core::Result<PlaybackSession> {
        let handle = self.sessions().await?;
        let session = handle
            .client()
            .start(library_item_id, episode_id, request)
            .await?;
        Ok(session)
    }

    async fn sync_session(
        &self,
        session_id: &SessionId,
        payload: &SyncPayload,
    ) -> shelf_core::Result<()> {
        let handle = self.sessions().await?;
        handle
            .client()
            .sync(session_id, payload)
            .await
            .map_err(ShelfError::from)
    }

    async fn close_session(
        &self,
        session_id: &SessionId,
        payload: Option<&SyncPayload>,
    ) -> shelf_core::Result<()> {
        let handle = self.sessions().await?;
        handle
            .client()
            .close(session_id, payload)
            .await
            .map_err(ShelfError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        // Valid URLs
        assert!(ShelfServerClient::new(ServerConfig::new("https://example.com")).is_ok());
        assert!(ShelfServerClient::new(ServerConfig::new("http://localhost:13378")).is_ok());

        // Invalid URLs
        assert!(ShelfServerClient::new(ServerConfig::new("")).is_err());
        assert!(ShelfServerClient::new(ServerConfig::new("not-a-url")).is_err());
        assert!(ShelfServerClient::new(ServerConfig::new("ftp://example.com")).is_err());
        assert!(ShelfServerClient::new(ServerConfig::new("http://")).is_err());
    }

    #[tokio::test]
    async fn test_url_normalization() {
        let client = ShelfServerClient::new(
            ServerConfig::new("https://example.com/").router_base_path("audiobookshelf/"),
        )
        .expect("valid url");

        assert_eq!(client.url().await, "https://example.com");
        assert_eq!(client.router_base_path().await, "/audiobookshelf");
    }

    #[tokio::test]
    async fn test_empty_token_is_no_token() {
        let client =
            ShelfServerClient::new(ServerConfig::with_token("https://example.com", "")).unwrap();
        assert!(!client.is_authenticated().await);

        client.set_token(Some("abc".into())).await;
        assert!(client.is_authenticated().await);

        client.set_token(None).await;
        assert!(matches!(
            client.sessions().await,
            Err(ServerClientError::AuthRequired)
        ));
    }
}
