//! Shelf Server Client
//!
//! HTTP client for the playback session endpoints of a self-hosted
//! audiobook/podcast server.
//!
//! # Features
//!
//! - **Sessions**: open, sync and close playback sessions
//! - **Connection test**: unauthenticated `/ping`
//! - **Bearer auth**: every session call carries the configured API token
//!
//! [`ShelfServerClient`] implements [`shelf_core::PlaybackSessionApi`], which is
//! how the playback engine talks to it.
//!
//! # Example
//!
//! ```ignore
//! use shelf_server_client::{ServerConfig, ShelfServerClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::with_token("https://books.example.com", "api-token");
//!     let client = ShelfServerClient::new(config)?;
//!
//!     client.test_connection().await?;
//!
//!     let sessions = client.sessions().await?;
//!     sessions.client().sync(&"play_1".into(), &payload).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod session;
mod types;

pub use client::{SessionClientHandle, ShelfServerClient};
pub use error::{Result, ServerClientError};
pub use session::SessionClient;
pub use types::{PingResponse, ServerConfig};
