/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use shelf_server_client::ServerConfig;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "shelf.toml";

/// File inside the data directory holding device id and player settings
pub const STORE_FILE_NAME: &str = "client.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_player")]
    pub player: PlayerOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub url: String,

    /// API token sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Set when the server is mounted below `/`
    #[serde(default)]
    pub router_base_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerOptions {
    /// Name reported to the server in the device info
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Seconds between progress lines while listening
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `shelf.toml` is read when
    /// present. `SHELF_`-prefixed variables override both, with `__`
    /// between nesting levels (`SHELF_SERVER__URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// [`Self::load`] reading variables from `env` instead of the process
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SHELF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if url.is_empty() {
            return Err(CliError::Config(
                "Server URL is required (set SHELF_SERVER__URL)".to_string(),
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "Server URL must start with http:// or https://: {}",
                url
            )));
        }

        if self.player.client_name.trim().is_empty() {
            return Err(CliError::Config("Client name must not be empty".to_string()));
        }

        if self.player.report_interval_secs == 0 {
            return Err(CliError::Config(
                "Report interval must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    /// Connection settings for the server client
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            url: self.server.url.trim().to_string(),
            access_token: self.server.token.clone(),
            router_base_path: self.server.router_base_path.clone(),
        }
    }

    /// Path of the local key/value store
    pub fn store_path(&self) -> PathBuf {
        self.storage.data_dir.join(STORE_FILE_NAME)
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        url: String::new(),
        token: None,
        router_base_path: String::new(),
    }
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("shelf-player")
}

fn default_player() -> PlayerOptions {
    PlayerOptions {
        client_name: default_client_name(),
        report_interval_secs: default_report_interval_secs(),
    }
}

fn default_client_name() -> String {
    "Shelf CLI".to_string()
}

fn default_report_interval_secs() -> u64 {
    5
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            player: default_player(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        )
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_need_a_server_url() {
        let config = CliConfig::default();
        assert!(config.server.url.is_empty());
        assert_eq!(config.player.client_name, "Shelf CLI");
        assert!(config.store_path().ends_with("shelf-player/client.json"));
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn loads_file_with_defaults_for_missing_sections() {
        let file = write_config(
            r#"
            [server]
            url = "https://books.example.com"
            token = "secret"
            "#,
        );

        let config = CliConfig::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.server.url, "https://books.example.com");
        assert_eq!(config.server.token.as_deref(), Some("secret"));
        assert_eq!(config.player.report_interval_secs, 5);
        config.validate().unwrap();
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(
            r#"
            [server]
            url = "https://old.example.com"

            [player]
            report_interval_secs = 30
            "#,
        );

        let config = CliConfig::load_with_env(
            Some(file.path()),
            env(&[
                ("SHELF_SERVER__URL", "http://localhost:13378"),
                ("SHELF_SERVER__ROUTER_BASE_PATH", "/audiobookshelf"),
                ("SHELF_PLAYER__REPORT_INTERVAL_SECS", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.url, "http://localhost:13378");
        assert_eq!(config.server.router_base_path, "/audiobookshelf");
        assert_eq!(config.player.report_interval_secs, 2);

        let server = config.server_config();
        assert_eq!(server.router_base_path, "/audiobookshelf");
        assert!(server.access_token.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let result = CliConfig::load_with_env(Some(&missing), env(&[]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = CliConfig::default();
        config.server.url = "books.example.com".to_string();
        assert!(config.validate().is_err());

        config.server.url = "https://books.example.com".to_string();
        config.validate().unwrap();

        config.player.report_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
