//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::models::StorageKind;

/// Global configuration instance.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Path to the catalog JSON document file.
    pub catalog_file: PathBuf,
    /// Which storage backend holds uploaded audio.
    pub storage_type: StorageKind,
    /// Folder holding locally stored songs.
    pub songs_folder: PathBuf,
    /// Public base URL used to build playback links for local songs.
    pub public_url: String,
    /// Media cloud account name (remote storage).
    pub cloud_name: Option<String>,
    /// Media cloud API key (remote storage).
    pub cloud_api_key: Option<String>,
    /// Media cloud API secret (remote storage).
    pub cloud_api_secret: Option<String>,
    /// Media cloud API endpoint.
    pub cloud_endpoint: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
    /// Allowed CORS origins (comma-separated, or * for all).
    pub cors_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging for production.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if a value is present but unparsable. Missing required
    /// values are reported by [`Config::validate`] instead, so startup
    /// can log before exiting.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16");

        let catalog_file =
            PathBuf::from(std::env::var("CATALOG_FILE").unwrap_or_default());

        let storage_type = match std::env::var("STORAGE_TYPE")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageKind::Local,
            "remote" => StorageKind::Remote,
            other => panic!("STORAGE_TYPE must be 'local' or 'remote', got '{}'", other),
        };

        let songs_folder = PathBuf::from(
            std::env::var("SONGS_FOLDER").unwrap_or_else(|_| "./songs".to_string()),
        );

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let cloud_name = std::env::var("CLOUD_NAME").ok();
        let cloud_api_key = std::env::var("CLOUD_API_KEY").ok();
        let cloud_api_secret = std::env::var("CLOUD_API_SECRET").ok();

        let cloud_endpoint = std::env::var("CLOUD_ENDPOINT")
            .unwrap_or_else(|_| "https://api.cloudinary.com".to_string());

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            catalog_file,
            storage_type,
            songs_folder,
            public_url,
            cloud_name,
            cloud_api_key,
            cloud_api_secret,
            cloud_endpoint,
            log_level,
            log_format,
            cors_origins,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if required values are missing. Startup treats
    /// these as fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_file.as_os_str().is_empty() {
            return Err(ConfigError::CatalogFileMissing);
        }

        // Ensure the catalog file's parent directory exists
        if let Some(parent) = self.catalog_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::DirectoryCreationFailed(parent.display().to_string(), e)
                })?;
            }
        }

        match self.storage_type {
            StorageKind::Local => {
                if !self.songs_folder.exists() {
                    std::fs::create_dir_all(&self.songs_folder).map_err(|e| {
                        ConfigError::DirectoryCreationFailed(
                            self.songs_folder.display().to_string(),
                            e,
                        )
                    })?;
                }
            }
            StorageKind::Remote => {
                if self.cloud_name.is_none()
                    || self.cloud_api_key.is_none()
                    || self.cloud_api_secret.is_none()
                {
                    return Err(ConfigError::CloudCredentialsMissing);
                }
            }
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CATALOG_FILE is not set; the catalog needs a place to live")]
    CatalogFileMissing,

    #[error("STORAGE_TYPE=remote requires CLOUD_NAME, CLOUD_API_KEY and CLOUD_API_SECRET")]
    CloudCredentialsMissing,

    #[error("Failed to create directory '{0}': {1}")]
    DirectoryCreationFailed(String, std::io::Error),
}

/// Initialize the global configuration.
///
/// Should be called once at application startup.
pub fn init() -> &'static Config {
    CONFIG.get_or_init(|| {
        dotenvy::dotenv().ok();
        Config::from_env()
    })
}

/// Get the global configuration.
///
/// # Panics
/// Panics if configuration has not been initialized.
pub fn get() -> &'static Config {
    CONFIG.get().expect("Configuration not initialized. Call config::init() first.")
}
