//! API configuration
//!
//! Values come from `API_`-prefixed environment variables (a `.env` file is
//! loaded first by the binary). Nested sections use a double underscore:
//!
//! ```text
//! API_PORT=8080
//! API_DATABASE__URL=postgres://claims:secret@db/warranty_claims
//! API_STORAGE__BUCKET=warranty-claims
//! API_CLAIMS__MIN_ATTACHMENTS=3
//! ```

use serde::Deserialize;

use domain_claims::config::ClaimPolicy;
use infra_db::DatabaseConfig;
use infra_storage::S3Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    pub database: DatabaseConfig,
    pub storage: S3Config,
    pub claims: ClaimPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database: DatabaseConfig::default(),
            storage: S3Config::default(),
            claims: ClaimPolicy::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment on top of the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body ceiling: the largest accepted attachment plus room for
    /// the multipart framing
    pub fn body_limit(&self) -> usize {
        self.claims.max_attachment_bytes.saturating_add(64 * 1024)
    }
}
