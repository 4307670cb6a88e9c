/// Configuration management for the CodeGenie core
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub store_db: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Fixed session lifetime from issuance, in seconds
    pub session_ttl_secs: u64,
    /// Simulated network latency applied before login/register complete, in ms
    pub login_delay_ms: u64,
    /// Admin account seeded when the user table is empty
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Bootstrap administrator credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub secret: String,
    pub display_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl CoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CoreResult<Self> {
        dotenv::dotenv().ok();

        let data_directory: PathBuf = env::var("CODEGENIE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let store_db = env::var("CODEGENIE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("codegenie.sqlite"));

        let session_ttl_secs = env::var("CODEGENIE_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "604800".to_string())
            .parse()
            .unwrap_or(604_800);
        let login_delay_ms = env::var("CODEGENIE_LOGIN_DELAY_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);

        let bootstrap_admin = if let Ok(email) = env::var("CODEGENIE_BOOTSTRAP_ADMIN_EMAIL") {
            Some(BootstrapAdmin {
                email,
                secret: env::var("CODEGENIE_BOOTSTRAP_ADMIN_SECRET").map_err(|_| {
                    CoreError::Validation("Bootstrap admin secret required".to_string())
                })?,
                display_name: env::var("CODEGENIE_BOOTSTRAP_ADMIN_NAME")
                    .unwrap_or_else(|_| "System Admin".to_string()),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(CoreConfig {
            storage: StorageConfig {
                data_directory,
                store_db,
            },
            auth: AuthConfig {
                session_ttl_secs,
                login_delay_ms,
                bootstrap_admin,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.auth.session_ttl_secs == 0 {
            return Err(CoreError::Validation(
                "Session TTL must be greater than zero".to_string(),
            ));
        }

        if let Some(admin) = &self.auth.bootstrap_admin {
            if admin.email.is_empty() || !admin.email.contains('@') {
                return Err(CoreError::Validation(
                    "Bootstrap admin email is not a valid address".to_string(),
                ));
            }
            if admin.secret.is_empty() {
                return Err(CoreError::Validation(
                    "Bootstrap admin secret cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
