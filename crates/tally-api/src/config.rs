//! Server configuration read from environment variables.

use tally_ingestion::application::ingestion::SignaturePolicy;

use crate::error::AppError;

/// Environments treated as production-like.
const PRODUCTION_LIKE: [&str; 3] = ["production", "prod", "staging"];

/// Core hub subscription settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubConfig {
    /// Hub base URL (`CORE_HUB_URL`).
    pub hub_url: Option<String>,
    /// URL the hub delivers to (`CORE_HUB_CALLBACK_URL`).
    pub callback_url: Option<String>,
    /// Subscribed channels (`CORE_HUB_CHANNELS`, comma-separated).
    pub channels: Vec<String>,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Bind host (`HOST`).
    pub host: String,
    /// Bind port (`PORT`).
    pub port: u16,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`).
    pub max_connections: u32,
    /// Deployment environment (`APP_ENV`).
    pub environment: String,
    /// Core hub signature policy (`WEBHOOK_SECRET`,
    /// `WEBHOOK_SIGNATURE_REQUIRED`).
    pub signature_policy: SignaturePolicy,
    /// Core hub subscription settings.
    pub hub: HubConfig,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let max_connections: u32 = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?;
        let environment = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        let enforce = match lookup("WEBHOOK_SIGNATURE_REQUIRED") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                AppError::Config(format!(
                    "WEBHOOK_SIGNATURE_REQUIRED must be true or false, got {value:?}"
                ))
            })?,
            None => PRODUCTION_LIKE.contains(&environment.to_ascii_lowercase().as_str()),
        };
        let signature_policy = SignaturePolicy::new(lookup("WEBHOOK_SECRET"), enforce);

        let hub = HubConfig {
            hub_url: lookup("CORE_HUB_URL").filter(|s| !s.is_empty()),
            callback_url: lookup("CORE_HUB_CALLBACK_URL").filter(|s| !s.is_empty()),
            channels: lookup("CORE_HUB_CHANNELS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            environment,
            signature_policy,
            hub,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
