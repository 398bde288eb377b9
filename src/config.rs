use crate::upload::{AllowList, UploadStrategy};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown upload strategy '{0}' (expected 'indirect' or 'direct')")]
    UnknownStrategy(String),

    #[error("DOCVAULT_BUCKET_URL must be set when the upload strategy is 'direct'")]
    MissingBucketUrl,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Deployment settings for the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub auth_base: String,
    pub strategy: UploadStrategy,
    pub allow_list: AllowList,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Reads settings from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_base = trim_base(&get("DOCVAULT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()));
        let auth_base = get("DOCVAULT_AUTH_URL")
            .map(|url| trim_base(&url))
            .unwrap_or_else(|| api_base.clone());

        let strategy = match get("DOCVAULT_UPLOAD_STRATEGY")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            None | Some("indirect") => UploadStrategy::Indirect {
                api_base: api_base.clone(),
            },
            Some("direct") => {
                let bucket_base = get("DOCVAULT_BUCKET_URL").ok_or(ConfigError::MissingBucketUrl)?;
                UploadStrategy::Direct {
                    bucket_base: trim_base(&bucket_base),
                }
            }
            Some(other) => return Err(ConfigError::UnknownStrategy(other.to_string())),
        };

        let allow_list = match get("DOCVAULT_ALLOWED_EXTENSIONS") {
            Some(list) => AllowList::parse(&list),
            None => AllowList::default(),
        };
        if allow_list.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "DOCVAULT_ALLOWED_EXTENSIONS",
                value: get("DOCVAULT_ALLOWED_EXTENSIONS").unwrap_or_default(),
            });
        }

        let http_timeout = match get("DOCVAULT_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidValue {
                        name: "DOCVAULT_HTTP_TIMEOUT_SECS",
                        value: raw.clone(),
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base,
            auth_base,
            strategy,
            allow_list,
            http_timeout,
        })
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.http_timeout).build()
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
