use std::time::Duration;

use rrr_core::images::MAX_IMAGE_BYTES;
use rrr_db::models::actor::Credentials;
use rrr_db::repositories::RestConfig;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set when {because} is set")]
    Missing {
        var: &'static str,
        because: &'static str,
    },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Client configuration loaded from environment variables.
///
/// Without `RRR_SERVICE_URL` the app runs against a seeded in-process
/// service, which is enough to try every command locally.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Hosted service connection; `None` selects the in-process service.
    pub service: Option<RestConfig>,
    /// Account to sign in with at start-up.
    pub credentials: Option<Credentials>,
    pub request_timeout: Duration,
    /// Largest image file accepted for an image field.
    pub max_image_bytes: u64,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default          |
    /// |----------------------------|------------------|
    /// | `RRR_SERVICE_URL`          | in-process demo  |
    /// | `RRR_API_KEY`              | required with `RRR_SERVICE_URL` |
    /// | `RRR_EMAIL`                | anonymous        |
    /// | `RRR_PASSWORD`             | required with `RRR_EMAIL` |
    /// | `RRR_REQUEST_TIMEOUT_SECS` | `30`             |
    /// | `RRR_MAX_IMAGE_BYTES`      | `5242880`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let request_timeout_secs =
            parse_or("RRR_REQUEST_TIMEOUT_SECS", get("RRR_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RRR_REQUEST_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let request_timeout = Duration::from_secs(request_timeout_secs);
        let max_image_bytes = parse_or("RRR_MAX_IMAGE_BYTES", get("RRR_MAX_IMAGE_BYTES"), MAX_IMAGE_BYTES)?;

        let service = match get("RRR_SERVICE_URL") {
            Some(base_url) => {
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        var: "RRR_SERVICE_URL",
                        value: base_url,
                        reason: "expected an http:// or https:// URL".into(),
                    });
                }
                let api_key = get("RRR_API_KEY").ok_or(ConfigError::Missing {
                    var: "RRR_API_KEY",
                    because: "RRR_SERVICE_URL",
                })?;
                Some(RestConfig {
                    base_url,
                    api_key,
                    request_timeout,
                })
            }
            None => None,
        };

        let credentials = match get("RRR_EMAIL") {
            Some(email) => Some(Credentials {
                email,
                password: get("RRR_PASSWORD").ok_or(ConfigError::Missing {
                    var: "RRR_PASSWORD",
                    because: "RRR_EMAIL",
                })?,
            }),
            None => None,
        };

        Ok(Self {
            service,
            credentials,
            request_timeout,
            max_image_bytes,
        })
    }

    pub fn is_hosted(&self) -> bool {
        self.service.is_some()
    }
}

// ---- private helpers ----

fn parse_or(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
