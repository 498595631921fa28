use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use chrono::Duration;
use directory::identity::StaticIdentityProvider;
use model::rate_limit::{RateLimit, RateLimitPolicy};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid value '{value}' for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_address: SocketAddr,
    pub static_dir: PathBuf,
    /// Origins allowed to make cross origin requests. Empty disables the
    /// origin check.
    pub allowed_origins: Vec<String>,
    pub api_tokens: StaticIdentityProvider,
    pub rate_limits: RateLimitPolicy,
    /// Whether anonymous callers are told apart by `x-forwarded-for` rather
    /// than by the peer address.
    pub trust_proxy: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: PathBuf::from("./resources/www/"),
            allowed_origins: vec![],
            api_tokens: StaticIdentityProvider::default(),
            rate_limits: RateLimitPolicy::default(),
            trust_proxy: false,
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_address = parsed_var("WEB_BIND_ADDRESS")?.unwrap_or(defaults.bind_address);
        let static_dir = env::var("WEB_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let api_tokens = match env::var("API_TOKENS") {
            Ok(table) => StaticIdentityProvider::parse(&table).map_err(|reason| ConfigError {
                name: "API_TOKENS",
                value: "<redacted>".to_owned(),
                reason,
            })?,
            Err(_) => defaults.api_tokens,
        };

        let trust_proxy = parsed_var("TRUST_PROXY")?.unwrap_or(defaults.trust_proxy);

        let window = parsed_var::<i64>("RATE_LIMIT_WINDOW_SECS")?
            .map(Duration::seconds)
            .unwrap_or(defaults.rate_limits.user.window);
        let user = parsed_var("RATE_LIMIT_USER_REQUESTS")?
            .unwrap_or(defaults.rate_limits.user.requests);
        let store_owner = parsed_var("RATE_LIMIT_STORE_OWNER_REQUESTS")?
            .unwrap_or(defaults.rate_limits.store_owner.requests);

        Ok(Self {
            bind_address,
            static_dir,
            allowed_origins,
            api_tokens,
            rate_limits: RateLimitPolicy {
                user: RateLimit {
                    requests: user,
                    window,
                },
                store_owner: RateLimit {
                    requests: store_owner,
                    window,
                },
            },
            trust_proxy,
        })
    }
}

fn parsed_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match env::var(name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|why: T::Err| ConfigError {
            name,
            reason: why.to_string(),
            value,
        }),
        Err(_) => Ok(None),
    }
}
