use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    StoreOwner,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Role::User),
            "store_owner" => Ok(Role::StoreOwner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::StoreOwner => "store_owner",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Whoever issued a request, as far as rate limiting is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Key of the caller's bookkeeping document.
    pub key: String,
    pub role: Role,
}

impl Caller {
    pub fn new(key: impl Into<String>, role: Role) -> Self {
        Self {
            key: key.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: usize,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_hour(requests: usize) -> Self {
        Self {
            requests,
            window: Duration::hours(1),
        }
    }
}

/// Limits per role. Admins are never limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub user: RateLimit,
    pub store_owner: RateLimit,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            user: RateLimit::per_hour(1000),
            store_owner: RateLimit::per_hour(5000),
        }
    }
}

impl RateLimitPolicy {
    pub fn limit_for(&self, role: Role) -> Option<RateLimit> {
        match role {
            Role::User => Some(self.user),
            Role::StoreOwner => Some(self.store_owner),
            Role::Admin => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

/// The `rateLimits/{key}` document of a caller.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    #[serde(default)]
    pub requests: Vec<RequestLog>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit of {limit} requests exceeded")]
pub struct RateLimitExceeded {
    pub limit: usize,
}

impl RateLimitRecord {
    /// Forgets requests that fell out of the window and logs the new one, or
    /// fails if the caller already used up the limit.
    pub fn admit(
        mut self,
        limit: &RateLimit,
        path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, RateLimitExceeded> {
        let window_start = now - limit.window;
        self.requests.retain(|request| request.timestamp >= window_start);

        if self.requests.len() >= limit.requests {
            return Err(RateLimitExceeded {
                limit: limit.requests,
            });
        }

        self.requests.push(RequestLog {
            timestamp: now,
            path: path.into(),
        });
        self.last_updated = Some(now);
        Ok(self)
    }
}
