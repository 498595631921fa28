use std::collections::HashMap;

use async_trait::async_trait;
use model::rate_limit::{Caller, Role};

/// Verifies bearer tokens. Real verification happens at an external identity
/// provider; implementations only translate its answer into a [`Caller`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` if the token is not valid.
    async fn verify(&self, token: &str) -> Option<Caller>;
}

/// A fixed table of tokens, for development setups and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Caller>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(
        mut self,
        token: impl Into<String>,
        uid: impl Into<String>,
        role: Role,
    ) -> Self {
        self.tokens.insert(token.into(), Caller::new(uid, role));
        self
    }

    /// Parses `token=uid:role` entries separated by `;`.
    pub fn parse(table: &str) -> Result<Self, String> {
        table
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::new(), |provider, entry| {
                let (token, identity) = entry
                    .split_once('=')
                    .ok_or_else(|| format!("expected token=uid:role, got '{}'", entry))?;
                let (uid, role) = identity
                    .split_once(':')
                    .ok_or_else(|| format!("expected uid:role, got '{}'", identity))?;
                Ok(provider.with_token(token.trim(), uid.trim(), role.parse()?))
            })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Option<Caller> {
        self.tokens.get(token).cloned()
    }
}
