use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, OriginalUri, Request},
    http::{header::AUTHORIZATION, HeaderMap},
};
use chrono::Utc;
use directory::{
    client::Client, database::DocumentStore, identity::IdentityProvider, RequestError,
};
use log::debug;
use model::rate_limit::{Caller, Role};

use super::pipeline::Stage;
use crate::common::RouteErrorResponse;

/// Books every request against the rate limit of its caller.
///
/// Callers presenting a bearer token are identified through the identity
/// provider. Everyone else counts as a plain user keyed by client address.
pub struct RateLimitStage<D: DocumentStore> {
    client: Client<D>,
    identity_provider: Arc<dyn IdentityProvider>,
    trust_proxy: bool,
}

impl<D: DocumentStore> RateLimitStage<D> {
    pub fn new(client: Client<D>, identity_provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            client,
            identity_provider,
            trust_proxy: false,
        }
    }

    /// Take the client address from `x-forwarded-for` when present. Only
    /// sensible behind a reverse proxy that sets the header.
    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    fn pending_caller(&self, request: &Request) -> Result<PendingCaller, RequestError> {
        match request.headers().get(AUTHORIZATION) {
            Some(_) => bearer_token(request.headers())
                .map(PendingCaller::Token)
                .ok_or(RequestError::Unauthorized),
            None => Ok(PendingCaller::Anonymous(client_address(
                request,
                self.trust_proxy,
            ))),
        }
    }
}

#[async_trait]
impl<D: DocumentStore> Stage for RateLimitStage<D> {
    async fn process(&self, request: Request) -> Result<Request, RouteErrorResponse> {
        let method = request.method().clone();
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.path().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());

        let reject = |why: RequestError| {
            RouteErrorResponse::from(why)
                .with_method(&method)
                .with_uri(path.clone())
        };

        let pending = self.pending_caller(&request).map_err(reject)?;
        let caller = pending
            .resolve(self.identity_provider.as_ref())
            .await
            .map_err(reject)?;

        self.client
            .record_request(&caller, &path, Utc::now())
            .await
            .map_err(|why| {
                debug!("Rejecting request of {} ({}): {}", caller.key, caller.role, why);
                reject(why)
            })?;
        Ok(request)
    }
}

/// Caller identification taken from the request, before the token is
/// verified.
enum PendingCaller {
    Token(String),
    Anonymous(String),
}

impl PendingCaller {
    async fn resolve(
        self,
        identity_provider: &dyn IdentityProvider,
    ) -> Result<Caller, RequestError> {
        match self {
            PendingCaller::Token(token) => identity_provider
                .verify(&token)
                .await
                .ok_or(RequestError::Unauthorized),
            PendingCaller::Anonymous(address) => Ok(Caller::new(
                format!("anonymous:{}", address),
                Role::User,
            )),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn client_address(request: &Request, trust_proxy: bool) -> String {
    let forwarded = || {
        request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_owned)
    };
    let connected = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip().to_string())
    };

    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(connected)
        .unwrap_or_else(|| "unknown".to_owned())
}
