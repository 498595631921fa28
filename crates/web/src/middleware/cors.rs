use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
        },
        HeaderValue, StatusCode,
    },
};
use log::debug;

use super::pipeline::{ResponseHeaders, Stage};
use crate::common::RouteErrorResponse;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Rejects cross origin requests from origins not on the list. Requests
/// without an `Origin` header are not cross origin and pass.
#[derive(Debug, Clone)]
pub struct CorsStage {
    allowed_origins: Vec<String>,
}

impl CorsStage {
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
        }
    }

    fn allows(&self, origin: &HeaderValue) -> bool {
        origin
            .to_str()
            .is_ok_and(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
    }
}

#[async_trait]
impl Stage for CorsStage {
    async fn process(&self, request: Request) -> Result<Request, RouteErrorResponse> {
        let Some(origin) = request.headers().get(ORIGIN) else {
            return Ok(request);
        };

        if !self.allows(origin) {
            debug!("Rejecting request from origin {:?}", origin);
            return Err(RouteErrorResponse::new(StatusCode::FORBIDDEN)
                .with_method(request.method())
                .with_uri(request.uri().path())
                .with_message("Unauthorized origin"));
        }

        if let Some(headers) = request.extensions().get::<ResponseHeaders>() {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
        }
        Ok(request)
    }
}
