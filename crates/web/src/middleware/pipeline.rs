use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::common::RouteErrorResponse;

/// One step of request admission. A stage either hands the (possibly
/// modified) request on or rejects it.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn process(&self, request: Request) -> Result<Request, RouteErrorResponse>;
}

/// Headers that stages want on the eventual response, rejections included.
///
/// Stages find it in the request extensions.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders(Arc<Mutex<HeaderMap>>);

impl ResponseHeaders {
    pub fn insert(&self, name: HeaderName, value: HeaderValue) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    fn take(&self) -> HeaderMap {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Ordered list of stages, run front to back. The first rejection ends the
/// run.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    async fn admit(&self, mut request: Request) -> Result<Request, RouteErrorResponse> {
        for stage in self.stages.iter() {
            request = stage.process(request).await?;
        }
        Ok(request)
    }
}

/// Runs the pipeline in front of the wrapped routes. Admitted `OPTIONS`
/// preflights are answered right away.
pub async fn pipeline_middleware(
    State(pipeline): State<Pipeline>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = ResponseHeaders::default();
    request.extensions_mut().insert(headers.clone());

    let mut response = match pipeline.admit(request).await {
        Ok(request) if *request.method() == Method::OPTIONS => {
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(request) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    };
    response.headers_mut().extend(headers.take());
    response
}
