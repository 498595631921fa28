use std::sync::Arc;

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

/// Externally visible root of the service, as seen through any reverse
/// proxy in front of it. Used to render absolute hypermedia links.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseUrl {
    proto: String,
    host: String,
    prefix: String,
}

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

        Self {
            proto: header("x-forwarded-proto").unwrap_or("http").to_owned(),
            host: header("x-forwarded-host")
                .or_else(|| header("host"))
                .unwrap_or("localhost")
                .to_owned(),
            prefix: header("x-forwarded-prefix")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_owned(),
        }
    }

    pub fn full_url<S: Into<String>>(&self, path: S) -> String {
        format!("{}://{}{}{}", self.proto, self.host, self.prefix, path.into())
    }
}

pub async fn base_url_middleware(mut request: Request, next: Next) -> Response {
    let base_url = BaseUrl::from_headers(request.headers());
    request.extensions_mut().insert(Arc::new(base_url));
    next.run(request).await
}
