use std::sync::Arc;

use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,

    #[serde(rename = "href")]
    pub hypertext_reference: String,
}

/// A response body with hypermedia links to related resources.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            links: vec![],
        }
    }

    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder::new(content, base_url)
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

pub struct ResponseBuilder<T> {
    pub response: Response<T>,
    pub base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    pub fn new(content: T, base_url: Arc<BaseUrl>) -> Self {
        Self {
            response: Response::new(content),
            base_url,
        }
    }

    /// Links a path of this service.
    pub fn link<R, H>(mut self, relation: R, path: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        let hypertext_reference = self.base_url.full_url(path);
        self.response.links.push(Link {
            relation: relation.into(),
            hypertext_reference,
        });
        self
    }

    pub fn link_option<R, H>(self, relation: R, path: Option<H>) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        match path {
            Some(path) => self.link(relation, path),
            None => self,
        }
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}
