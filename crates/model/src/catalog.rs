use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// An entry of the `categories` collection.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
}

impl HasId for Category {
    type IdType = String;
}

/// An entry of the `brands` collection.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    pub logo: Option<String>,
}

impl HasId for Brand {
    type IdType = String;
}
