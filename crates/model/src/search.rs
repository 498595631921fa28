use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StoreType {
    /// Sells online.
    Webshop,
    /// Has a shop to walk into.
    Physical,
    /// Both of the above.
    Both,
}

impl StoreType {
    pub const ALL: [StoreType; 3] = [StoreType::Webshop, StoreType::Physical, StoreType::Both];

    /// Boolean store fields that have to be set for this type.
    pub fn required_flags(self) -> &'static [&'static str] {
        match self {
            StoreType::Webshop => &["isWebshop"],
            StoreType::Physical => &["hasPhysicalStore"],
            StoreType::Both => &["isWebshop", "hasPhysicalStore"],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StoreSortKey {
    #[default]
    Rating,
    Name,
    TotalReviews,
}

impl StoreSortKey {
    pub fn field(self) -> &'static str {
        match self {
            StoreSortKey::Rating => "rating",
            StoreSortKey::Name => "name",
            StoreSortKey::TotalReviews => "totalReviews",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ReviewSortKey {
    #[default]
    CreatedAt,
    Rating,
}

impl ReviewSortKey {
    pub fn field(self) -> &'static str {
        match self {
            ReviewSortKey::CreatedAt => "createdAt",
            ReviewSortKey::Rating => "rating",
        }
    }
}
