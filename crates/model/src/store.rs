use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{
    geo::{Coordinate, Locatable},
    opening_hours::{OpeningInterval, WeeklySchedule},
    ExampleData,
};

/// A store of the directory as it is stored in the `stores` collection.
///
/// Documents are loosely shaped; every attribute is optional and unknown
/// attributes are dropped while decoding.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Store {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub logo: Option<String>,
    pub is_webshop: bool,
    pub has_physical_store: bool,
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    pub location: Option<Location>,
    pub opening_hours: Option<WeeklySchedule>,
    pub rating: Option<f64>,
    pub total_reviews: Option<u32>,
    /// Lower case words a text search matches on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_tokens: Vec<String>,
    pub is_published: bool,
    pub is_featured: bool,
}

impl Store {
    pub fn in_any_category(&self, categories: &[String]) -> bool {
        self.categories
            .iter()
            .any(|category| categories.contains(category))
    }
}

impl HasId for Store {
    type IdType = String;
}

impl Locatable for Store {
    fn coordinate(&self) -> Option<Coordinate> {
        self.location.as_ref()?.coordinate()
    }
}

impl ExampleData for Store {
    fn example_data() -> Self {
        Store {
            name: Some("Fashion Boutique".to_owned()),
            description: None,
            url: Some("https://fashionboutique.fo".to_owned()),
            logo: None,
            is_webshop: true,
            has_physical_store: true,
            categories: vec!["Women's Fashion".to_owned(), "Shoes".to_owned()],
            brands: vec!["Prada".to_owned()],
            location: Some(Location {
                geopoint: Some(GeoPoint {
                    latitude: 62.0107,
                    longitude: -6.7741,
                }),
                address: Some("Niels Finsensgøta 15, 100 Tórshavn".to_owned()),
            }),
            opening_hours: Some(WeeklySchedule::from_days([(
                1,
                vec![OpeningInterval::new(10 * 60, 17 * 60 + 30)],
            )])),
            rating: Some(4.5),
            total_reviews: Some(12),
            search_tokens: vec!["fashion".to_owned(), "boutique".to_owned()],
            is_published: true,
            is_featured: false,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub geopoint: Option<GeoPoint>,
    pub address: Option<String>,
}

impl Location {
    /// A stored geopoint outside of the valid ranges counts as unknown.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.geopoint
            .as_ref()
            .and_then(|point| Coordinate::new(point.latitude, point.longitude).ok())
    }
}

/// A position as stored in a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}
