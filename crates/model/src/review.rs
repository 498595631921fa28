use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// A review of a store, stored below `stores/{id}/reviews`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: Option<String>,
    /// One to five stars.
    pub rating: u8,
    pub text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Review {
    type IdType = String;
}

/// Aggregate over all reviews of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RatingsSummary {
    /// Mean rating, `0` without reviews.
    pub average: f64,
    pub total: usize,
    /// Number of reviews per star count, one to five.
    pub distribution: BTreeMap<u8, usize>,
}

impl RatingsSummary {
    pub fn of<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let mut distribution = (1..=5).map(|stars| (stars, 0)).collect::<BTreeMap<_, _>>();
        let mut sum = 0u64;
        let mut total = 0;

        for rating in ratings {
            sum += u64::from(rating);
            total += 1;
            if let Some(count) = distribution.get_mut(&rating) {
                *count += 1;
            }
        }

        let average = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };

        Self {
            average,
            total,
            distribution,
        }
    }
}
