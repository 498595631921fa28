use std::cmp::Ordering;

use chrono::NaiveDateTime;
use model::{
    geo::InvalidArgument,
    search::{ReviewSortKey, SortOrder, StoreSortKey, StoreType},
};
use serde_json::Value;

use crate::database::{Document, Filter};

/// Which slice of a result list to return. Pages count from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Result<Self, InvalidArgument> {
        if page == 0 {
            return Err(InvalidArgument("page must be at least 1".to_owned()));
        }
        if limit == 0 {
            return Err(InvalidArgument("limit must be at least 1".to_owned()));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cuts the requested page out of the complete, ordered result list.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let offset = (self.page - 1).saturating_mul(self.limit);
        let items = items.into_iter().skip(offset).take(self.limit).collect();

        Page {
            items,
            page: self.page,
            limit: self.limit,
            total,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// One page of a result list.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    /// Size of the complete result list.
    pub total: usize,
}

impl<T> Page<T> {
    pub fn pages(&self) -> usize {
        self.total.div_ceil(self.limit)
    }
}

/// Attribute search over the store directory.
#[derive(Debug, Clone, Default)]
pub struct StoreSearch {
    /// A single word, matched against the search tokens of a store.
    pub text: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_rating: Option<f64>,
    pub store_type: Option<StoreType>,
    /// Only stores open at this local time.
    pub open_at: Option<NaiveDateTime>,
    /// Hide stores that are not published.
    pub published_only: bool,
    pub sort_by: StoreSortKey,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl StoreSearch {
    /// The predicates that can be handed to the document store.
    pub fn filters(&self) -> Result<Vec<Filter>, InvalidArgument> {
        let mut filters = vec![];

        if self.published_only {
            filters.push(Filter::equals("isPublished", true));
        }
        filters.extend(store_type_filters(self.store_type));
        if let Some(token) = self
            .text
            .as_deref()
            .map(|text| text.trim().to_lowercase())
            .filter(|token| !token.is_empty())
        {
            filters.push(Filter::array_contains("searchTokens", token));
        }
        if let Some(category) = &self.category {
            filters.push(Filter::array_contains("categories", category.as_str()));
        }
        if let Some(brand) = &self.brand {
            filters.push(Filter::array_contains("brands", brand.as_str()));
        }
        if let Some(min_rating) = self.min_rating {
            if !min_rating.is_finite() {
                return Err(InvalidArgument(format!(
                    "rating must be a number, got {}",
                    min_rating
                )));
            }
            filters.push(Filter::range("rating", min_rating, f64::MAX));
        }

        Ok(filters)
    }
}

pub(crate) fn store_type_filters(store_type: Option<StoreType>) -> Vec<Filter> {
    store_type
        .map(StoreType::required_flags)
        .unwrap_or_default()
        .iter()
        .map(|flag| Filter::equals(*flag, true))
        .collect()
}

/// Paging and ordering of the reviews of a store.
#[derive(Debug, Clone, Default)]
pub struct ReviewSearch {
    /// Only reviews with exactly this many stars.
    pub rating: Option<u8>,
    pub sort_by: ReviewSortKey,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

/// Stable sort of documents by a field. Documents lacking the field come
/// last, whatever the order.
pub fn sort_documents(documents: &mut [Document], field: &str, order: SortOrder) {
    documents.sort_by(|a, b| match (a.field(field), b.field(field)) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => compare_values(a, b),
            SortOrder::Desc => compare_values(b, a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
