use chrono::NaiveDateTime;
use model::store::Store;

/// Attribute filters applied before any distance is computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilter {
    /// Matches stores in any of these categories. Empty matches every store.
    pub categories: Vec<String>,
    /// Only stores open at this local time.
    pub open_at: Option<NaiveDateTime>,
}

impl StoreFilter {
    pub fn matches(&self, store: &Store) -> bool {
        self.matches_categories(store) && self.matches_open(store)
    }

    fn matches_categories(&self, store: &Store) -> bool {
        self.categories.is_empty() || store.in_any_category(&self.categories)
    }

    fn matches_open(&self, store: &Store) -> bool {
        match (self.open_at, &store.opening_hours) {
            (None, _) => true,
            (Some(at), Some(schedule)) => schedule.is_open_at(at),
            // no schedule, no way to tell it's open
            (Some(_), None) => false,
        }
    }
}
