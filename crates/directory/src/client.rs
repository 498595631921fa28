use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use model::{
    catalog::{Brand, Category},
    geo::{check_radius, compute_bounds, Coordinate},
    opening_hours::{SpecialHours, StoreHours},
    rate_limit::{Caller, RateLimitPolicy, RateLimitRecord},
    review::{RatingsSummary, Review},
    search::StoreType,
    store::Store,
    WithDistance, WithId,
};
use serde::de::DeserializeOwned;
use utility::{chain::Chain, id::Id};

use crate::{
    database::{DatabaseError, Document, DocumentStore, Filter},
    filter::StoreFilter,
    ranking::rank_all,
    search::{sort_documents, store_type_filters, Page, ReviewSearch, StoreSearch},
    RequestError, RequestResult,
};

pub const STORES: &str = "stores";
pub const RATE_LIMITS: &str = "rateLimits";
pub const CATEGORIES: &str = "categories";
pub const BRANDS: &str = "brands";

const LATITUDE_FIELD: &str = "location.geopoint.latitude";

fn special_hours_collection(store: &Id<Store>) -> String {
    format!("{}/{}/specialHours", STORES, store)
}

fn reviews_collection(store: &Id<Store>) -> String {
    format!("{}/{}/reviews", STORES, store)
}

#[derive(Debug, Clone)]
pub struct NearbySearch {
    pub center: Coordinate,
    pub radius_meters: f64,
    pub filter: StoreFilter,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct NearbyStores {
    /// The nearest matches, at most `limit` of them.
    pub stores: Vec<WithDistance<WithId<Store>>>,
    /// Number of matches within the radius before truncation.
    pub total: usize,
}

/// A page of reviews together with the summary over all reviews of the
/// store.
#[derive(Debug, Clone)]
pub struct StoreReviews {
    pub reviews: Page<WithId<Review>>,
    pub summary: RatingsSummary,
}

/// Request-scoped access to the store directory.
#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: DocumentStore,
{
    pub database: D,
    rate_limits: RateLimitPolicy,
}

impl<D> Client<D>
where
    D: DocumentStore,
{
    pub fn new(database: D) -> Self {
        Self {
            database,
            rate_limits: RateLimitPolicy::default(),
        }
    }

    pub fn with_rate_limits(mut self, rate_limits: RateLimitPolicy) -> Self {
        self.rate_limits = rate_limits;
        self
    }
}

impl<D> Client<D>
where
    D: DocumentStore,
{
    pub async fn get_stores(&self) -> RequestResult<Vec<WithId<Store>>> {
        self.database
            .get(STORES, &[])
            .await?
            .into_iter()
            .filter_map(decode::<Store>)
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    pub async fn get_store(&self, id: &Id<Store>) -> RequestResult<WithId<Store>> {
        let document = self.database.get_by_id(STORES, id.as_str()).await?;
        // a store that exists but can not be read is as good as missing
        decode::<Store>(document).ok_or(RequestError::NotFound)
    }

    /// Stores within the search radius, nearest first.
    ///
    /// Candidates are narrowed by a latitude range derived from the bounding
    /// box; the radius itself is enforced on exact distances.
    pub async fn find_nearby(&self, search: NearbySearch) -> RequestResult<NearbyStores> {
        let radius_meters = check_radius(search.radius_meters)?;
        let (south, north) = compute_bounds(search.center, radius_meters).latitude_range();

        let candidates = self
            .database
            .get(STORES, &[Filter::range(LATITUDE_FIELD, south, north)])
            .await?
            .into_iter()
            .filter_map(decode::<Store>)
            .filter(|store| search.filter.matches(&store.content))
            .collect::<Vec<_>>();
        debug!(
            "{} candidate stores between latitudes {:.5} and {:.5}",
            candidates.len(),
            south,
            north
        );

        let mut stores = rank_all(search.center, candidates, radius_meters)?;
        let total = stores.len();
        stores.truncate(search.limit);

        Ok(NearbyStores { stores, total })
    }

    /// Stores matching every given attribute, sorted and paged.
    ///
    /// Stores lacking the sort field are listed last.
    pub async fn search_stores(&self, search: StoreSearch) -> RequestResult<Page<WithId<Store>>> {
        let mut documents = self.database.get(STORES, &search.filters()?).await?;
        sort_documents(&mut documents, search.sort_by.field(), search.sort_order);

        let open = StoreFilter {
            categories: vec![],
            open_at: search.open_at,
        };
        documents
            .into_iter()
            .filter_map(decode::<Store>)
            .filter(|store| open.matches(&store.content))
            .collect::<Vec<_>>()
            .let_owned(|stores| Ok(search.page.slice(stores)))
    }

    /// Published stores flagged as featured, at most `limit` of them.
    pub async fn featured_stores(
        &self,
        store_type: Option<StoreType>,
        limit: usize,
    ) -> RequestResult<Vec<WithId<Store>>> {
        let mut filters = vec![
            Filter::equals("isPublished", true),
            Filter::equals("isFeatured", true),
        ];
        filters.extend(store_type_filters(store_type));

        self.database
            .get(STORES, &filters)
            .await?
            .into_iter()
            .filter_map(decode::<Store>)
            .take(limit)
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    pub async fn get_categories(&self) -> RequestResult<Vec<WithId<Category>>> {
        self.database
            .get(CATEGORIES, &[])
            .await?
            .into_iter()
            .filter_map(decode::<Category>)
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    pub async fn get_brands(&self) -> RequestResult<Vec<WithId<Brand>>> {
        self.database
            .get(BRANDS, &[])
            .await?
            .into_iter()
            .filter_map(decode::<Brand>)
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    /// Reviews of a store. The rating filter narrows the page but not the
    /// summary.
    pub async fn get_reviews(
        &self,
        id: &Id<Store>,
        search: ReviewSearch,
    ) -> RequestResult<StoreReviews> {
        self.get_store(id).await?;

        let mut documents = self.database.get(&reviews_collection(id), &[]).await?;
        sort_documents(&mut documents, search.sort_by.field(), search.sort_order);
        let reviews = documents
            .into_iter()
            .filter_map(decode::<Review>)
            .collect::<Vec<_>>();

        let summary = RatingsSummary::of(reviews.iter().map(|review| review.content.rating));
        let reviews = reviews
            .into_iter()
            .filter(|review| search.rating.map_or(true, |stars| review.content.rating == stars))
            .collect::<Vec<_>>();

        Ok(StoreReviews {
            reviews: search.page.slice(reviews),
            summary,
        })
    }

    /// Regular opening hours of a store plus the deviating hours for `date`.
    pub async fn get_opening_hours(
        &self,
        id: &Id<Store>,
        date: Option<NaiveDate>,
    ) -> RequestResult<StoreHours> {
        let store = self.get_store(id).await?;
        let regular = store.content.opening_hours.unwrap_or_default();

        let special = match date {
            Some(date) => self
                .database
                .get(
                    &special_hours_collection(id),
                    &[Filter::equals("date", date.format("%Y-%m-%d").to_string())],
                )
                .await?
                .into_iter()
                .find_map(decode::<SpecialHours>)
                .map(|special| special.content),
            None => None,
        };

        Ok(StoreHours::new(regular, special))
    }

    /// Books a request of `caller` against its rate limit.
    ///
    /// Fails with [`RequestError::RateLimited`] if the caller used up its
    /// requests within the current window. Admins are not tracked.
    pub async fn record_request(
        &self,
        caller: &Caller,
        path: &str,
        now: DateTime<Utc>,
    ) -> RequestResult<()> {
        let Some(limit) = self.rate_limits.limit_for(caller.role) else {
            return Ok(());
        };
        let path = path.to_owned();
        let key = caller.key.clone();

        self.database
            .run_transaction(RATE_LIMITS, &caller.key, move |current| {
                let record = match current {
                    Some(value) => serde_json::from_value(value).unwrap_or_else(|why| {
                        warn!("Resetting unreadable rate limit record of '{}': {}", key, why);
                        RateLimitRecord::default()
                    }),
                    None => RateLimitRecord::default(),
                };
                let record = record
                    .admit(&limit, path, now)
                    .map_err(|why| DatabaseError::Aborted(why.to_string()))?;
                serde_json::to_value(record).map_err(DatabaseError::other)
            })
            .await
            .map(|_| ())
            .map_err(|why| match why {
                DatabaseError::Aborted(_) => RequestError::RateLimited,
                other => other.into(),
            })
    }
}

/// Documents that do not decode are skipped; a single broken document must
/// not fail a whole listing.
fn decode<T>(document: Document) -> Option<WithId<T>>
where
    T: DeserializeOwned + utility::id::HasId<IdType = String>,
{
    match serde_json::from_value::<T>(document.data) {
        Ok(content) => Some(WithId::new(Id::new(document.id), content)),
        Err(why) => {
            warn!("Skipping undecodable document '{}': {}", document.id, why);
            None
        }
    }
}
