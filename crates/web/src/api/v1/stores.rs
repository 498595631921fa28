use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use axum_extra::extract::{Query, QueryRejection};
use chrono::{Local, NaiveDate};
use directory::{
    client::NearbySearch,
    filter::StoreFilter,
    search::{Page, PageRequest, ReviewSearch, StoreSearch},
    RequestError,
};
use model::{
    catalog::{Brand, Category},
    geo::{Coordinate, LatLng, Locatable},
    opening_hours::StoreHours,
    review::{RatingsSummary, Review},
    search::{ReviewSortKey, SortOrder, StoreSortKey, StoreType},
    store::Store,
    WithDistance, WithId,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{chain::Chain, id::Id};

use crate::{
    common::{
        route_not_found, schema, schema_no_example, HateoasResult, Pagination,
        RouteErrorResponse, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

const DEFAULT_RADIUS_KM: f64 = 10.0;
const DEFAULT_LIMIT: usize = 20;
const DEFAULT_PAGE: usize = 1;
const FEATURED_STORES: usize = 3;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/stores{}", format_args!($($arg)*))
    };
}

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Store>))
        .route("/nearby", get(nearby))
        .route("/nearby/schema", get(schema_no_example::<NearbyDto>))
        .route("/search", get(search))
        .route("/public/search", get(public_search))
        .route("/categories", get(get_categories))
        .route("/brands", get(get_brands))
        .route("/:id/hours", get(get_opening_hours))
        .route("/:id/reviews", get(get_reviews))
        .route("/:id", get(get_store))
        .route("/", get(get_stores))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_stores(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Store>>>> {
    store_client
        .get_stores()
        .await
        .map(|stores| {
            stores
                .into_iter()
                .map(|store| store_hateoas(store, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::non_paginated(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_store(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Store>> {
    store_client
        .get_store(&Id::new(id))
        .await
        .map(|store| store_hateoas(store, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Deserialize)]
struct HoursQuery {
    date: Option<NaiveDate>,
}

async fn get_opening_hours(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> HateoasResult<StoreHours> {
    let bad_request = |message: String| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let Query(params) = query.map_err(|why| bad_request(why.to_string()))?;

    let id = Id::<Store>::new(id);
    store_client
        .get_opening_hours(&id, params.date)
        .await
        .map(|hours| {
            hateoas::Response::builder(hours, base_url)
                .link("store", resource!("/{}", id))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NearbyQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    /// Kilometres.
    radius: Option<f64>,
    #[serde(default)]
    category: Vec<String>,
    is_open: Option<bool>,
    limit: Option<usize>,
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct NearbyDto {
    stores: Vec<hateoas::Response<WithDistance<WithId<Store>>>>,
    total: usize,
    center: LatLng,
    /// Kilometres, as requested.
    radius: f64,
}

async fn nearby(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> HateoasResult<NearbyDto> {
    let bad_request = |message: String| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let Query(params) = query.map_err(|why| bad_request(why.to_string()))?;

    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(bad_request("Latitude and longitude are required".to_owned()));
    };
    let center = Coordinate::new(lat, lng).map_err(|why| bad_request(why.0))?;
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius.is_finite() && radius > 0.0) {
        return Err(bad_request(format!(
            "radius must be a positive number of kilometres, got {}",
            radius
        )));
    }

    let search = NearbySearch {
        center,
        radius_meters: radius * 1000.0,
        filter: StoreFilter {
            categories: params.category,
            open_at: params
                .is_open
                .unwrap_or(false)
                .then(|| Local::now().naive_local()),
        },
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
    };

    store_client
        .find_nearby(search)
        .await
        .map(|found| {
            let stores = found
                .stores
                .into_iter()
                .map(|store| store_with_distance_hateoas(store, base_url.clone()))
                .collect::<Vec<_>>();
            let dto = NearbyDto {
                stores,
                total: found.total,
                center: LatLng { lat, lng },
                radius,
            };
            hateoas::Response::builder(dto, base_url)
                .link(
                    "self",
                    resource!("/nearby?lat={}&lng={}&radius={}", lat, lng, radius),
                )
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    q: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    /// Minimum rating.
    rating: Option<f64>,
    is_open: Option<bool>,
    store_type: Option<StoreType>,
    #[serde(default)]
    only_webshops: bool,
    #[serde(default)]
    sort_by: StoreSortKey,
    #[serde(default)]
    sort_order: SortOrder,
    page: Option<usize>,
    limit: Option<usize>,
}

impl SearchQuery {
    fn store_type(&self) -> Option<StoreType> {
        if self.only_webshops {
            Some(StoreType::Webshop)
        } else {
            self.store_type
        }
    }

    fn into_search(self, published_only: bool) -> Result<StoreSearch, String> {
        let page = PageRequest::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .map_err(|why| why.0)?;

        Ok(StoreSearch {
            store_type: self.store_type(),
            text: self.q,
            category: self.category,
            brand: self.brand,
            min_rating: self.rating,
            open_at: self
                .is_open
                .unwrap_or(false)
                .then(|| Local::now().naive_local()),
            published_only,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            page,
        })
    }
}

type StorePage = VecResponse<hateoas::Response<WithId<Store>>>;

async fn search(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> HateoasResult<StorePage> {
    let bad_request = |message: String| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let Query(params) = query.map_err(|why| bad_request(why.to_string()))?;
    let search = params.into_search(false).map_err(bad_request)?;

    store_client
        .search_stores(search)
        .await
        .map(|found| store_page(found, base_url).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchFilters {
    categories: Vec<String>,
    brands: Vec<String>,
    store_types: Vec<StoreType>,
}

#[derive(Serialize)]
struct PublicSearchDto {
    #[serde(flatten)]
    results: StorePage,
    /// Only filled on the first page.
    featured: Vec<hateoas::Response<WithId<Store>>>,
    filters: SearchFilters,
}

/// Search over published stores, with featured stores and the available
/// filter values for a search form.
async fn public_search(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> HateoasResult<PublicSearchDto> {
    let bad_request = |message: String| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let upstream = |why: RequestError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let Query(params) = query.map_err(|why| bad_request(why.to_string()))?;
    let store_type = params.store_type();
    let search = params.into_search(true).map_err(bad_request)?;
    let first_page = search.page.page() == 1;

    let found = store_client.search_stores(search).await.map_err(upstream)?;
    let featured = if first_page {
        store_client
            .featured_stores(store_type, FEATURED_STORES)
            .await
            .map_err(upstream)?
    } else {
        vec![]
    };
    let categories = store_client.get_categories().await.map_err(upstream)?;
    let brands = store_client.get_brands().await.map_err(upstream)?;

    let dto = PublicSearchDto {
        results: store_page(found, base_url.clone()),
        featured: featured
            .into_iter()
            .map(|store| store_hateoas(store, base_url.clone()))
            .collect(),
        filters: SearchFilters {
            categories: categories
                .into_iter()
                .map(|category| category.content.name)
                .collect(),
            brands: brands.into_iter().map(|brand| brand.content.name).collect(),
            store_types: StoreType::ALL.to_vec(),
        },
    };
    Ok(hateoas::Response::new(dto).json())
}

async fn get_categories(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
) -> HateoasResult<VecResponse<WithId<Category>>> {
    store_client
        .get_categories()
        .await
        .map(|categories| VecResponse::non_paginated(categories).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_brands(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { store_client, .. }): State<WebState>,
) -> HateoasResult<VecResponse<WithId<Brand>>> {
    store_client
        .get_brands()
        .await
        .map(|brands| VecResponse::non_paginated(brands).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewsQuery {
    rating: Option<u8>,
    #[serde(default)]
    sort_by: ReviewSortKey,
    #[serde(default)]
    sort_order: SortOrder,
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ReviewsDto {
    #[serde(flatten)]
    reviews: VecResponse<WithId<Review>>,
    summary: RatingsSummary,
}

async fn get_reviews(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { store_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    query: Result<Query<ReviewsQuery>, QueryRejection>,
) -> HateoasResult<ReviewsDto> {
    let bad_request = |message: String| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let Query(params) = query.map_err(|why| bad_request(why.to_string()))?;
    let page = PageRequest::new(
        params.page.unwrap_or(DEFAULT_PAGE),
        params.limit.unwrap_or(DEFAULT_LIMIT),
    )
    .map_err(|why| bad_request(why.0))?;

    let id = Id::<Store>::new(id);
    let search = ReviewSearch {
        rating: params.rating,
        sort_by: params.sort_by,
        sort_order: params.sort_order,
        page,
    };
    store_client
        .get_reviews(&id, search)
        .await
        .map(|found| {
            let pagination = Pagination::from(&found.reviews);
            let dto = ReviewsDto {
                reviews: VecResponse::paginated(found.reviews.items, pagination),
                summary: found.summary,
            };
            hateoas::Response::builder(dto, base_url)
                .link("store", resource!("/{}", id))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

fn store_page(found: Page<WithId<Store>>, base_url: Arc<BaseUrl>) -> StorePage {
    let pagination = Pagination::from(&found);
    found
        .items
        .into_iter()
        .map(|store| store_hateoas(store, base_url.clone()))
        .collect::<Vec<_>>()
        .let_owned(|data| VecResponse::paginated(data, pagination))
}

fn nearby_resource(store: &Store) -> Option<String> {
    store.coordinate().map(|coordinate| {
        resource!(
            "/nearby?lat={}&lng={}&radius=1",
            coordinate.latitude(),
            coordinate.longitude()
        )
    })
}

fn store_hateoas(
    store: WithId<Store>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Store>> {
    let id = store.id.clone();
    let nearby = nearby_resource(&store.content);
    hateoas::Response::builder(store, base_url)
        .link("self", resource!("/{}", id))
        .link("hours", resource!("/{}/hours", id))
        .link("reviews", resource!("/{}/reviews", id))
        .link_option("nearby", nearby)
        .build()
}

fn store_with_distance_hateoas(
    store: WithDistance<WithId<Store>>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithDistance<WithId<Store>>> {
    let id = store.content.id.clone();
    hateoas::Response::builder(store, base_url)
        .link("self", resource!("/{}", id))
        .link("hours", resource!("/{}/hours", id))
        .build()
}
