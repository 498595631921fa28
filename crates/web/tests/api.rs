use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use database::MemoryDatabase;
use directory::{client::Client, identity::StaticIdentityProvider};
use model::rate_limit::{RateLimit, RateLimitPolicy, Role};
use serde_json::{json, Value};
use tower::ServiceExt;
use web::{config::WebConfig, router, WebState};

const SEED: &str = include_str!("../../../resources/seed/stores.json");
const ALLOWED_ORIGIN: &str = "https://keyp.fo";

fn config() -> WebConfig {
    WebConfig {
        allowed_origins: vec![ALLOWED_ORIGIN.to_owned()],
        api_tokens: StaticIdentityProvider::new()
            .with_token("user-token", "anna", Role::User)
            .with_token("owner-token", "bjarni", Role::StoreOwner)
            .with_token("admin-token", "root", Role::Admin),
        ..Default::default()
    }
}

async fn app(config: WebConfig) -> Router {
    let database = MemoryDatabase::new();
    database
        .seed(serde_json::from_str(SEED).unwrap())
        .await
        .unwrap();

    let state = WebState {
        store_client: Client::new(database).with_rate_limits(config.rate_limits),
        identity_provider: Arc::new(config.api_tokens.clone()),
    };
    router(state, &config)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with(uri: &str, name: header::HeaderName, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn ids<'a>(body: &'a Value, key: &str) -> Vec<&'a str> {
    body[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect()
}

fn store_ids(body: &Value) -> Vec<&str> {
    ids(body, "stores")
}

#[tokio::test]
async fn ping() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/ping")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "pong!" }));
}

#[tokio::test]
async fn nearby_stores_nearest_first() {
    let app = app(config()).await;

    let (status, _, body) = call(
        &app,
        get("/api/v1/stores/nearby?lat=62.0107&lng=-6.7741&radius=10"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        store_ids(&body),
        vec!["fashion-boutique", "bakaríið", "tech-haven"]
    );
    assert_eq!(body["total"], 3);
    assert_eq!(body["center"], json!({ "lat": 62.0107, "lng": -6.7741 }));
    assert_eq!(body["radius"], 10.0);
    assert_eq!(body["stores"][0]["distanceMeters"], 0.0);
    assert_eq!(body["stores"][0]["name"], "Fashion Boutique");
    assert!(body["links"].is_array());
    assert!(body["stores"][0]["links"].is_array());
}

#[tokio::test]
async fn nearby_defaults_radius_and_limit() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/nearby?lat=62.0107&lng=-6.7741")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["radius"], 10.0);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn nearby_limit_keeps_total() {
    let app = app(config()).await;

    let (_, _, body) = call(
        &app,
        get("/api/v1/stores/nearby?lat=62.0107&lng=-6.7741&radius=50&limit=2"),
    )
    .await;

    assert_eq!(store_ids(&body), vec!["fashion-boutique", "bakaríið"]);
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn nearby_filters_by_repeated_category() {
    let app = app(config()).await;

    let (_, _, body) = call(
        &app,
        get("/api/v1/stores/nearby?lat=62.0107&lng=-6.7741&radius=50&category=Shoes&category=Food"),
    )
    .await;

    assert_eq!(
        store_ids(&body),
        vec!["fashion-boutique", "bakaríið", "klaksvik-sport"]
    );
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn nearby_rejects_bad_input() {
    let app = app(config()).await;

    for uri in [
        "/api/v1/stores/nearby",
        "/api/v1/stores/nearby?lat=62.0",
        "/api/v1/stores/nearby?lat=north&lng=-6.77",
        "/api/v1/stores/nearby?lat=91&lng=-6.77",
        "/api/v1/stores/nearby?lat=62.0&lng=-6.77&radius=0",
        "/api/v1/stores/nearby?lat=62.0&lng=-6.77&radius=-3",
    ] {
        let (status, _, body) = call(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn radius_errors_speak_kilometres() {
    let app = app(config()).await;

    let (status, _, body) = call(
        &app,
        get("/api/v1/stores/nearby?lat=62.0&lng=-6.77&radius=-3"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "radius must be a positive number of kilometres, got -3"
    );
}

#[tokio::test]
async fn searches_stores_by_rating() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/search")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body, "data"),
        vec![
            "bakaríið",
            "fashion-boutique",
            "nordic-gifts",
            "tech-haven",
            "klaksvik-sport"
        ]
    );
    assert_eq!(
        body["pagination"],
        json!({ "page": 1, "limit": 20, "total": 5, "pages": 1 })
    );
}

#[tokio::test]
async fn searches_stores_by_attributes() {
    let app = app(config()).await;

    for (uri, expected) in [
        (
            "/api/v1/stores/search?q=Shoes",
            vec!["fashion-boutique", "klaksvik-sport"],
        ),
        (
            "/api/v1/stores/search?rating=4&sortBy=name&sortOrder=asc",
            vec!["bakaríið", "fashion-boutique", "nordic-gifts"],
        ),
        (
            "/api/v1/stores/search?onlyWebshops=true",
            vec!["fashion-boutique", "nordic-gifts"],
        ),
        ("/api/v1/stores/search?storeType=both", vec!["fashion-boutique"]),
        ("/api/v1/stores/search?brand=Nike", vec!["klaksvik-sport"]),
        (
            "/api/v1/stores/search?category=Shoes&sortBy=name&sortOrder=asc",
            vec!["fashion-boutique", "klaksvik-sport"],
        ),
        ("/api/v1/stores/search?q=toys", vec![]),
    ] {
        let (status, _, body) = call(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(ids(&body, "data"), expected, "{}", uri);
    }
}

#[tokio::test]
async fn search_pages_through_results() {
    let app = app(config()).await;

    let (_, _, body) = call(&app, get("/api/v1/stores/search?limit=2&page=2")).await;

    assert_eq!(ids(&body, "data"), vec!["nordic-gifts", "tech-haven"]);
    assert_eq!(
        body["pagination"],
        json!({ "page": 2, "limit": 2, "total": 5, "pages": 3 })
    );

    let (_, _, body) = call(&app, get("/api/v1/stores/search?limit=2&page=4")).await;
    assert!(ids(&body, "data").is_empty());
    assert_eq!(body["pagination"]["total"], 5);
}

#[tokio::test]
async fn search_rejects_bad_input() {
    let app = app(config()).await;

    for uri in [
        "/api/v1/stores/search?page=0",
        "/api/v1/stores/search?limit=0",
        "/api/v1/stores/search?sortBy=price",
        "/api/v1/stores/search?storeType=kiosk",
        "/api/v1/stores/search?rating=plenty",
        "/api/v1/stores/search?rating=NaN",
    ] {
        let (status, _, body) = call(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn public_search_hides_unpublished_stores() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/public/search")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body, "data"),
        vec!["bakaríið", "fashion-boutique", "tech-haven", "klaksvik-sport"]
    );
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(ids(&body, "featured"), vec!["bakaríið", "fashion-boutique"]);
    assert_eq!(
        body["filters"]["categories"],
        json!(["Electronics", "Food", "Gifts", "Shoes", "Sports", "Women's Fashion"])
    );
    assert_eq!(
        body["filters"]["brands"],
        json!(["Apple", "Nike", "Prada", "Samsung"])
    );
    assert_eq!(
        body["filters"]["storeTypes"],
        json!(["webshop", "physical", "both"])
    );
}

#[tokio::test]
async fn public_search_features_only_on_the_first_page() {
    let app = app(config()).await;

    let (_, _, body) = call(&app, get("/api/v1/stores/public/search?onlyWebshops=true")).await;
    assert_eq!(ids(&body, "data"), vec!["fashion-boutique"]);
    assert_eq!(ids(&body, "featured"), vec!["fashion-boutique"]);

    let (_, _, body) = call(&app, get("/api/v1/stores/public/search?page=2&limit=2")).await;
    assert_eq!(ids(&body, "data"), vec!["tech-haven", "klaksvik-sport"]);
    assert!(ids(&body, "featured").is_empty());
}

#[tokio::test]
async fn lists_categories_and_brands() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/categories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 6);
    assert_eq!(body["data"][1], json!({ "id": "food", "name": "Food", "description": "Bakeries, delis and grocers" }));
    assert!(body.get("pagination").is_none());

    let (status, _, body) = call(&app, get("/api/v1/stores/brands")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body, "data"),
        vec!["apple", "nike", "prada", "samsung"]
    );
}

#[tokio::test]
async fn lists_reviews_with_summary() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/fashion-boutique/reviews")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body, "data"), vec!["r2", "r1", "r3"]);
    assert_eq!(body["data"][1]["rating"], 5);
    assert_eq!(body["summary"]["total"], 3);
    assert!((body["summary"]["average"].as_f64().unwrap() - 13.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        body["summary"]["distribution"],
        json!({ "1": 0, "2": 0, "3": 0, "4": 2, "5": 1 })
    );
    assert_eq!(
        body["pagination"],
        json!({ "page": 1, "limit": 20, "total": 3, "pages": 1 })
    );
    assert_eq!(
        body["links"][0],
        json!({ "rel": "store", "href": "http://localhost/api/v1/stores/fashion-boutique" })
    );
}

#[tokio::test]
async fn filters_and_sorts_reviews() {
    let app = app(config()).await;

    let (_, _, body) = call(&app, get("/api/v1/stores/fashion-boutique/reviews?rating=4")).await;
    assert_eq!(ids(&body, "data"), vec!["r2", "r3"]);
    assert_eq!(body["pagination"]["total"], 2);
    // the summary always covers every review
    assert_eq!(body["summary"]["total"], 3);

    let (_, _, body) = call(
        &app,
        get("/api/v1/stores/fashion-boutique/reviews?sortBy=rating&sortOrder=asc"),
    )
    .await;
    assert_eq!(ids(&body, "data"), vec!["r2", "r3", "r1"]);
}

#[tokio::test]
async fn reviews_of_unknown_or_quiet_stores() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/tech-haven/reviews")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body, "data").is_empty());
    assert_eq!(body["summary"]["total"], 0);
    assert_eq!(body["summary"]["average"], 0.0);

    let (status, _, _) = call(&app, get("/api/v1/stores/closed-down/reviews")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = call(&app, get("/api/v1/stores/tech-haven/reviews?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_and_gets_stores() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (status, _, body) = call(&app, get("/api/v1/stores/tech-haven")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "tech-haven");
    assert_eq!(body["name"], "Tech Haven");
    assert_eq!(
        body["links"][0],
        json!({ "rel": "self", "href": "http://localhost/api/v1/stores/tech-haven" })
    );

    let (status, _, body) = call(&app, get("/api/v1/stores/closed-down")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "The requested item does not exist.");
}

#[tokio::test]
async fn opening_hours_with_special_day() {
    let app = app(config()).await;

    let (status, _, body) = call(
        &app,
        get("/api/v1/stores/fashion-boutique/hours?date=2024-12-24"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSpecialDay"], true);
    assert_eq!(body["special"]["note"], "Christmas Eve");
    assert_eq!(
        body["regular"]["1"],
        json!([{ "open": "10:00", "close": "17:30" }])
    );

    let (_, _, body) = call(
        &app,
        get("/api/v1/stores/fashion-boutique/hours?date=2024-12-23"),
    )
    .await;
    assert_eq!(body["isSpecialDay"], false);
    assert!(body.get("special").is_none());

    let (status, _, body) = call(
        &app,
        get("/api/v1/stores/fashion-boutique/hours?date=christmas"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/wishlists")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["requestedUri"], "/api/v1/wishlists");
    assert_eq!(body["httpMethod"], "GET");
}

#[tokio::test]
async fn schema_describes_stores() {
    let app = app(config()).await;

    let (status, _, body) = call(&app, get("/api/v1/stores/schema")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["properties"]["openingHours"].is_object());
}

#[tokio::test]
async fn rejects_foreign_origins() {
    let app = app(config()).await;

    let (status, _, body) = call(
        &app,
        get_with("/api/ping", header::ORIGIN, "https://evil.example"),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn allowed_origins_get_cors_headers() {
    let app = app(config()).await;

    let (status, headers, _) = call(&app, get_with("/api/ping", header::ORIGIN, ALLOWED_ORIGIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );

    let (status, headers, _) = call(&app, get("/api/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn answers_preflight_requests() {
    let app = app(config()).await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/stores/nearby")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(&app, request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
}

#[tokio::test]
async fn cors_check_can_be_disabled() {
    let app = app(WebConfig {
        allowed_origins: vec![],
        ..config()
    })
    .await;

    let (status, _, _) = call(
        &app,
        get_with("/api/ping", header::ORIGIN, "https://anywhere.example"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

fn strict_config() -> WebConfig {
    WebConfig {
        rate_limits: RateLimitPolicy {
            user: RateLimit::per_hour(2),
            store_owner: RateLimit::per_hour(3),
        },
        ..config()
    }
}

#[tokio::test]
async fn limits_authenticated_users() {
    let app = app(strict_config()).await;

    for _ in 0..2 {
        let (status, _, _) = call(
            &app,
            get_with("/api/ping", header::AUTHORIZATION, "Bearer user-token"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = call(
        &app,
        get_with("/api/ping", header::AUTHORIZATION, "Bearer user-token"),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Please try again later.");

    // store owners have their own, larger budget
    let (status, _, _) = call(
        &app,
        get_with("/api/ping", header::AUTHORIZATION, "Bearer owner-token"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admins_are_not_limited() {
    let app = app(strict_config()).await;

    for _ in 0..5 {
        let (status, _, _) = call(
            &app,
            get_with("/api/ping", header::AUTHORIZATION, "Bearer admin-token"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

fn forwarded_for(address: &str) -> Request<Body> {
    get_with("/api/ping", "x-forwarded-for".parse().unwrap(), address)
}

#[tokio::test]
async fn limits_anonymous_callers_by_forwarded_address() {
    let app = app(WebConfig {
        trust_proxy: true,
        ..strict_config()
    })
    .await;

    for _ in 0..2 {
        let (status, _, _) = call(&app, forwarded_for("10.0.0.1")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _, _) = call(&app, forwarded_for("10.0.0.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _, _) = call(&app, forwarded_for("10.0.0.2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_address_is_ignored_without_trusted_proxy() {
    let app = app(strict_config()).await;

    // every caller lands in the same bucket, whatever the header claims
    for address in ["10.0.0.1", "10.0.0.2"] {
        let (status, _, _) = call(&app, forwarded_for(address)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _, _) = call(&app, forwarded_for("10.0.0.3")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn rejects_invalid_tokens() {
    let app = app(config()).await;

    for value in ["Bearer forged", "Basic YW5uYTpzZWNyZXQ=", "Bearer "] {
        let (status, _, body) = call(&app, get_with("/api/ping", header::AUTHORIZATION, value)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", value);
        assert_eq!(body["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn rejections_keep_cors_headers() {
    let app = app(config()).await;

    let request = Request::builder()
        .uri("/api/ping")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::AUTHORIZATION, "Bearer forged")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
}
