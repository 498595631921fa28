pub use crate::common::RouteResult;

use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    extract::FromRef,
    routing::{get_service, MethodRouter},
    Router,
};
use config::WebConfig;
use database::MemoryDatabase;
use directory::{client::Client, identity::IdentityProvider};
use log::info;
use middleware::{cors::CorsStage, pipeline::Pipeline, rate_limit::RateLimitStage};
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub store_client: Client<MemoryDatabase>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

/// Admission stages in front of the api: origin check first, then rate
/// limiting.
pub fn pipeline(state: &WebState, config: &WebConfig) -> Pipeline {
    let pipeline = if config.allowed_origins.is_empty() {
        Pipeline::new()
    } else {
        Pipeline::new().stage(CorsStage::new(config.allowed_origins.iter().cloned()))
    };
    pipeline.stage(
        RateLimitStage::new(
            state.store_client.clone(),
            state.identity_provider.clone(),
        )
        .trust_proxy(config.trust_proxy),
    )
}

pub fn router(state: WebState, config: &WebConfig) -> Router {
    let pipeline = pipeline(&state, config);
    Router::new()
        .nest_service("/api", api::routes(state, pipeline))
        .fallback_service(static_content(&config.static_dir))
}

pub async fn start_web_server(config: WebConfig, state: WebState) -> std::io::Result<()> {
    let routes = router(state, &config);

    let listener = TcpListener::bind(config.bind_address).await?;
    info!("Listening on {}", config.bind_address);
    axum::serve(
        listener,
        routes.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn static_content(static_dir: &Path) -> MethodRouter {
    get_service(
        ServeDir::new(static_dir)
            .not_found_service(ServeFile::new(static_dir.join("error404.html"))),
    )
}
