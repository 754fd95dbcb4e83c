pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::state::AppState;
use self::middleware::auth;
use self::routes::{ads, health, users};

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v2/users/who", get(users::who_handler))
        .route("/api/v2/users/who_list", get(users::who_list_handler))
        .route("/api/v2/ads/map", get(ads::ads_map_handler))
        .route("/api/v2/ads", get(ads::ads_list_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(protected_routes)
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
