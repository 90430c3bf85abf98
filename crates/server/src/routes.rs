//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route(handlers::PACKS_PATH, get(handlers::list_packs));

    // The handler parses the raw URI itself so it sees percent-encoding intact
    let view_routes = Router::new()
        .route("/view", get(handlers::view_root))
        .route("/view/", get(handlers::view_root))
        .route("/view/{*rest}", get(handlers::view));

    let mut router = Router::new().merge(api_routes).merge(view_routes);

    // Unauthenticated; restrict at the network level when exposed.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
