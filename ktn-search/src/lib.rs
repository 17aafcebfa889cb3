//! ktn-search library - read-only order search over HTTP

use axum::Router;
use ktn_common::db::OrderStore;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Order store over a read-only pool
    pub store: OrderStore,
}

impl AppState {
    pub fn new(store: OrderStore) -> Self {
        Self { store }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/search", get(api::search_orders))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
