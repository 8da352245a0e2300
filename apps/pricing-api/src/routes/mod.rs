//! # API Routes
//!
//! - `cart` - `POST /api/v1/cart/calculate`
//! - `discounts` - `POST /api/v1/discounts/validate`
//! - `health` - `GET /health`
//!
//! Every response carries `Cache-Control: no-store`: prices depend on the
//! instant of the request.

pub mod cart;
pub mod discounts;
pub mod health;

use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assembles the full router with middleware applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/cart", cart::router())
        .nest("/api/v1/discounts", discounts::router())
        .merge(health::router())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
