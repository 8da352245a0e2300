//! Discount code pre-check endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use quickshop_core::DiscountCheck;

use crate::dto::ValidateCodeRequest;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_code))
}

async fn validate_code(
    State(state): State<AppState>,
    body: Result<Json<ValidateCodeRequest>, JsonRejection>,
) -> Result<Json<DiscountCheck>, ApiError> {
    let Json(req) = body?;
    let customer = req.customer.into_context();
    let check = state
        .pricing
        .validate_code(&req.store_id, &req.code, req.subtotal, customer.as_ref(), Utc::now())
        .await?;
    Ok(Json(check))
}
