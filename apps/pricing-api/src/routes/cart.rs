//! Cart calculation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use quickshop_core::{CalculationResult, CartInput};

use crate::dto::CalculateRequest;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calculate", post(calculate))
}

/// Prices the cart. A code that does not apply is reported in `errors`
/// with status 200.
async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculationResult>, ApiError> {
    let Json(req) = body?;
    let input = CartInput::from(req);
    let result = state.pricing.calculate(&input, Utc::now()).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use quickshop_core::{DiscountKind, DiscountRule, Money, RejectionReason};
    use tower::ServiceExt;

    use super::*;
    use crate::routes;
    use crate::service::testing::FakeLookup;

    const STORE: &str = "store-1";

    fn test_app(lookup: FakeLookup) -> Router {
        routes::router(AppState::new(Arc::new(lookup)))
    }

    fn default_lookup() -> FakeLookup {
        FakeLookup::with_store(STORE)
            .rule(DiscountRule::new(STORE, "SAVE10", DiscountKind::Percentage { bps: 1000 }))
            .rule(DiscountRule::new(STORE, "SHIPFREE", DiscountKind::FreeShipping))
    }

    async fn post_json(app: Router, body: serde_json::Value) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/cart/calculate")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_calculate_applies_percentage_code() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": STORE,
                "discountCode": "save10",
                "items": [{"variantId": "v-1", "quantity": 2, "unitPrice": 5000}],
                "shippingRate": {"carrier": "UPS", "price": 2500}
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");

        let result: CalculationResult = serde_json::from_value(json_body(resp).await).unwrap();
        assert_eq!(result.subtotal, Money::from_minor(10_000));
        assert_eq!(result.discount_amount, Money::from_minor(1000));
        assert_eq!(result.shipping_amount, Money::from_minor(2500));
        assert_eq!(result.total, Money::from_minor(11_500));
        assert_eq!(result.applied_discount_code.as_deref(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn test_calculate_response_is_camel_case() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": STORE,
                "discountCode": "SHIPFREE",
                "items": [{"variantId": "v-1", "quantity": 1, "unitPrice": 3000}],
                "shippingRate": {"carrier": "UPS", "price": 2500}
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["shippingAmount"], 0);
        assert_eq!(body["shippingDiscount"], 2500);
        assert_eq!(body["appliedDiscount"]["discountType"], "free_shipping");
        assert_eq!(body["lines"][0]["lineTotalAfterDiscount"], 3000);
    }

    #[tokio::test]
    async fn test_unknown_code_is_200_with_rejection() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": STORE,
                "discountCode": "NOPE",
                "items": [{"variantId": "v-1", "quantity": 1, "unitPrice": 1999}]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let result: CalculationResult = serde_json::from_value(json_body(resp).await).unwrap();
        assert_eq!(result.total, Money::from_minor(1999));
        assert!(result.applied_discount_code.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "NOPE");
        assert_eq!(result.errors[0].reason, RejectionReason::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_code_is_200_with_rejection() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": STORE,
                "discountCode": "SAVE 10",
                "items": [{"variantId": "v-1", "quantity": 2, "unitPrice": 5000}],
                "shippingRate": {"carrier": "UPS", "price": 2500}
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["subtotal"], 10_000);
        assert_eq!(body["discountAmount"], 0);
        assert_eq!(body["total"], 12_500);
        assert_eq!(body["errors"][0]["code"], "SAVE 10");
        assert_eq!(body["errors"][0]["reason"], "not_found");
    }

    #[tokio::test]
    async fn test_empty_cart_is_400() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({"storeId": STORE, "items": []}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("items"));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_400() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": STORE,
                "items": [{"variantId": "v-1", "quantity": 0, "unitPrice": 1000}]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_store_is_400() {
        let resp = post_json(
            test_app(default_lookup()),
            serde_json::json!({
                "storeId": "ghost",
                "items": [{"variantId": "v-1", "quantity": 1, "unitPrice": 1000}]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["message"], "Store not found: ghost");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/cart/calculate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = test_app(default_lookup()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_lookup_failure_is_503() {
        let resp = post_json(
            test_app(FakeLookup::failing()),
            serde_json::json!({
                "storeId": STORE,
                "items": [{"variantId": "v-1", "quantity": 1, "unitPrice": 1000}]
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(resp).await["error"]["code"], "LOOKUP_FAILURE");
    }
}
