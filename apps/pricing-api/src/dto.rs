//! Request bodies for the pricing endpoints.
//!
//! The storefront sends customer attributes as flat fields next to the cart;
//! they are folded into a [`CustomerContext`] here.

use serde::{Deserialize, Serialize};

use quickshop_core::{CartInput, CustomerContext, CustomerSegment, LineItem, Money, ShippingRate};

/// `POST /api/v1/cart/calculate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub shipping_rate: Option<ShippingRate>,
    #[serde(flatten)]
    pub customer: CustomerFields,
}

impl From<CalculateRequest> for CartInput {
    fn from(req: CalculateRequest) -> Self {
        CartInput {
            store_id: req.store_id,
            items: req.items,
            discount_code: req.discount_code,
            shipping_rate: req.shipping_rate,
            customer: req.customer.into_context(),
        }
    }
}

/// `POST /api/v1/discounts/validate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeRequest {
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(flatten)]
    pub customer: CustomerFields,
}

/// Optional shopper attributes as they appear on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_segment: Option<CustomerSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_orders_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_lifetime_value: Option<Money>,
}

impl CustomerFields {
    /// `None` when the request carried no customer attribute at all.
    pub fn into_context(self) -> Option<CustomerContext> {
        if self.customer_id.is_none()
            && self.customer_segment.is_none()
            && self.customer_orders_count.is_none()
            && self.customer_lifetime_value.is_none()
        {
            return None;
        }

        Some(CustomerContext {
            id: self.customer_id,
            segment: self.customer_segment,
            orders_count: self.customer_orders_count.unwrap_or(0),
            lifetime_value: self.customer_lifetime_value.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_request_from_storefront_json() {
        let req: CalculateRequest = serde_json::from_value(serde_json::json!({
            "storeId": "store-1",
            "items": [
                {"variantId": "v-1", "productId": "p-1", "quantity": 2, "unitPrice": 1250, "tags": ["sale"]}
            ],
            "discountCode": "save10",
            "shippingRate": {"carrier": "UPS", "price": 799, "freeShippingThreshold": 5000},
            "customerSegment": "vip",
            "customerOrdersCount": 3
        }))
        .unwrap();

        let input = CartInput::from(req);
        assert_eq!(input.store_id, "store-1");
        assert_eq!(input.items[0].product_id.as_deref(), Some("p-1"));
        assert_eq!(input.items[0].tags, vec!["sale".to_string()]);
        assert_eq!(input.discount_code.as_deref(), Some("save10"));
        assert_eq!(
            input.shipping_rate.unwrap().free_shipping_threshold,
            Some(Money::from_minor(5000))
        );

        let customer = input.customer.unwrap();
        assert_eq!(customer.segment, Some(CustomerSegment::Vip));
        assert_eq!(customer.orders_count, 3);
        assert_eq!(customer.lifetime_value, Money::zero());
    }

    #[test]
    fn test_no_customer_fields_means_no_context() {
        let req: CalculateRequest = serde_json::from_value(serde_json::json!({
            "storeId": "store-1",
            "items": []
        }))
        .unwrap();
        assert!(CartInput::from(req).customer.is_none());
    }

    #[test]
    fn test_unknown_segment_rejected() {
        let parsed: Result<ValidateCodeRequest, _> = serde_json::from_value(serde_json::json!({
            "storeId": "store-1",
            "code": "X",
            "subtotal": 100,
            "customerSegment": "platinum"
        }));
        assert!(parsed.is_err());
    }
}
