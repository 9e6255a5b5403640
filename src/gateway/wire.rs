//! Wire Types
//!
//! Request and response bodies of the storefront cart API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    coupons::{Coupon, CouponKind, CouponValidation},
    lines::{CartLine, LineId, PriceSnapshot, ProductSummary, VariantId},
};

const REQUIRED_FIELD_MARKER: &str = "field is required";

const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteCart {
    #[serde(default)]
    pub(crate) items: Vec<RemoteCartItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteCartItem {
    id: u64,
    quantity: u32,
    product_variant: RemoteVariant,
    #[serde(default)]
    product: Option<RemoteProduct>,
}

#[derive(Debug, Deserialize)]
struct RemoteVariant {
    id: u64,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    discount_price: Option<Decimal>,
    #[serde(default)]
    is_discount_active: bool,
    #[serde(default)]
    stock: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RemoteProduct {
    #[serde(default)]
    name: Option<String>,
}

impl From<RemoteCartItem> for CartLine {
    fn from(item: RemoteCartItem) -> Self {
        let variant = item.product_variant;

        let price = PriceSnapshot {
            list_price: variant.price,
            discount_price: variant.discount_price,
            discount_active: variant.is_discount_active,
            stock: variant.stock,
        };

        let summary = ProductSummary {
            name: item.product.and_then(|product| product.name),
            size: variant.size,
        };

        let line = CartLine::new(
            LineId::Remote(item.id),
            VariantId::new(variant.id),
            item.quantity,
            price,
        );

        if summary.name.is_none() && summary.size.is_none() {
            line
        } else {
            line.with_product(summary)
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AddItemRequest {
    pub(crate) product_variant_id: u64,
    pub(crate) quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateItemRequest {
    pub(crate) quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateCouponRequest<'a> {
    pub(crate) coupon: &'a str,
    pub(crate) cart_total: Decimal,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DiscountType {
    Percent,
    Flat,
}

#[derive(Debug, Deserialize)]
struct RemoteCoupon {
    code: String,
    discount_type: DiscountType,
    discount_value: Decimal,
    #[serde(default)]
    max_discount: Option<Decimal>,
    #[serde(default)]
    min_purchase_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateCouponResponse {
    coupon: RemoteCoupon,
    #[serde(default)]
    discount: Option<Decimal>,
    #[serde(default)]
    final_total: Option<Decimal>,
}

impl From<ValidateCouponResponse> for CouponValidation {
    fn from(response: ValidateCouponResponse) -> Self {
        let remote = response.coupon;

        let kind = match remote.discount_type {
            DiscountType::Percent => CouponKind::Percentage,
            DiscountType::Flat => CouponKind::FixedAmount,
        };

        let mut coupon = Coupon::new(remote.code, kind, remote.discount_value);

        if let Some(max_discount) = remote.max_discount {
            coupon = coupon.with_max_discount(max_discount);
        }

        if let Some(min_purchase) = remote.min_purchase_amount.filter(|min| !min.is_zero()) {
            coupon = coupon.with_min_purchase(min_purchase);
        }

        Self {
            coupon,
            discount: response.discount,
            final_total: response.final_total,
        }
    }
}

/// Pick a user-facing message out of a validation error body.
///
/// Required-field errors win, then `non_field_errors`, then the first message of any other
/// field, then the `error`, `message` and `code` strings.
pub(crate) fn rejection_message(body: &Value) -> Option<String> {
    let fields = body.as_object()?;

    let first_message = |messages: &Value| -> Option<String> {
        messages
            .as_array()?
            .iter()
            .find_map(Value::as_str)
            .map(str::to_string)
    };

    for (field, messages) in fields {
        let required = messages.as_array().is_some_and(|messages| {
            messages
                .iter()
                .filter_map(Value::as_str)
                .any(|message| message.contains(REQUIRED_FIELD_MARKER))
        });

        if required {
            return Some(format!("{} is required", capitalize(field)));
        }
    }

    if let Some(message) = fields.get(NON_FIELD_ERRORS).and_then(first_message) {
        return Some(message);
    }

    if let Some(message) = fields.values().find_map(first_message) {
        return Some(message);
    }

    ["error", "message", "code"]
        .into_iter()
        .find_map(|key| fields.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
