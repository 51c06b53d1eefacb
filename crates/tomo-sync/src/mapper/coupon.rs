//! Coupon mapping.

use chrono::{DateTime, Utc};
use tracing::warn;

use tomo_core::Coupon;
use tomo_woo::WooCoupon;

use super::{format_money, parse_money};

/// Discount types the store accepts as-is.
const EXTERNAL_DISCOUNT_TYPES: [&str; 3] = ["percent", "fixed_cart", "fixed_product"];

/// Normalize an internal discount type to one the store accepts.
#[must_use]
pub fn normalize_discount_type(discount_type: &str) -> String {
    let lowered = discount_type.trim().to_lowercase();
    if EXTERNAL_DISCOUNT_TYPES.contains(&lowered.as_str()) {
        return lowered;
    }
    let aliased = match lowered.as_str() {
        "porcentaje" | "percentage" | "%" => Some("percent"),
        "fijo" | "fixed" | "importe" => Some("fixed_cart"),
        "producto" | "por_producto" | "per_product" => Some("fixed_product"),
        _ => None,
    };
    match aliased {
        Some(mapped) => mapped.to_string(),
        None => {
            warn!(
                discount_type,
                "Unrecognized discount type, defaulting to fixed_cart"
            );
            "fixed_cart".to_string()
        }
    }
}

/// Internal coupon to the store shape. `product_ids` are the resolved
/// external product ids of the coupon's scoped books.
#[must_use]
pub fn to_woo(coupon: &Coupon, product_ids: Vec<i64>) -> WooCoupon {
    WooCoupon {
        id: None,
        code: coupon.code.clone(),
        discount_type: Some(normalize_discount_type(&coupon.discount_type)),
        amount: Some(format_money(coupon.amount)),
        product_ids,
        usage_limit: coupon.usage_limit,
        date_expires: coupon.expires_at.map(|at| at.naive_utc()),
    }
}

/// Overlay an inbound store coupon onto the internal record.
pub fn apply_inbound(coupon: &mut Coupon, woo: &WooCoupon) {
    if !woo.code.trim().is_empty() {
        coupon.code = woo.code.trim().to_string();
    }
    if let Some(discount_type) = &woo.discount_type {
        coupon.discount_type = discount_type.clone();
    }
    if woo.amount.is_some() {
        coupon.amount = parse_money(woo.amount.as_deref());
    }
    if woo.usage_limit.is_some() {
        coupon.usage_limit = woo.usage_limit;
    }
    coupon.expires_at = woo
        .date_expires
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .or(coupon.expires_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_type_aliases() {
        assert_eq!(normalize_discount_type("percent"), "percent");
        assert_eq!(normalize_discount_type("Porcentaje"), "percent");
        assert_eq!(normalize_discount_type("fijo"), "fixed_cart");
        assert_eq!(normalize_discount_type("producto"), "fixed_product");
    }

    #[test]
    fn test_unknown_discount_type_defaults() {
        assert_eq!(normalize_discount_type("mystery"), "fixed_cart");
    }

    #[test]
    fn test_to_woo_formats_amount() {
        let coupon = Coupon::new("VERANO10", "porcentaje", 10.0);
        let woo = to_woo(&coupon, vec![1, 2]);
        assert_eq!(woo.discount_type.as_deref(), Some("percent"));
        assert_eq!(woo.amount.as_deref(), Some("10.00"));
        assert_eq!(woo.product_ids, vec![1, 2]);
    }

    #[test]
    fn test_apply_inbound_parses_amount() {
        let mut coupon = Coupon::new("VERANO10", "percent", 10.0);
        let woo = WooCoupon {
            code: "VERANO15".to_string(),
            amount: Some("15.00".to_string()),
            ..Default::default()
        };
        apply_inbound(&mut coupon, &woo);
        assert_eq!(coupon.code, "VERANO15");
        assert_eq!(coupon.amount, 15.0);
    }
}
