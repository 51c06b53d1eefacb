//! Order mapping.
//!
//! Internal order statuses are free-form; the store only accepts a fixed
//! enum. Unknown statuses are folded through an alias table and anything
//! still unrecognized falls back to `pending` with a warning, never an
//! error.

use tracing::warn;

use tomo_core::{BookId, Order, OrderLine, OrderTotals};
use tomo_woo::{WooLineItem, WooOrder};

use super::{address, format_money, parse_money, parse_money_value};

/// Statuses the store accepts as-is.
const EXTERNAL_STATUSES: [&str; 8] = [
    "pending",
    "processing",
    "on-hold",
    "completed",
    "cancelled",
    "refunded",
    "failed",
    "trash",
];

/// Normalize an internal status to one the store accepts.
#[must_use]
pub fn normalize_status(status: &str) -> String {
    let lowered = status.trim().to_lowercase();
    if EXTERNAL_STATUSES.contains(&lowered.as_str()) {
        return lowered;
    }
    let aliased = match lowered.as_str() {
        "draft" | "borrador" | "new" | "nuevo" => Some("pending"),
        "paid" | "pagado" | "in-progress" | "preparando" => Some("processing"),
        "hold" | "retenido" | "espera" => Some("on-hold"),
        "done" | "shipped" | "enviado" | "entregado" | "completado" => Some("completed"),
        "canceled" | "cancelado" | "anulado" => Some("cancelled"),
        "refund" | "reembolsado" | "devuelto" => Some("refunded"),
        "error" | "fallido" => Some("failed"),
        _ => None,
    };
    match aliased {
        Some(mapped) => mapped.to_string(),
        None => {
            warn!(status, "Unrecognized order status, defaulting to pending");
            "pending".to_string()
        }
    }
}

/// One internal line to the store shape. `product_id` is the resolved
/// external product id.
#[must_use]
pub fn line_to_woo(line: &OrderLine, product_id: i64) -> WooLineItem {
    WooLineItem {
        id: None,
        product_id: Some(product_id),
        name: line.name.clone(),
        sku: line.sku.clone(),
        quantity: line.quantity,
        price: None,
        subtotal: Some(format_money(line.unit_price * f64::from(line.quantity))),
        total: Some(format_money(line.total)),
    }
}

/// One store line to the internal shape. `book` is the resolved internal
/// reference, when one was found.
#[must_use]
pub fn line_from_woo(item: &WooLineItem, book: Option<BookId>) -> OrderLine {
    let quantity = item.quantity.max(1);
    let total = parse_money(item.total.as_deref());
    let unit_price = match parse_money_value(item.price.as_ref()) {
        price if price > 0.0 => price,
        _ => total / f64::from(quantity),
    };
    OrderLine {
        book,
        external_product_id: item.product_id,
        sku: item.sku.clone(),
        name: item.name.clone(),
        quantity,
        unit_price,
        total,
    }
}

/// Internal order to the store shape. Line items and the customer id are
/// resolved by the orchestrator and passed in.
#[must_use]
pub fn to_woo(order: &Order, customer_id: Option<i64>, line_items: Vec<WooLineItem>) -> WooOrder {
    WooOrder {
        id: None,
        number: Some(order.number.clone()),
        status: normalize_status(&order.status),
        currency: order.currency.clone(),
        payment_method: order.payment_method.clone(),
        customer_id,
        line_items,
        billing: order.billing.as_ref().map(address::to_woo),
        shipping: order.shipping.as_ref().map(address::to_woo),
        discount_total: Some(format_money(order.totals.discount)),
        shipping_total: Some(format_money(order.totals.shipping)),
        total_tax: Some(format_money(order.totals.tax)),
        total: Some(format_money(order.totals.total)),
        meta_data: Vec::new(),
        date_modified_gmt: None,
    }
}

/// Overlay an inbound store order onto the internal record. Resolved lines
/// are produced by the orchestrator via [`line_from_woo`].
pub fn apply_inbound(order: &mut Order, woo: &WooOrder, lines: Vec<OrderLine>) {
    if let Some(number) = &woo.number {
        if !number.trim().is_empty() {
            order.number = number.trim().to_string();
        }
    }
    if !woo.status.trim().is_empty() {
        order.status = woo.status.trim().to_string();
    }
    if woo.currency.is_some() {
        order.currency = woo.currency.clone();
    }
    if woo.payment_method.is_some() {
        order.payment_method = woo.payment_method.clone();
    }

    let tax = parse_money(woo.total_tax.as_deref());
    let shipping = parse_money(woo.shipping_total.as_deref());
    let discount = parse_money(woo.discount_total.as_deref());
    let total = parse_money(woo.total.as_deref());
    // The store does not echo a subtotal; reconstruct it from the parts.
    let subtotal = total + discount - shipping - tax;
    order.totals = OrderTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total,
    };

    if let Some(billing) = &woo.billing {
        order.billing = Some(address::from_woo(billing));
    }
    if let Some(shipping) = &woo.shipping {
        order.shipping = Some(address::from_woo(shipping));
    }
    order.lines = lines;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_statuses_pass_through() {
        assert_eq!(normalize_status("processing"), "processing");
        assert_eq!(normalize_status("  Completed "), "completed");
    }

    #[test]
    fn test_aliased_statuses_map() {
        assert_eq!(normalize_status("draft"), "pending");
        assert_eq!(normalize_status("enviado"), "completed");
        assert_eq!(normalize_status("pagado"), "processing");
        assert_eq!(normalize_status("anulado"), "cancelled");
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        assert_eq!(normalize_status("quantum"), "pending");
    }

    #[test]
    fn test_line_round_trip_money() {
        let line = OrderLine {
            book: None,
            external_product_id: None,
            sku: Some("9788412345678".to_string()),
            name: "El Quijote".to_string(),
            quantity: 3,
            unit_price: 9.5,
            total: 28.5,
        };
        let woo = line_to_woo(&line, 77);
        assert_eq!(woo.product_id, Some(77));
        assert_eq!(woo.subtotal.as_deref(), Some("28.50"));
        assert_eq!(woo.total.as_deref(), Some("28.50"));
    }

    #[test]
    fn test_line_from_woo_derives_unit_price_from_total() {
        let item = WooLineItem {
            product_id: Some(5),
            name: "Rayuela".to_string(),
            quantity: 2,
            total: Some("19.00".to_string()),
            ..Default::default()
        };
        let line = line_from_woo(&item, None);
        assert_eq!(line.unit_price, 9.5);
        assert_eq!(line.total, 19.0);
    }

    #[test]
    fn test_line_from_woo_prefers_explicit_price() {
        let item = WooLineItem {
            quantity: 2,
            price: Some(json!("10.00")),
            total: Some("18.00".to_string()),
            ..Default::default()
        };
        let line = line_from_woo(&item, None);
        assert_eq!(line.unit_price, 10.0);
    }

    #[test]
    fn test_apply_inbound_reconstructs_subtotal() {
        let mut order = Order::new("TOMO-1001", "pending");
        let woo = WooOrder {
            status: "processing".to_string(),
            total: Some("25.00".to_string()),
            total_tax: Some("2.00".to_string()),
            shipping_total: Some("3.00".to_string()),
            discount_total: Some("1.00".to_string()),
            ..Default::default()
        };
        apply_inbound(&mut order, &woo, Vec::new());
        assert_eq!(order.status, "processing");
        assert_eq!(order.totals.subtotal, 21.0);
        assert_eq!(order.totals.total, 25.0);
    }
}
