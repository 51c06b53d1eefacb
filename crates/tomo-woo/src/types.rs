//! WooCommerce REST payload shapes.
//!
//! Typed mirrors of the store's JSON entities. Everything optional unless the
//! API always sends it; inbound address fields additionally accept camelCase
//! spellings via serde aliases, since webhook middlemen are not consistent
//! about casing. Woo dates come without a timezone suffix and are treated as
//! UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product/order meta-data entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WooMetaData {
    pub key: String,
    pub value: Value,
}

impl WooMetaData {
    /// Create a string-valued entry.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Value::String(value.into()),
        }
    }
}

/// A product or category image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WooImage {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A product-level attribute entry carrying resolved term names as options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WooProductAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub variation: bool,
}

fn default_true() -> bool {
    true
}

/// Reference to a native taxonomy term (category/tag) by external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WooTermRef {
    pub id: i64,
}

/// A store product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Store-side GTIN/EAN/ISBN field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<WooImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<WooProductAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<WooTermRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<WooTermRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta_data: Vec<WooMetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified_gmt: Option<NaiveDateTime>,
}

impl WooProduct {
    /// Modification timestamp in UTC, when the store sent one.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.date_modified_gmt.map(|naive| naive.and_utc())
    }

    /// First meta-data value for a key, as a string.
    #[must_use]
    pub fn meta_text(&self, key: &str) -> Option<String> {
        self.meta_data
            .iter()
            .find(|m| m.key == key)
            .and_then(|m| match &m.value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// Options of a product attribute matched by name, case-insensitively.
    #[must_use]
    pub fn attribute_options(&self, name: &str) -> Vec<String> {
        let wanted = name.to_lowercase();
        self.attributes
            .iter()
            .filter(|a| a.name.to_lowercase() == wanted)
            .flat_map(|a| a.options.iter().cloned())
            .collect()
    }
}

/// A catalog-level attribute definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WooAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<String>,
}

/// A term under a catalog attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooAttributeTerm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified_gmt: Option<NaiveDateTime>,
}

impl WooAttributeTerm {
    /// Modification timestamp in UTC, when the store sent one.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.date_modified_gmt.map(|naive| naive.and_utc())
    }
}

/// A native product category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<WooImage>,
}

/// A native product tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A billing or shipping address in the store's shape.
///
/// Aliases make the inbound path tolerant of camelCase payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WooAddress {
    #[serde(default, alias = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, alias = "address1", skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(default, alias = "address2", skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, alias = "postcode", alias = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A store customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<WooAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<WooAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified_gmt: Option<NaiveDateTime>,
}

/// One order line item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooLineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
}

/// A store order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<WooLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<WooAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<WooAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta_data: Vec<WooMetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified_gmt: Option<NaiveDateTime>,
}

impl WooOrder {
    /// Modification timestamp in UTC, when the store sent one.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.date_modified_gmt.map(|naive| naive.and_utc())
    }
}

/// A store coupon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WooCoupon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expires: Option<NaiveDateTime>,
}
