//! Internal catalog entities.
//!
//! These are the shapes the sync engine reads from and annotates in the
//! entity store. The engine never owns their lifecycle beyond writing back
//! external ids and raw payload snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{BookId, CouponId, CustomerId, OrderId, PersonId, TermId};
use crate::platform::{ExternalIds, Platform};
use crate::richtext::RichBlock;

/// Stock status, matching the external platform's closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    /// External string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "instock",
            StockStatus::OutOfStock => "outofstock",
            StockStatus::OnBackorder => "onbackorder",
        }
    }

    /// Parse the external representation, defaulting to in-stock.
    #[must_use]
    pub fn from_external(s: &str) -> Self {
        match s {
            "outofstock" => StockStatus::OutOfStock,
            "onbackorder" => StockStatus::OnBackorder,
            _ => StockStatus::InStock,
        }
    }
}

/// A product or term image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Taxonomy kinds shared between the catalog and the external stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    Author,
    Publisher,
    Imprint,
    Collection,
    Work,
    Category,
    Tag,
    Brand,
}

impl TaxonomyKind {
    /// All taxonomy kinds.
    pub const ALL: [TaxonomyKind; 8] = [
        TaxonomyKind::Author,
        TaxonomyKind::Publisher,
        TaxonomyKind::Imprint,
        TaxonomyKind::Collection,
        TaxonomyKind::Work,
        TaxonomyKind::Category,
        TaxonomyKind::Tag,
        TaxonomyKind::Brand,
    ];

    /// Lowercase identifier used in logs and cache keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Author => "author",
            TaxonomyKind::Publisher => "publisher",
            TaxonomyKind::Imprint => "imprint",
            TaxonomyKind::Collection => "collection",
            TaxonomyKind::Work => "work",
            TaxonomyKind::Category => "category",
            TaxonomyKind::Tag => "tag",
            TaxonomyKind::Brand => "brand",
        }
    }

    /// External attribute (name, slug) for kinds realized through the
    /// generic product-attribute mechanism. Categories and tags are native
    /// external taxonomies and return `None`.
    #[must_use]
    pub fn attribute(&self) -> Option<(&'static str, &'static str)> {
        match self {
            TaxonomyKind::Author => Some(("Autor", "autor")),
            TaxonomyKind::Publisher => Some(("Editorial", "editorial")),
            TaxonomyKind::Imprint => Some(("Sello", "sello")),
            TaxonomyKind::Collection => Some(("Colección", "coleccion")),
            TaxonomyKind::Work => Some(("Obra", "obra")),
            TaxonomyKind::Brand => Some(("Marca", "marca")),
            TaxonomyKind::Category | TaxonomyKind::Tag => None,
        }
    }

    /// Whether this kind maps to a native external taxonomy.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, TaxonomyKind::Category | TaxonomyKind::Tag)
    }
}

impl std::fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A taxonomy term (author, publisher, imprint, collection, work, category,
/// tag or brand) in the internal catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: TermId,
    pub kind: TaxonomyKind,
    /// Canonical natural-language name.
    pub name: String,
    /// Rich-text description; flattened to plain text for the external side.
    #[serde(default)]
    pub description: Vec<RichBlock>,
    /// Author-only split name parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_last_name: Option<String>,
    /// Legacy sequential id carried by some kinds; back-filled on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_seq: Option<i64>,
    /// Parent term (categories only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    /// Legacy singular id mirroring the primary platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woo_id: Option<i64>,
    /// Last-seen external payload, verbatim (audit trail only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxonomyTerm {
    /// Create a term with only the required fields populated.
    pub fn new(kind: TaxonomyKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TermId::new(),
            kind,
            name: name.into(),
            description: Vec::new(),
            first_name: None,
            last_name: None,
            second_last_name: None,
            legacy_seq: None,
            parent: None,
            image: None,
            external_ids: ExternalIds::new(),
            woo_id: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a platform's external id, keeping the legacy mirror consistent.
    pub fn record_external_id(&mut self, platform: Platform, external_id: i64) {
        self.external_ids.set(platform, external_id);
        self.woo_id = self.external_ids.legacy_primary();
    }

    /// Forget a platform's external id, keeping the legacy mirror consistent.
    pub fn clear_external_id(&mut self, platform: Platform) {
        self.external_ids.clear(platform);
        self.woo_id = self.external_ids.legacy_primary();
    }

    /// Stable identity for external slugs and cache keys.
    #[must_use]
    pub fn stable_id(&self) -> String {
        self.id.as_simple()
    }
}

/// A book (the catalog's product).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
    #[serde(default)]
    pub description: Vec<RichBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub manage_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imprint: Option<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<TermId>,
    #[serde(default)]
    pub brands: Vec<TermId>,
    #[serde(default)]
    pub tags: Vec<TermId>,
    #[serde(default)]
    pub categories: Vec<TermId>,
    #[serde(default)]
    pub related: Vec<BookId>,
    /// Channels decide which platforms this book may be pushed to.
    #[serde(default)]
    pub channels: Vec<Platform>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Create a book with only the required fields populated.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BookId::new(),
            title: title.into(),
            isbn: None,
            ean: None,
            description: Vec::new(),
            short_description: None,
            stock_quantity: None,
            stock_status: StockStatus::default(),
            manage_stock: false,
            regular_price: None,
            sale_price: None,
            images: Vec::new(),
            edition_year: None,
            language: None,
            book_type: None,
            edition_status: None,
            author: None,
            publisher: None,
            imprint: None,
            collection: None,
            work: None,
            brands: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            related: Vec::new(),
            channels: Vec::new(),
            external_ids: ExternalIds::new(),
            woo_id: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// SKU sent to the external store: ISBN, else EAN, else a generated
    /// fallback derived from the stable id.
    #[must_use]
    pub fn sku(&self) -> String {
        if let Some(isbn) = self.isbn.as_deref().filter(|s| !s.trim().is_empty()) {
            return isbn.trim().to_string();
        }
        if let Some(ean) = self.ean.as_deref().filter(|s| !s.trim().is_empty()) {
            return ean.trim().to_string();
        }
        format!("TOMO-{}", &self.id.as_simple()[..12])
    }

    /// Whether this book may be pushed to the given platform.
    #[must_use]
    pub fn is_eligible_for(&self, platform: Platform) -> bool {
        self.channels.contains(&platform)
    }

    /// Record a platform's external id, keeping the legacy mirror consistent.
    pub fn record_external_id(&mut self, platform: Platform, external_id: i64) {
        self.external_ids.set(platform, external_id);
        self.woo_id = self.external_ids.legacy_primary();
    }

    /// Forget a platform's external id, keeping the legacy mirror consistent.
    pub fn clear_external_id(&mut self, platform: Platform) {
        self.external_ids.clear(platform);
        self.woo_id = self.external_ids.legacy_primary();
    }

    /// Stable identity for external slugs and cache keys.
    #[must_use]
    pub fn stable_id(&self) -> String {
        self.id.as_simple()
    }
}

/// A billing or shipping address in the internal shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    /// Required natural key for matching across systems.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Address>,
    /// Linked person record, deduplicated by national id or email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<PersonId>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create a customer with the required email and nothing else.
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CustomerId::new(),
            email: email.into(),
            first_name: None,
            last_name: None,
            billing: None,
            shipping: None,
            person: None,
            external_ids: ExternalIds::new(),
            woo_id: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a platform's external id, keeping the legacy mirror consistent.
    pub fn record_external_id(&mut self, platform: Platform, external_id: i64) {
        self.external_ids.set(platform, external_id);
        self.woo_id = self.external_ids.legacy_primary();
    }
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Referenced catalog book, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookId>,
    /// Explicit external product id, when the line came from the platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_product_id: Option<i64>,
    /// SKU snapshot taken when the line was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

/// Order totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discount: f64,
    pub total: f64,
}

/// An order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// External-stable order number; the natural key.
    pub number: String,
    /// Internal status, free-form; normalized on the way out.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub totals: OrderTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerId>,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Address>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an order with the required number and status.
    pub fn new(number: impl Into<String>, status: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            number: number.into(),
            status: status.into(),
            currency: None,
            payment_method: None,
            totals: OrderTotals::default(),
            customer: None,
            lines: Vec::new(),
            billing: None,
            shipping: None,
            external_ids: ExternalIds::new(),
            woo_id: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a platform's external id, keeping the legacy mirror consistent.
    pub fn record_external_id(&mut self, platform: Platform, external_id: i64) {
        self.external_ids.set(platform, external_id);
        self.woo_id = self.external_ids.legacy_primary();
    }
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Coupon code; the natural key.
    pub code: String,
    /// Internal discount type, free-form; normalized on the way out.
    pub discount_type: String,
    pub amount: f64,
    #[serde(default)]
    pub product_ids: Vec<BookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub woo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Create a coupon with the required code.
    pub fn new(code: impl Into<String>, discount_type: impl Into<String>, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: CouponId::new(),
            code: code.into(),
            discount_type: discount_type.into(),
            amount,
            product_ids: Vec::new(),
            usage_limit: None,
            expires_at: None,
            external_ids: ExternalIds::new(),
            woo_id: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a platform's external id, keeping the legacy mirror consistent.
    pub fn record_external_id(&mut self, platform: Platform, external_id: i64) {
        self.external_ids.set(platform, external_id);
        self.woo_id = self.external_ids.legacy_primary();
    }
}

/// A person record, deduplicated by national id or email and linked
/// opportunistically to customers created from inbound orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    /// Create a person record.
    pub fn new(full_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PersonId::new(),
            full_name: full_name.into(),
            national_id: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_sku_prefers_isbn() {
        let mut book = Book::new("Test");
        book.isbn = Some("9780000000001".to_string());
        book.ean = Some("1111111111111".to_string());
        assert_eq!(book.sku(), "9780000000001");
    }

    #[test]
    fn test_book_sku_falls_back_to_ean() {
        let mut book = Book::new("Test");
        book.ean = Some("1111111111111".to_string());
        assert_eq!(book.sku(), "1111111111111");
    }

    #[test]
    fn test_book_sku_generated_fallback() {
        let book = Book::new("Test");
        let sku = book.sku();
        assert!(sku.starts_with("TOMO-"));
        assert_eq!(sku.len(), "TOMO-".len() + 12);
    }

    #[test]
    fn test_book_sku_ignores_blank_isbn() {
        let mut book = Book::new("Test");
        book.isbn = Some("   ".to_string());
        book.ean = Some("1234567890123".to_string());
        assert_eq!(book.sku(), "1234567890123");
    }

    #[test]
    fn test_channel_eligibility() {
        let mut book = Book::new("Test");
        assert!(!book.is_eligible_for(Platform::Es));
        book.channels.push(Platform::Es);
        assert!(book.is_eligible_for(Platform::Es));
        assert!(!book.is_eligible_for(Platform::Mx));
    }

    #[test]
    fn test_record_external_id_mirrors_legacy() {
        let mut book = Book::new("Test");
        book.record_external_id(Platform::Mx, 42);
        assert_eq!(book.woo_id, None);
        book.record_external_id(Platform::Es, 555);
        assert_eq!(book.woo_id, Some(555));
        book.clear_external_id(Platform::Es);
        assert_eq!(book.woo_id, None);
        assert_eq!(book.external_ids.get(Platform::Mx), Some(42));
    }

    #[test]
    fn test_taxonomy_kind_attribute_mapping() {
        assert_eq!(TaxonomyKind::Author.attribute(), Some(("Autor", "autor")));
        assert_eq!(TaxonomyKind::Category.attribute(), None);
        assert!(TaxonomyKind::Category.is_native());
        assert!(!TaxonomyKind::Work.is_native());
    }

    #[test]
    fn test_term_stable_id_is_slug_safe() {
        let term = TaxonomyTerm::new(TaxonomyKind::Author, "Borges");
        let stable = term.stable_id();
        assert_eq!(stable.len(), 32);
        assert!(stable.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stock_status_external_roundtrip() {
        for status in [
            StockStatus::InStock,
            StockStatus::OutOfStock,
            StockStatus::OnBackorder,
        ] {
            assert_eq!(StockStatus::from_external(status.as_str()), status);
        }
        assert_eq!(StockStatus::from_external("weird"), StockStatus::InStock);
    }
}
