//! Product mapping.

use tomo_core::{richtext, Book, StockStatus, TaxonomyKind};
use tomo_woo::{WooImage, WooMetaData, WooProduct, WooProductAttribute, WooTermRef};

use super::{format_money, parse_money, term};

/// Meta-data keys carrying catalog provenance on the store side.
pub const META_ISBN: &str = "_isbn";
pub const META_EAN: &str = "_ean";
pub const META_EDITION_YEAR: &str = "_edition_year";

/// Minimum length for a bare SKU to count as a catalog identifier.
const MIN_IDENTIFIER_SKU_LEN: usize = 10;

/// Relation data resolved by the orchestrator before mapping.
#[derive(Debug, Clone, Default)]
pub struct ProductRelations {
    /// Product attributes with resolved term names as options.
    pub attributes: Vec<WooProductAttribute>,
    /// External ids of resolved categories.
    pub categories: Vec<WooTermRef>,
    /// External ids of resolved tags.
    pub tags: Vec<WooTermRef>,
}

/// Internal book to the store product shape.
#[must_use]
pub fn to_woo(book: &Book, relations: ProductRelations) -> WooProduct {
    let mut meta_data = Vec::new();
    if let Some(isbn) = &book.isbn {
        meta_data.push(WooMetaData::text(META_ISBN, isbn));
    }
    if let Some(ean) = &book.ean {
        meta_data.push(WooMetaData::text(META_EAN, ean));
    }
    if let Some(year) = book.edition_year {
        meta_data.push(WooMetaData::text(META_EDITION_YEAR, year.to_string()));
    }

    WooProduct {
        id: None,
        name: book.title.clone(),
        sku: Some(book.sku()),
        global_unique_id: book.ean.clone().or_else(|| book.isbn.clone()),
        description: Some(richtext::to_plain_text(&book.description)),
        short_description: book.short_description.clone(),
        regular_price: book.regular_price.map(format_money),
        sale_price: book.sale_price.map(format_money),
        manage_stock: Some(book.manage_stock),
        stock_quantity: book.stock_quantity,
        stock_status: Some(book.stock_status.as_str().to_string()),
        images: book
            .images
            .iter()
            .map(|image| WooImage {
                src: image.src.clone(),
                alt: image.alt.clone(),
            })
            .collect(),
        attributes: relations.attributes,
        categories: relations.categories,
        tags: relations.tags,
        meta_data,
        date_modified_gmt: None,
    }
}

/// Whether a string looks like an ISBN/EAN once separators are removed.
#[must_use]
pub fn looks_like_isbn(raw: &str) -> bool {
    let digits: String = raw.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    (12..=14).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// Extract the catalog identifier from a store product.
///
/// Precedence: explicit ISBN meta, then an ISBN-shaped global unique id,
/// then a sufficiently long SKU.
#[must_use]
pub fn extract_identifier(woo: &WooProduct) -> Option<String> {
    if let Some(isbn) = woo.meta_text(META_ISBN) {
        return Some(isbn);
    }
    if let Some(gid) = woo.global_unique_id.as_deref() {
        if looks_like_isbn(gid) {
            return Some(gid.trim().to_string());
        }
    }
    match woo.sku.as_deref().map(str::trim) {
        Some(sku) if sku.len() >= MIN_IDENTIFIER_SKU_LEN => Some(sku.to_string()),
        _ => None,
    }
}

/// Overlay an inbound store product onto the internal record. Taxonomy
/// relations are resolved separately by the orchestrator.
pub fn apply_inbound(book: &mut Book, woo: &WooProduct) {
    if !woo.name.trim().is_empty() {
        book.title = woo.name.trim().to_string();
    }
    if let Some(description) = woo.description.as_deref() {
        book.description = richtext::blocks_from_html(description);
    }
    if let Some(short) = woo.short_description.as_deref() {
        let stripped = richtext::strip_html(short);
        book.short_description = if stripped.is_empty() {
            None
        } else {
            Some(stripped)
        };
    }

    if woo.regular_price.as_deref().is_some_and(|p| !p.trim().is_empty()) {
        book.regular_price = Some(parse_money(woo.regular_price.as_deref()));
    }
    if woo.sale_price.as_deref().is_some_and(|p| !p.trim().is_empty()) {
        book.sale_price = Some(parse_money(woo.sale_price.as_deref()));
    }

    if let Some(manage) = woo.manage_stock {
        book.manage_stock = manage;
    }
    if woo.stock_quantity.is_some() {
        book.stock_quantity = woo.stock_quantity;
    }
    if let Some(status) = woo.stock_status.as_deref() {
        book.stock_status = StockStatus::from_external(status);
    }

    if !woo.images.is_empty() {
        book.images = woo
            .images
            .iter()
            .map(|image| tomo_core::Image {
                src: image.src.clone(),
                alt: image.alt.clone(),
            })
            .collect();
    }

    if let Some(identifier) = extract_identifier(woo) {
        if looks_like_isbn(&identifier) {
            book.isbn = Some(identifier);
        }
    }
    if let Some(ean) = woo.meta_text(META_EAN) {
        book.ean = Some(ean);
    }
    if let Some(year) = woo.meta_text(META_EDITION_YEAR) {
        if let Ok(year) = year.parse() {
            book.edition_year = Some(year);
        }
    }
}

/// Attribute term names present on a store product, keyed by the taxonomy
/// kind their attribute name resolves to. Unknown attributes are skipped.
#[must_use]
pub fn inbound_attribute_names(woo: &WooProduct) -> Vec<(TaxonomyKind, String)> {
    let mut names = Vec::new();
    for attribute in &woo.attributes {
        if let Some(kind) = term::kind_for_attribute_name(&attribute.name) {
            for option in &attribute.options {
                let trimmed = option.trim();
                if !trimmed.is_empty() {
                    names.push((kind, trimmed.to_string()));
                }
            }
        }
    }
    names
}
