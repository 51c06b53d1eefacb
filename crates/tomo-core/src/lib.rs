//! # tomo-core
//!
//! Shared domain model for the tomo catalog sync engine.
//!
//! This crate holds the internal shapes shared by every other crate:
//!
//! - [`ids`] - strongly typed entity identifiers
//! - [`platform`] - store platform keys and the per-entity external-id map
//! - [`model`] - catalog entities (books, customers, orders, coupons, terms)
//! - [`richtext`] - rich-text block flattening and HTML stripping

pub mod ids;
pub mod model;
pub mod platform;
pub mod richtext;

pub use ids::{BookId, CouponId, CustomerId, OrderId, ParseIdError, PersonId, TermId};
pub use model::{
    Address, Book, Coupon, Customer, Image, Order, OrderLine, OrderTotals, Person, StockStatus,
    TaxonomyKind, TaxonomyTerm,
};
pub use platform::{ExternalIds, Platform};
pub use richtext::{blocks_from_html, from_plain_text, strip_html, to_plain_text, RichBlock};
