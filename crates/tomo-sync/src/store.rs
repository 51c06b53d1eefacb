//! Entity store abstraction.
//!
//! The sync engine never talks to a database directly; it goes through
//! [`EntityStore`]. Writes carry a [`SaveMode`] so persistence done *by* the
//! sync engine (recording an external id, ingesting an inbound payload) can
//! be marked skip-sync and not trigger another outbound push.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use tomo_core::{
    Book, BookId, Coupon, CouponId, Customer, CustomerId, Order, OrderId, Person, PersonId,
    Platform, TaxonomyKind, TaxonomyTerm, TermId,
};

use crate::error::{SyncError, SyncResult};

/// How a write should be treated by downstream change listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// A normal write; change listeners may react to it.
    Normal,
    /// A write made by the sync engine itself; must not re-trigger sync.
    SkipSync,
}

impl SaveMode {
    /// Whether this write is flagged to bypass sync triggers.
    #[must_use]
    pub fn skips_sync(self) -> bool {
        matches!(self, Self::SkipSync)
    }
}

/// Persistence seam for every entity the engine reads or writes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Books
    async fn get_book(&self, id: BookId) -> SyncResult<Option<Book>>;
    /// Find by catalog identifier: ISBN, EAN or derived SKU.
    async fn find_book_by_sku(&self, sku: &str) -> SyncResult<Option<Book>>;
    async fn find_book_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Book>>;
    async fn create_book(&self, book: &Book, mode: SaveMode) -> SyncResult<()>;
    async fn update_book(&self, book: &Book, mode: SaveMode) -> SyncResult<()>;

    // Customers
    async fn get_customer(&self, id: CustomerId) -> SyncResult<Option<Customer>>;
    async fn find_customer_by_email(&self, email: &str) -> SyncResult<Option<Customer>>;
    async fn find_customer_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Customer>>;
    async fn create_customer(&self, customer: &Customer, mode: SaveMode) -> SyncResult<()>;
    async fn update_customer(&self, customer: &Customer, mode: SaveMode) -> SyncResult<()>;

    // Orders
    async fn get_order(&self, id: OrderId) -> SyncResult<Option<Order>>;
    async fn find_order_by_number(&self, number: &str) -> SyncResult<Option<Order>>;
    async fn find_order_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Order>>;
    async fn create_order(&self, order: &Order, mode: SaveMode) -> SyncResult<()>;
    async fn update_order(&self, order: &Order, mode: SaveMode) -> SyncResult<()>;

    // Coupons
    async fn get_coupon(&self, id: CouponId) -> SyncResult<Option<Coupon>>;
    async fn find_coupon_by_code(&self, code: &str) -> SyncResult<Option<Coupon>>;
    async fn find_coupon_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Coupon>>;
    async fn create_coupon(&self, coupon: &Coupon, mode: SaveMode) -> SyncResult<()>;
    async fn update_coupon(&self, coupon: &Coupon, mode: SaveMode) -> SyncResult<()>;

    // People
    async fn get_person(&self, id: PersonId) -> SyncResult<Option<Person>>;
    async fn find_person_by_email(&self, email: &str) -> SyncResult<Option<Person>>;
    async fn find_person_by_name(&self, full_name: &str) -> SyncResult<Option<Person>>;
    async fn create_person(&self, person: &Person) -> SyncResult<()>;

    // Taxonomy terms
    async fn get_term(&self, id: TermId) -> SyncResult<Option<TaxonomyTerm>>;
    async fn list_terms(&self, kind: TaxonomyKind) -> SyncResult<Vec<TaxonomyTerm>>;
    /// Terms of a kind touched at or after `since`; `None` means all.
    async fn list_terms_updated_since(
        &self,
        kind: TaxonomyKind,
        since: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<TaxonomyTerm>>;
    async fn create_term(&self, term: &TaxonomyTerm, mode: SaveMode) -> SyncResult<()>;
    async fn update_term(&self, term: &TaxonomyTerm, mode: SaveMode) -> SyncResult<()>;
    /// Highest legacy sequence number in use for a kind.
    async fn max_legacy_seq(&self, kind: TaxonomyKind) -> SyncResult<Option<i64>>;
}

/// One recorded write, for test assertions on write counts and modes.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub entity: &'static str,
    pub key: String,
    pub created: bool,
    pub mode: SaveMode,
}

/// In-memory store with a write log.
#[derive(Default)]
pub struct MemoryStore {
    books: RwLock<HashMap<BookId, Book>>,
    customers: RwLock<HashMap<CustomerId, Customer>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    coupons: RwLock<HashMap<CouponId, Coupon>>,
    persons: RwLock<HashMap<PersonId, Person>>,
    terms: RwLock<HashMap<TermId, TaxonomyTerm>>,
    write_log: RwLock<Vec<WriteRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write recorded so far.
    pub async fn write_log(&self) -> Vec<WriteRecord> {
        self.write_log.read().await.clone()
    }

    /// Writes for one entity type.
    pub async fn writes_for(&self, entity: &str) -> Vec<WriteRecord> {
        self.write_log
            .read()
            .await
            .iter()
            .filter(|w| w.entity == entity)
            .cloned()
            .collect()
    }

    async fn record(&self, entity: &'static str, key: String, created: bool, mode: SaveMode) {
        self.write_log.write().await.push(WriteRecord {
            entity,
            key,
            created,
            mode,
        });
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_book(&self, id: BookId) -> SyncResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn find_book_by_sku(&self, sku: &str) -> SyncResult<Option<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .find(|b| {
                b.sku() == sku
                    || b.isbn.as_deref() == Some(sku)
                    || b.ean.as_deref() == Some(sku)
            })
            .cloned())
    }

    async fn find_book_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .find(|b| b.external_ids.get(platform) == Some(external_id))
            .cloned())
    }

    async fn create_book(&self, book: &Book, mode: SaveMode) -> SyncResult<()> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            return Err(SyncError::store(format!("book {} already exists", book.id)));
        }
        books.insert(book.id, book.clone());
        drop(books);
        self.record("book", book.id.to_string(), true, mode).await;
        Ok(())
    }

    async fn update_book(&self, book: &Book, mode: SaveMode) -> SyncResult<()> {
        let mut books = self.books.write().await;
        if !books.contains_key(&book.id) {
            return Err(SyncError::not_found("book", book.id.to_string()));
        }
        books.insert(book.id, book.clone());
        drop(books);
        self.record("book", book.id.to_string(), false, mode).await;
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> SyncResult<Option<Customer>> {
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn find_customer_by_email(&self, email: &str) -> SyncResult<Option<Customer>> {
        let wanted = email.to_lowercase();
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.email.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_customer_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Customer>> {
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.external_ids.get(platform) == Some(external_id))
            .cloned())
    }

    async fn create_customer(&self, customer: &Customer, mode: SaveMode) -> SyncResult<()> {
        let mut customers = self.customers.write().await;
        if customers.contains_key(&customer.id) {
            return Err(SyncError::store(format!(
                "customer {} already exists",
                customer.id
            )));
        }
        customers.insert(customer.id, customer.clone());
        drop(customers);
        self.record("customer", customer.id.to_string(), true, mode)
            .await;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer, mode: SaveMode) -> SyncResult<()> {
        let mut customers = self.customers.write().await;
        if !customers.contains_key(&customer.id) {
            return Err(SyncError::not_found("customer", customer.id.to_string()));
        }
        customers.insert(customer.id, customer.clone());
        drop(customers);
        self.record("customer", customer.id.to_string(), false, mode)
            .await;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> SyncResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_order_by_number(&self, number: &str) -> SyncResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.number == number)
            .cloned())
    }

    async fn find_order_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.external_ids.get(platform) == Some(external_id))
            .cloned())
    }

    async fn create_order(&self, order: &Order, mode: SaveMode) -> SyncResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(SyncError::store(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        drop(orders);
        self.record("order", order.id.to_string(), true, mode).await;
        Ok(())
    }

    async fn update_order(&self, order: &Order, mode: SaveMode) -> SyncResult<()> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id) {
            return Err(SyncError::not_found("order", order.id.to_string()));
        }
        orders.insert(order.id, order.clone());
        drop(orders);
        self.record("order", order.id.to_string(), false, mode).await;
        Ok(())
    }

    async fn get_coupon(&self, id: CouponId) -> SyncResult<Option<Coupon>> {
        Ok(self.coupons.read().await.get(&id).cloned())
    }

    async fn find_coupon_by_code(&self, code: &str) -> SyncResult<Option<Coupon>> {
        let wanted = code.to_lowercase();
        Ok(self
            .coupons
            .read()
            .await
            .values()
            .find(|c| c.code.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_coupon_by_external_id(
        &self,
        platform: Platform,
        external_id: i64,
    ) -> SyncResult<Option<Coupon>> {
        Ok(self
            .coupons
            .read()
            .await
            .values()
            .find(|c| c.external_ids.get(platform) == Some(external_id))
            .cloned())
    }

    async fn create_coupon(&self, coupon: &Coupon, mode: SaveMode) -> SyncResult<()> {
        let mut coupons = self.coupons.write().await;
        if coupons.contains_key(&coupon.id) {
            return Err(SyncError::store(format!(
                "coupon {} already exists",
                coupon.id
            )));
        }
        coupons.insert(coupon.id, coupon.clone());
        drop(coupons);
        self.record("coupon", coupon.id.to_string(), true, mode)
            .await;
        Ok(())
    }

    async fn update_coupon(&self, coupon: &Coupon, mode: SaveMode) -> SyncResult<()> {
        let mut coupons = self.coupons.write().await;
        if !coupons.contains_key(&coupon.id) {
            return Err(SyncError::not_found("coupon", coupon.id.to_string()));
        }
        coupons.insert(coupon.id, coupon.clone());
        drop(coupons);
        self.record("coupon", coupon.id.to_string(), false, mode)
            .await;
        Ok(())
    }

    async fn get_person(&self, id: PersonId) -> SyncResult<Option<Person>> {
        Ok(self.persons.read().await.get(&id).cloned())
    }

    async fn find_person_by_email(&self, email: &str) -> SyncResult<Option<Person>> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .persons
            .read()
            .await
            .values()
            .find(|p| {
                p.email
                    .as_deref()
                    .map_or(false, |e| e.trim().to_lowercase() == wanted)
            })
            .cloned())
    }

    async fn find_person_by_name(&self, full_name: &str) -> SyncResult<Option<Person>> {
        let wanted = full_name.trim().to_lowercase();
        Ok(self
            .persons
            .read()
            .await
            .values()
            .find(|p| p.full_name.trim().to_lowercase() == wanted)
            .cloned())
    }

    async fn create_person(&self, person: &Person) -> SyncResult<()> {
        let mut persons = self.persons.write().await;
        if persons.contains_key(&person.id) {
            return Err(SyncError::store(format!(
                "person {} already exists",
                person.id
            )));
        }
        persons.insert(person.id, person.clone());
        drop(persons);
        self.record("person", person.id.to_string(), true, SaveMode::Normal)
            .await;
        Ok(())
    }

    async fn get_term(&self, id: TermId) -> SyncResult<Option<TaxonomyTerm>> {
        Ok(self.terms.read().await.get(&id).cloned())
    }

    async fn list_terms(&self, kind: TaxonomyKind) -> SyncResult<Vec<TaxonomyTerm>> {
        Ok(self
            .terms
            .read()
            .await
            .values()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_terms_updated_since(
        &self,
        kind: TaxonomyKind,
        since: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<TaxonomyTerm>> {
        Ok(self
            .terms
            .read()
            .await
            .values()
            .filter(|t| t.kind == kind)
            .filter(|t| since.map_or(true, |cutoff| t.updated_at >= cutoff))
            .cloned()
            .collect())
    }

    async fn create_term(&self, term: &TaxonomyTerm, mode: SaveMode) -> SyncResult<()> {
        let mut terms = self.terms.write().await;
        if terms.contains_key(&term.id) {
            return Err(SyncError::store(format!("term {} already exists", term.id)));
        }
        if let Some(seq) = term.legacy_seq {
            let collision = terms
                .values()
                .any(|t| t.kind == term.kind && t.legacy_seq == Some(seq));
            if collision {
                return Err(SyncError::store(format!(
                    "legacy sequence {seq} already taken for {}",
                    term.kind.as_str()
                )));
            }
        }
        terms.insert(term.id, term.clone());
        drop(terms);
        self.record("term", term.id.to_string(), true, mode).await;
        Ok(())
    }

    async fn update_term(&self, term: &TaxonomyTerm, mode: SaveMode) -> SyncResult<()> {
        let mut terms = self.terms.write().await;
        if !terms.contains_key(&term.id) {
            return Err(SyncError::not_found("term", term.id.to_string()));
        }
        terms.insert(term.id, term.clone());
        drop(terms);
        self.record("term", term.id.to_string(), false, mode).await;
        Ok(())
    }

    async fn max_legacy_seq(&self, kind: TaxonomyKind) -> SyncResult<Option<i64>> {
        Ok(self
            .terms
            .read()
            .await
            .values()
            .filter(|t| t.kind == kind)
            .filter_map(|t| t.legacy_seq)
            .max())
    }
}
