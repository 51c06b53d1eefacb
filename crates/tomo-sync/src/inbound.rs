//! Inbound sync: store payloads into the catalog.
//!
//! Payloads arrive from webhooks or pull sweeps. Every ingest validates the
//! natural key first, finds the internal record by external-id map and then
//! by natural key, overlays the payload, stores a raw snapshot, and writes
//! with the skip-sync marker so ingestion never triggers an outbound echo.

use serde_json::Value;
use tracing::{info, instrument, warn};

use tomo_core::{Book, Coupon, Customer, Order, Person, Platform, TaxonomyKind};
use tomo_woo::{WooClientSet, WooCoupon, WooCustomer, WooOrder, WooProduct};

use crate::error::{SyncError, SyncResult};
use crate::mapper::{coupon as coupon_mapper, customer as customer_mapper, order as order_mapper,
    product as product_mapper};
use crate::resolve;
use crate::store::{EntityStore, SaveMode};

/// Outcome of a batch pull sweep. Partial failure never aborts the sweep.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub processed: u32,
    pub failed: u32,
    /// (external key, error) per failed item.
    pub errors: Vec<(String, String)>,
}

impl IngestSummary {
    fn record_failure(&mut self, key: impl Into<String>, err: &SyncError) {
        self.failed += 1;
        self.errors.push((key.into(), err.to_string()));
    }
}

/// Ingests store entities into the catalog.
pub struct InboundSync<'a> {
    store: &'a dyn EntityStore,
    clients: &'a WooClientSet,
}

impl<'a> InboundSync<'a> {
    pub fn new(store: &'a dyn EntityStore, clients: &'a WooClientSet) -> Self {
        Self { store, clients }
    }

    fn require_platform(&self, platform: Platform) -> SyncResult<()> {
        if self.clients.get(platform).is_none() {
            return Err(SyncError::configuration(format!(
                "cannot ingest from unconfigured platform {platform}"
            )));
        }
        Ok(())
    }

    fn snapshot<T: serde::Serialize>(payload: &T) -> SyncResult<Value> {
        serde_json::to_value(payload)
            .map_err(|e| SyncError::validation(format!("cannot snapshot payload: {e}")))
    }

    /// Ingest one store product.
    #[instrument(skip(self, woo), fields(platform = %platform, external_id = ?woo.id))]
    pub async fn ingest_product(&self, platform: Platform, woo: &WooProduct) -> SyncResult<Book> {
        self.require_platform(platform)?;
        let external_id = woo
            .id
            .ok_or_else(|| SyncError::validation("product payload has no id"))?;

        let mut book = match self
            .store
            .find_book_by_external_id(platform, external_id)
            .await?
        {
            Some(book) => book,
            None => match product_mapper::extract_identifier(woo) {
                Some(identifier) => self
                    .store
                    .find_book_by_sku(&identifier)
                    .await?
                    .unwrap_or_else(|| Book::new(woo.name.trim())),
                None => Book::new(woo.name.trim()),
            },
        };
        let existed = self.store.get_book(book.id).await?.is_some();

        product_mapper::apply_inbound(&mut book, woo);
        self.resolve_product_taxonomy(&mut book, woo).await?;
        book.record_external_id(platform, external_id);
        if !book.channels.contains(&platform) {
            book.channels.push(platform);
        }
        book.raw = Some(Self::snapshot(woo)?);

        if existed {
            self.store.update_book(&book, SaveMode::SkipSync).await?;
        } else {
            self.store.create_book(&book, SaveMode::SkipSync).await?;
            info!(book = %book.id, "Ingested new book from store");
        }
        Ok(book)
    }

    /// Resolve inbound attribute options into catalog term relations.
    async fn resolve_product_taxonomy(&self, book: &mut Book, woo: &WooProduct) -> SyncResult<()> {
        for (kind, name) in product_mapper::inbound_attribute_names(woo) {
            let term = resolve::find_or_create_term(self.store, kind, &name).await?;
            match kind {
                TaxonomyKind::Author => book.author = Some(term.id),
                TaxonomyKind::Publisher => book.publisher = Some(term.id),
                TaxonomyKind::Imprint => book.imprint = Some(term.id),
                TaxonomyKind::Collection => book.collection = Some(term.id),
                TaxonomyKind::Work => book.work = Some(term.id),
                TaxonomyKind::Brand => {
                    if !book.brands.contains(&term.id) {
                        book.brands.push(term.id);
                    }
                }
                // Category/tag payloads only carry external ids, which the
                // term reconciliation sweep maps back.
                TaxonomyKind::Category | TaxonomyKind::Tag => {}
            }
        }
        Ok(())
    }

    /// Ingest one store customer.
    #[instrument(skip(self, woo), fields(platform = %platform, external_id = ?woo.id))]
    pub async fn ingest_customer(
        &self,
        platform: Platform,
        woo: &WooCustomer,
    ) -> SyncResult<Customer> {
        self.require_platform(platform)?;
        if woo.email.trim().is_empty() {
            return Err(SyncError::validation("customer payload has no email"));
        }

        let mut customer = match woo.id {
            Some(external_id) => self
                .store
                .find_customer_by_external_id(platform, external_id)
                .await?,
            None => None,
        };
        if customer.is_none() {
            customer = self.store.find_customer_by_email(woo.email.trim()).await?;
        }
        let existed = customer.is_some();
        let mut customer = customer.unwrap_or_else(|| Customer::new(woo.email.trim()));

        customer_mapper::apply_inbound(&mut customer, woo);
        if let Some(external_id) = woo.id {
            customer.record_external_id(platform, external_id);
        }
        customer.raw = Some(Self::snapshot(woo)?);
        self.link_person(&mut customer).await?;

        if existed {
            self.store
                .update_customer(&customer, SaveMode::SkipSync)
                .await?;
        } else {
            self.store
                .create_customer(&customer, SaveMode::SkipSync)
                .await?;
            info!(customer = %customer.id, "Ingested new customer from store");
        }
        Ok(customer)
    }

    /// Link or create the person record behind a customer.
    async fn link_person(&self, customer: &mut Customer) -> SyncResult<()> {
        if customer.person.is_some() {
            return Ok(());
        }
        let full_name = customer_mapper::join_name(
            customer.first_name.as_deref(),
            customer.last_name.as_deref(),
        );
        if full_name.is_empty() {
            return Ok(());
        }
        let mut person = self.store.find_person_by_email(&customer.email).await?;
        if person.is_none() {
            person = self.store.find_person_by_name(&full_name).await?;
        }
        let person = match person {
            Some(person) => person,
            None => {
                let mut person = Person::new(&full_name);
                person.email = Some(customer.email.clone());
                self.store.create_person(&person).await?;
                person
            }
        };
        customer.person = Some(person.id);
        Ok(())
    }

    /// Ingest one store order.
    #[instrument(skip(self, woo), fields(platform = %platform, external_id = ?woo.id))]
    pub async fn ingest_order(&self, platform: Platform, woo: &WooOrder) -> SyncResult<Order> {
        self.require_platform(platform)?;
        let number = woo
            .number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SyncError::validation("order payload has no number"))?;

        let mut order = match woo.id {
            Some(external_id) => self
                .store
                .find_order_by_external_id(platform, external_id)
                .await?,
            None => None,
        };
        if order.is_none() {
            order = self.store.find_order_by_number(number).await?;
        }
        let existed = order.is_some();
        let mut order = order.unwrap_or_else(|| Order::new(number, woo.status.as_str()));

        // Resolve line books before overlaying the payload.
        let mut lines = Vec::with_capacity(woo.line_items.len());
        for item in &woo.line_items {
            let book = match item.product_id {
                Some(product_id) => self
                    .store
                    .find_book_by_external_id(platform, product_id)
                    .await?,
                None => None,
            };
            let book = match (book, item.sku.as_deref()) {
                (Some(book), _) => Some(book),
                (None, Some(sku)) if !sku.trim().is_empty() => {
                    self.store.find_book_by_sku(sku.trim()).await?
                }
                (None, _) => None,
            };
            if book.is_none() {
                warn!(
                    order = number,
                    line = %item.name,
                    "Inbound line does not match a catalog book"
                );
            }
            lines.push(order_mapper::line_from_woo(item, book.map(|b| b.id)));
        }

        order_mapper::apply_inbound(&mut order, woo, lines);
        if order.customer.is_none() {
            order.customer = self.resolve_order_customer(platform, woo).await?;
        }
        if let Some(external_id) = woo.id {
            order.record_external_id(platform, external_id);
        }
        order.raw = Some(Self::snapshot(woo)?);

        if existed {
            self.store.update_order(&order, SaveMode::SkipSync).await?;
        } else {
            self.store.create_order(&order, SaveMode::SkipSync).await?;
            info!(order = %order.id, number, "Ingested new order from store");
        }
        Ok(order)
    }

    /// Opportunistically create the customer (and person) behind an order
    /// whose billing email is unknown to the catalog.
    async fn resolve_order_customer(
        &self,
        platform: Platform,
        woo: &WooOrder,
    ) -> SyncResult<Option<tomo_core::CustomerId>> {
        let Some(billing) = &woo.billing else {
            return Ok(None);
        };
        let Some(email) = billing.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
        else {
            return Ok(None);
        };

        if let Some(existing) = self.store.find_customer_by_email(email).await? {
            return Ok(Some(existing.id));
        }

        let synthetic = WooCustomer {
            id: woo.customer_id,
            email: email.to_string(),
            first_name: billing.first_name.clone(),
            last_name: billing.last_name.clone(),
            billing: Some(billing.clone()),
            shipping: woo.shipping.clone(),
            date_modified_gmt: None,
        };
        let created = self.ingest_customer(platform, &synthetic).await?;
        info!(customer = %created.id, email, "Created customer from inbound order");
        Ok(Some(created.id))
    }

    /// Ingest one store coupon.
    #[instrument(skip(self, woo), fields(platform = %platform, external_id = ?woo.id))]
    pub async fn ingest_coupon(&self, platform: Platform, woo: &WooCoupon) -> SyncResult<Coupon> {
        self.require_platform(platform)?;
        let code = woo.code.trim();
        if code.is_empty() {
            return Err(SyncError::validation("coupon payload has no code"));
        }

        let mut coupon = match woo.id {
            Some(external_id) => self
                .store
                .find_coupon_by_external_id(platform, external_id)
                .await?,
            None => None,
        };
        if coupon.is_none() {
            coupon = self.store.find_coupon_by_code(code).await?;
        }
        let existed = coupon.is_some();
        let mut coupon = coupon.unwrap_or_else(|| {
            Coupon::new(
                code,
                woo.discount_type.as_deref().unwrap_or("fixed_cart"),
                0.0,
            )
        });

        coupon_mapper::apply_inbound(&mut coupon, woo);
        if let Some(external_id) = woo.id {
            coupon.record_external_id(platform, external_id);
        }
        coupon.raw = Some(Self::snapshot(woo)?);

        if existed {
            self.store.update_coupon(&coupon, SaveMode::SkipSync).await?;
        } else {
            self.store.create_coupon(&coupon, SaveMode::SkipSync).await?;
            info!(coupon = %coupon.id, code, "Ingested new coupon from store");
        }
        Ok(coupon)
    }

    /// Pull every product from a platform and ingest each one. One bad
    /// payload never aborts the sweep.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn pull_products(&self, platform: Platform) -> SyncResult<IngestSummary> {
        let client = self.clients.require(platform)?;
        let mut summary = IngestSummary::default();
        let mut page = 1;
        loop {
            let products = client.list_products(page, tomo_woo::DEFAULT_PAGE_SIZE).await?;
            let count = products.len();
            for product in &products {
                match self.ingest_product(platform, product).await {
                    Ok(_) => summary.processed += 1,
                    Err(err) => {
                        warn!(
                            platform = %platform,
                            external_id = ?product.id,
                            error = %err,
                            "Product ingest failed, continuing sweep"
                        );
                        summary.record_failure(
                            product.id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                            &err,
                        );
                    }
                }
            }
            if count < tomo_woo::DEFAULT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        Ok(summary)
    }
}
