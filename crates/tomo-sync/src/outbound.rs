//! Outbound sync: catalog to stores.
//!
//! Each entity follows a two-state machine per platform: no recorded
//! external id means create, a recorded id means update. Ids learned from
//! the store are persisted with a skip-sync write so the write does not
//! trigger another push. A 404 on update means the store-side record was
//! deleted out-of-band; the stale id is dropped and the record recreated.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use tomo_core::{Book, BookId, CouponId, CustomerId, OrderId, Platform, TermId};
use tomo_woo::{WooClient, WooClientSet, WooLineItem, WooProductAttribute, WooTermRef};

use crate::error::{SyncError, SyncResult};
use crate::mapper::{coupon as coupon_mapper, customer as customer_mapper, order as order_mapper,
    product as product_mapper, term as term_mapper};
use crate::store::{EntityStore, SaveMode};

/// What an outbound sync call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The record was created on the store.
    Created { external_id: i64 },
    /// The record was updated in place.
    Updated { external_id: i64 },
    /// Nothing was pushed.
    Skipped { reason: String },
}

impl SyncOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// The external id this outcome settled on, when one exists.
    #[must_use]
    pub fn external_id(&self) -> Option<i64> {
        match self {
            Self::Created { external_id } | Self::Updated { external_id } => Some(*external_id),
            Self::Skipped { .. } => None,
        }
    }
}

/// Pushes catalog entities to the stores.
pub struct OutboundSync<'a> {
    store: &'a dyn EntityStore,
    clients: &'a WooClientSet,
}

impl<'a> OutboundSync<'a> {
    pub fn new(store: &'a dyn EntityStore, clients: &'a WooClientSet) -> Self {
        Self { store, clients }
    }

    fn client_or_skip(&self, platform: Platform) -> Option<&Arc<WooClient>> {
        let client = self.clients.get(platform);
        if client.is_none() {
            warn!(platform = %platform, "Platform not configured, skipping outbound sync");
        }
        client
    }

    // ------------------------------------------------------------------
    // Books
    // ------------------------------------------------------------------

    /// Push one book to one platform.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn sync_book(&self, book_id: BookId, platform: Platform) -> SyncResult<SyncOutcome> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(SyncOutcome::skipped("platform not configured"));
        };
        let mut book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| SyncError::not_found("book", book_id.to_string()))?;

        if !book.is_eligible_for(platform) {
            return Ok(SyncOutcome::skipped(format!(
                "book is not in the {platform} channel"
            )));
        }

        let relations = self.resolve_product_relations(&book, platform, client).await?;
        let payload = product_mapper::to_woo(&book, relations);

        match book.external_ids.get(platform) {
            None => {
                let created = client.create_product(&payload).await?;
                let external_id = created.id.ok_or_else(|| {
                    SyncError::validation("store returned a product without an id")
                })?;
                book.record_external_id(platform, external_id);
                self.store.update_book(&book, SaveMode::SkipSync).await?;
                info!(book = %book_id, external_id, "Created store product");
                Ok(SyncOutcome::Created { external_id })
            }
            Some(external_id) => {
                match client.update_product(external_id, &payload).await {
                    Ok(_) => Ok(SyncOutcome::Updated { external_id }),
                    Err(err) if err.is_not_found() => {
                        // Deleted on the store out-of-band; drop the stale
                        // id and recreate.
                        warn!(
                            book = %book_id,
                            stale_id = external_id,
                            "Store product vanished, recreating"
                        );
                        let created = client.create_product(&payload).await?;
                        let new_id = created.id.ok_or_else(|| {
                            SyncError::validation("store returned a product without an id")
                        })?;
                        book.record_external_id(platform, new_id);
                        self.store.update_book(&book, SaveMode::SkipSync).await?;
                        Ok(SyncOutcome::Created { external_id: new_id })
                    }
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Delete a book's store counterpart and clear the stored id.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn delete_book(&self, book_id: BookId, platform: Platform) -> SyncResult<()> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(());
        };
        let mut book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| SyncError::not_found("book", book_id.to_string()))?;
        if let Some(external_id) = book.external_ids.get(platform) {
            client.delete_product(external_id).await?;
            book.clear_external_id(platform);
            self.store.update_book(&book, SaveMode::SkipSync).await?;
        }
        Ok(())
    }

    /// Delete a customer's store counterpart and clear the stored id.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn delete_customer(
        &self,
        customer_id: CustomerId,
        platform: Platform,
    ) -> SyncResult<()> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(());
        };
        let mut customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| SyncError::not_found("customer", customer_id.to_string()))?;
        if let Some(external_id) = customer.external_ids.get(platform) {
            client.delete_customer(external_id).await?;
            customer.external_ids.clear(platform);
            customer.woo_id = customer.external_ids.legacy_primary();
            self.store
                .update_customer(&customer, SaveMode::SkipSync)
                .await?;
        }
        Ok(())
    }

    /// Delete an order's store counterpart and clear the stored id.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn delete_order(&self, order_id: OrderId, platform: Platform) -> SyncResult<()> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(());
        };
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| SyncError::not_found("order", order_id.to_string()))?;
        if let Some(external_id) = order.external_ids.get(platform) {
            client.delete_order(external_id).await?;
            order.external_ids.clear(platform);
            order.woo_id = order.external_ids.legacy_primary();
            self.store.update_order(&order, SaveMode::SkipSync).await?;
        }
        Ok(())
    }

    /// Delete a coupon's store counterpart and clear the stored id.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn delete_coupon(&self, coupon_id: CouponId, platform: Platform) -> SyncResult<()> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(());
        };
        let mut coupon = self
            .store
            .get_coupon(coupon_id)
            .await?
            .ok_or_else(|| SyncError::not_found("coupon", coupon_id.to_string()))?;
        if let Some(external_id) = coupon.external_ids.get(platform) {
            client.delete_coupon(external_id).await?;
            coupon.external_ids.clear(platform);
            coupon.woo_id = coupon.external_ids.legacy_primary();
            self.store.update_coupon(&coupon, SaveMode::SkipSync).await?;
        }
        Ok(())
    }

    /// Resolve every taxonomy relation of a book into store-side attribute
    /// options and term references, persisting learned term ids.
    async fn resolve_product_relations(
        &self,
        book: &Book,
        platform: Platform,
        client: &Arc<WooClient>,
    ) -> SyncResult<product_mapper::ProductRelations> {
        let mut relations = product_mapper::ProductRelations::default();

        let single_relations: [Option<TermId>; 5] = [
            book.author,
            book.publisher,
            book.imprint,
            book.collection,
            book.work,
        ];
        for term_id in single_relations.into_iter().flatten() {
            if let Some(attribute) = self.resolve_attribute_terms(&[term_id], platform, client).await? {
                relations.attributes.push(attribute);
            }
        }
        if let Some(attribute) = self
            .resolve_attribute_terms(&book.brands, platform, client)
            .await?
        {
            relations.attributes.push(attribute);
        }

        for term_id in &book.categories {
            relations
                .categories
                .push(self.resolve_category(*term_id, platform, client).await?);
        }
        for term_id in &book.tags {
            relations
                .tags
                .push(self.resolve_tag(*term_id, platform, client).await?);
        }
        Ok(relations)
    }

    /// Resolve a group of same-kind terms into one product attribute entry.
    async fn resolve_attribute_terms(
        &self,
        term_ids: &[TermId],
        platform: Platform,
        client: &Arc<WooClient>,
    ) -> SyncResult<Option<WooProductAttribute>> {
        let mut entry: Option<WooProductAttribute> = None;
        for term_id in term_ids {
            let mut term = self
                .store
                .get_term(*term_id)
                .await?
                .ok_or_else(|| SyncError::not_found("term", term_id.to_string()))?;
            let Some((attr_name, attr_slug)) = term.kind.attribute() else {
                return Err(SyncError::validation(format!(
                    "{} terms are native taxonomies, not attributes",
                    term.kind
                )));
            };
            let attribute = client.get_or_create_attribute(attr_name, attr_slug).await?;
            let resolved = client
                .get_or_create_attribute_term(
                    attribute.id,
                    &term.name,
                    term_mapper::description_text(&term).as_deref(),
                    Some(&term.stable_id()),
                )
                .await?;
            if term.external_ids.get(platform) != Some(resolved.id) {
                term.record_external_id(platform, resolved.id);
                self.store.update_term(&term, SaveMode::SkipSync).await?;
            }
            let entry = entry.get_or_insert_with(|| WooProductAttribute {
                id: Some(attribute.id),
                name: attr_name.to_string(),
                options: Vec::new(),
                visible: true,
                variation: false,
            });
            entry.options.push(resolved.name);
        }
        Ok(entry)
    }

    async fn resolve_category(
        &self,
        term_id: TermId,
        platform: Platform,
        client: &Arc<WooClient>,
    ) -> SyncResult<WooTermRef> {
        let mut term = self
            .store
            .get_term(term_id)
            .await?
            .ok_or_else(|| SyncError::not_found("term", term_id.to_string()))?;

        // One level of parent resolution; deeper trees resolve over
        // repeated syncs.
        let parent_external = match term.parent {
            Some(parent_id) => {
                let parent_ref = Box::pin(self.resolve_category(parent_id, platform, client)).await?;
                Some(parent_ref.id)
            }
            None => None,
        };

        let image = term.image.as_ref().map(|image| tomo_woo::WooImage {
            src: image.src.clone(),
            alt: image.alt.clone(),
        });
        let resolved = client
            .get_or_create_category(&term.name, Some(&term.stable_id()), parent_external, image)
            .await?;
        if term.external_ids.get(platform) != Some(resolved.id) {
            term.record_external_id(platform, resolved.id);
            self.store.update_term(&term, SaveMode::SkipSync).await?;
        }
        Ok(WooTermRef { id: resolved.id })
    }

    async fn resolve_tag(
        &self,
        term_id: TermId,
        platform: Platform,
        client: &Arc<WooClient>,
    ) -> SyncResult<WooTermRef> {
        let mut term = self
            .store
            .get_term(term_id)
            .await?
            .ok_or_else(|| SyncError::not_found("term", term_id.to_string()))?;
        let resolved = client
            .get_or_create_tag(&term.name, Some(&term.stable_id()))
            .await?;
        if term.external_ids.get(platform) != Some(resolved.id) {
            term.record_external_id(platform, resolved.id);
            self.store.update_term(&term, SaveMode::SkipSync).await?;
        }
        Ok(WooTermRef { id: resolved.id })
    }

    // ------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------

    /// Push one customer to one platform, adopting a store customer with
    /// the same email when one already exists.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn sync_customer(
        &self,
        customer_id: CustomerId,
        platform: Platform,
    ) -> SyncResult<SyncOutcome> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(SyncOutcome::skipped("platform not configured"));
        };
        let mut customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| SyncError::not_found("customer", customer_id.to_string()))?;
        if customer.email.trim().is_empty() {
            return Err(SyncError::validation("customer has no email"));
        }

        let payload = customer_mapper::to_woo(&customer);
        match customer.external_ids.get(platform) {
            Some(external_id) => match client.update_customer(external_id, &payload).await {
                Ok(_) => Ok(SyncOutcome::Updated { external_id }),
                Err(err) if err.is_not_found() => {
                    warn!(customer = %customer_id, stale_id = external_id, "Store customer vanished, recreating");
                    let external_id = self
                        .create_or_adopt_customer(client, &payload)
                        .await?;
                    customer.record_external_id(platform, external_id);
                    self.store
                        .update_customer(&customer, SaveMode::SkipSync)
                        .await?;
                    Ok(SyncOutcome::Created { external_id })
                }
                Err(err) => Err(err.into()),
            },
            None => {
                let external_id = self.create_or_adopt_customer(client, &payload).await?;
                customer.record_external_id(platform, external_id);
                self.store
                    .update_customer(&customer, SaveMode::SkipSync)
                    .await?;
                Ok(SyncOutcome::Created { external_id })
            }
        }
    }

    /// Create a store customer, or adopt the existing one registered under
    /// the same email.
    async fn create_or_adopt_customer(
        &self,
        client: &Arc<WooClient>,
        payload: &tomo_woo::WooCustomer,
    ) -> SyncResult<i64> {
        if let Some(existing) = client.find_customer_by_email(&payload.email).await? {
            if let Some(id) = existing.id {
                client.update_customer(id, payload).await?;
                return Ok(id);
            }
        }
        let created = client.create_customer(payload).await?;
        created
            .id
            .ok_or_else(|| SyncError::validation("store returned a customer without an id"))
    }

    // ------------------------------------------------------------------
    // Coupons
    // ------------------------------------------------------------------

    /// Push one coupon to one platform. Scoped products that are not synced
    /// to this platform are dropped from the scope with a warning.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn sync_coupon(
        &self,
        coupon_id: CouponId,
        platform: Platform,
    ) -> SyncResult<SyncOutcome> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(SyncOutcome::skipped("platform not configured"));
        };
        let mut coupon = self
            .store
            .get_coupon(coupon_id)
            .await?
            .ok_or_else(|| SyncError::not_found("coupon", coupon_id.to_string()))?;
        if coupon.code.trim().is_empty() {
            return Err(SyncError::validation("coupon has no code"));
        }

        let mut product_ids = Vec::new();
        for book_id in &coupon.product_ids {
            match self.store.get_book(*book_id).await? {
                Some(book) => match book.external_ids.get(platform) {
                    Some(id) => product_ids.push(id),
                    None => warn!(
                        coupon = %coupon_id,
                        book = %book_id,
                        "Scoped book not synced to platform, dropping from coupon"
                    ),
                },
                None => warn!(coupon = %coupon_id, book = %book_id, "Scoped book missing"),
            }
        }

        let payload = coupon_mapper::to_woo(&coupon, product_ids);
        match coupon.external_ids.get(platform) {
            Some(external_id) => match client.update_coupon(external_id, &payload).await {
                Ok(_) => Ok(SyncOutcome::Updated { external_id }),
                Err(err) if err.is_not_found() => {
                    warn!(coupon = %coupon_id, stale_id = external_id, "Store coupon vanished, recreating");
                    let created = client.create_coupon(&payload).await?;
                    let new_id = created.id.ok_or_else(|| {
                        SyncError::validation("store returned a coupon without an id")
                    })?;
                    coupon.record_external_id(platform, new_id);
                    self.store.update_coupon(&coupon, SaveMode::SkipSync).await?;
                    Ok(SyncOutcome::Created { external_id: new_id })
                }
                Err(err) => Err(err.into()),
            },
            None => {
                let created = client.create_coupon(&payload).await?;
                let external_id = created.id.ok_or_else(|| {
                    SyncError::validation("store returned a coupon without an id")
                })?;
                coupon.record_external_id(platform, external_id);
                self.store.update_coupon(&coupon, SaveMode::SkipSync).await?;
                Ok(SyncOutcome::Created { external_id })
            }
        }
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Push one order to one platform.
    ///
    /// Line items resolve through: explicit external id, the referenced
    /// book's external-id map (with a depth-1 opportunistic cascade for
    /// eligible unsynced books), then SKU lookup against the store.
    /// Unresolvable lines are dropped with a warning; if none survive the
    /// order is rejected before any store call.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn sync_order(
        &self,
        order_id: OrderId,
        platform: Platform,
    ) -> SyncResult<SyncOutcome> {
        let Some(client) = self.client_or_skip(platform) else {
            return Ok(SyncOutcome::skipped("platform not configured"));
        };
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| SyncError::not_found("order", order_id.to_string()))?;
        if order.number.trim().is_empty() {
            return Err(SyncError::validation("order has no number"));
        }

        let customer_id = match order.customer {
            Some(customer_id) => self
                .store
                .get_customer(customer_id)
                .await?
                .and_then(|c| c.external_ids.get(platform)),
            None => None,
        };

        let mut line_items: Vec<WooLineItem> = Vec::new();
        for line in &order.lines {
            match self.resolve_line_product(line, platform, client).await {
                Ok(Some(product_id)) => {
                    line_items.push(order_mapper::line_to_woo(line, product_id));
                }
                Ok(None) => warn!(
                    order = %order_id,
                    line = %line.name,
                    "Line item did not resolve to a store product, dropping"
                ),
                Err(err) => warn!(
                    order = %order_id,
                    line = %line.name,
                    error = %err,
                    "Line item resolution failed, dropping"
                ),
            }
        }
        if line_items.is_empty() {
            return Err(SyncError::validation(format!(
                "order {} has no line items resolvable on {platform}; sync its products first",
                order.number
            )));
        }

        let payload = order_mapper::to_woo(&order, customer_id, line_items);
        match order.external_ids.get(platform) {
            Some(external_id) => match client.update_order(external_id, &payload).await {
                Ok(_) => Ok(SyncOutcome::Updated { external_id }),
                Err(err) if err.is_not_found() => {
                    warn!(order = %order_id, stale_id = external_id, "Store order vanished, recreating");
                    let created = client.create_order(&payload).await?;
                    let new_id = created.id.ok_or_else(|| {
                        SyncError::validation("store returned an order without an id")
                    })?;
                    order.record_external_id(platform, new_id);
                    self.store.update_order(&order, SaveMode::SkipSync).await?;
                    Ok(SyncOutcome::Created { external_id: new_id })
                }
                Err(err) => Err(err.into()),
            },
            None => {
                let created = client.create_order(&payload).await?;
                let external_id = created.id.ok_or_else(|| {
                    SyncError::validation("store returned an order without an id")
                })?;
                order.record_external_id(platform, external_id);
                self.store.update_order(&order, SaveMode::SkipSync).await?;
                Ok(SyncOutcome::Created { external_id })
            }
        }
    }

    /// Resolve a line item to an external product id, cascading one level
    /// into an unsynced referenced book when it is channel-eligible.
    async fn resolve_line_product(
        &self,
        line: &tomo_core::OrderLine,
        platform: Platform,
        client: &Arc<WooClient>,
    ) -> SyncResult<Option<i64>> {
        if let Some(explicit) = line.external_product_id {
            return Ok(Some(explicit));
        }

        if let Some(book_id) = line.book {
            if let Some(book) = self.store.get_book(book_id).await? {
                if let Some(id) = book.external_ids.get(platform) {
                    return Ok(Some(id));
                }
                if book.is_eligible_for(platform) {
                    // Depth-1 cascade; failure is reported, not propagated.
                    match Box::pin(self.sync_book(book_id, platform)).await {
                        Ok(outcome) => {
                            if let Some(id) = outcome.external_id() {
                                return Ok(Some(id));
                            }
                        }
                        Err(err) => warn!(
                            book = %book_id,
                            error = %err,
                            "Opportunistic product sync failed"
                        ),
                    }
                }
            }
        }

        if let Some(sku) = line.sku.as_deref() {
            if let Some(book) = self.store.find_book_by_sku(sku).await? {
                if let Some(id) = book.external_ids.get(platform) {
                    return Ok(Some(id));
                }
            }
            if let Some(product) = client.find_product_by_sku(sku).await? {
                return Ok(product.id);
            }
        }
        Ok(None)
    }
}
