//! Periodic term reconciliation.
//!
//! Sweeps every configured platform and taxonomy kind, pairs internal terms
//! with external ones (stable-id slug first, normalized name second) and
//! resolves drift by last-writer-wins on the modification timestamps.
//! External records without a timestamp lose to the catalog side, which is
//! logged. A dry run classifies identically but writes nothing. Per-item
//! failures are accumulated; the sweep never aborts.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use tomo_core::{richtext, Platform, TaxonomyKind, TaxonomyTerm};
use tomo_woo::{
    capped_slug, CachedAttribute, WooAttributeTerm, WooCategory, WooClient, WooClientSet, WooTag,
    DEFAULT_PAGE_SIZE,
};

use crate::error::SyncResult;
use crate::mapper::term as term_mapper;
use crate::resolve;
use crate::store::{EntityStore, SaveMode};

/// What to sweep. Empty lists mean "everything".
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub platforms: Vec<Platform>,
    pub kinds: Vec<TaxonomyKind>,
    /// Only consider internal terms touched at or after this instant.
    pub updated_since: Option<DateTime<Utc>>,
    /// Classify without writing anywhere.
    pub dry_run: bool,
}

/// Counts for one sync direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionCounts {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errored: u32,
}

/// Result of one reconciliation sweep.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    /// Catalog to store.
    pub outbound: DirectionCounts,
    /// Store to catalog.
    pub inbound: DirectionCounts,
    /// Per-item failures as (context, error) pairs.
    pub errors: Vec<(String, String)>,
}

impl ReconcileSummary {
    /// Total records that changed on either side.
    #[must_use]
    pub fn changes(&self) -> u32 {
        self.outbound.created + self.outbound.updated + self.inbound.created + self.inbound.updated
    }
}

/// A store-side term in kind-independent shape.
#[derive(Debug, Clone)]
struct ExternalTerm {
    id: i64,
    name: String,
    slug: Option<String>,
    description: Option<String>,
    modified_at: Option<DateTime<Utc>>,
}

impl From<WooAttributeTerm> for ExternalTerm {
    fn from(term: WooAttributeTerm) -> Self {
        Self {
            id: term.id.unwrap_or_default(),
            modified_at: term.modified_at(),
            name: term.name,
            slug: term.slug,
            description: term.description,
        }
    }
}

impl From<WooCategory> for ExternalTerm {
    fn from(category: WooCategory) -> Self {
        Self {
            id: category.id.unwrap_or_default(),
            name: category.name,
            slug: category.slug,
            description: category.description,
            modified_at: None,
        }
    }
}

impl From<WooTag> for ExternalTerm {
    fn from(tag: WooTag) -> Self {
        Self {
            id: tag.id.unwrap_or_default(),
            name: tag.name,
            slug: tag.slug,
            description: tag.description,
            modified_at: None,
        }
    }
}

fn normalized(name: &str) -> String {
    name.trim().to_lowercase()
}

fn same_content(term: &TaxonomyTerm, external: &ExternalTerm) -> bool {
    let internal_description = term_mapper::description_text(term);
    term.name.trim() == external.name.trim()
        && internal_description.as_deref().unwrap_or("")
            == external.description.as_deref().unwrap_or("").trim()
}

/// Reconciles taxonomy terms between the catalog and the stores.
pub struct TermReconciler<'a> {
    store: &'a dyn EntityStore,
    clients: &'a WooClientSet,
}

impl<'a> TermReconciler<'a> {
    pub fn new(store: &'a dyn EntityStore, clients: &'a WooClientSet) -> Self {
        Self { store, clients }
    }

    /// Run one sweep over the selected platforms and kinds.
    #[instrument(skip(self, options), fields(dry_run = options.dry_run))]
    pub async fn sync_all_terms(&self, options: &ReconcileOptions) -> SyncResult<ReconcileSummary> {
        let platforms: Vec<Platform> = if options.platforms.is_empty() {
            self.clients.platforms().collect()
        } else {
            options.platforms.clone()
        };
        let kinds: &[TaxonomyKind] = if options.kinds.is_empty() {
            &TaxonomyKind::ALL
        } else {
            &options.kinds
        };

        let mut summary = ReconcileSummary::default();
        for platform in platforms {
            let Some(client) = self.clients.get(platform) else {
                warn!(platform = %platform, "Platform not configured, skipping sweep");
                continue;
            };
            for kind in kinds {
                if let Err(err) = self
                    .sync_kind(platform, client, *kind, options, &mut summary)
                    .await
                {
                    warn!(
                        platform = %platform,
                        kind = %kind,
                        error = %err,
                        "Term sweep failed for kind, continuing"
                    );
                    summary.outbound.errored += 1;
                    summary
                        .errors
                        .push((format!("{platform}/{kind}"), err.to_string()));
                }
            }
        }
        info!(
            changes = summary.changes(),
            failures = summary.errors.len(),
            "Term reconciliation finished"
        );
        Ok(summary)
    }

    async fn sync_kind(
        &self,
        platform: Platform,
        client: &Arc<WooClient>,
        kind: TaxonomyKind,
        options: &ReconcileOptions,
        summary: &mut ReconcileSummary,
    ) -> SyncResult<()> {
        let internal = self
            .store
            .list_terms_updated_since(kind, options.updated_since)
            .await?;
        let (attribute, external) = self.fetch_external(client, kind, options.dry_run).await?;
        let mut matched_external = vec![false; external.len()];

        for term in &internal {
            let slug = capped_slug(&term.stable_id());
            let position = external
                .iter()
                .position(|ext| ext.slug.as_deref() == Some(slug.as_str()))
                .or_else(|| {
                    external
                        .iter()
                        .position(|ext| normalized(&ext.name) == normalized(&term.name))
                });

            let result = match position {
                Some(index) => {
                    matched_external[index] = true;
                    self.reconcile_pair(
                        platform,
                        client,
                        kind,
                        attribute.as_ref(),
                        term,
                        &external[index],
                        options.dry_run,
                        summary,
                    )
                    .await
                }
                None => {
                    summary.outbound.created += 1;
                    let pushed = if options.dry_run {
                        Ok(())
                    } else {
                        self.push_new_term(platform, client, kind, term).await
                    };
                    if pushed.is_err() {
                        summary.outbound.created -= 1;
                    }
                    pushed
                }
            };
            if let Err(err) = result {
                summary.outbound.errored += 1;
                summary
                    .errors
                    .push((format!("{platform}/{kind}/{}", term.name), err.to_string()));
            }
        }

        for (ext, _) in external
            .iter()
            .zip(matched_external.iter())
            .filter(|(_, matched)| !**matched)
        {
            summary.inbound.created += 1;
            if options.dry_run {
                continue;
            }
            if let Err(err) = self.adopt_external_term(platform, kind, ext).await {
                summary.inbound.created -= 1;
                summary.inbound.errored += 1;
                summary
                    .errors
                    .push((format!("{platform}/{kind}/{}", ext.name), err.to_string()));
            }
        }
        Ok(())
    }

    /// Fetch every external term of a kind, plus the backing attribute for
    /// non-native kinds. In a dry run a missing attribute is not created
    /// and yields an empty external side.
    async fn fetch_external(
        &self,
        client: &Arc<WooClient>,
        kind: TaxonomyKind,
        dry_run: bool,
    ) -> SyncResult<(Option<CachedAttribute>, Vec<ExternalTerm>)> {
        match kind.attribute() {
            Some((name, slug)) => {
                let attribute = match self.find_attribute(client, name, slug).await? {
                    Some(attribute) => attribute,
                    None if dry_run => return Ok((None, Vec::new())),
                    None => client.get_or_create_attribute(name, slug).await?,
                };
                let mut terms = Vec::new();
                let mut page = 1;
                loop {
                    let batch = client
                        .list_attribute_terms(attribute.id, page, DEFAULT_PAGE_SIZE, None)
                        .await?;
                    let count = batch.len();
                    terms.extend(batch.into_iter().map(ExternalTerm::from));
                    if count < DEFAULT_PAGE_SIZE as usize {
                        break;
                    }
                    page += 1;
                }
                Ok((Some(attribute), terms))
            }
            None => {
                let mut terms = Vec::new();
                let mut page = 1;
                loop {
                    let count = match kind {
                        TaxonomyKind::Category => {
                            let batch = client.list_categories(page, DEFAULT_PAGE_SIZE, None).await?;
                            let count = batch.len();
                            terms.extend(batch.into_iter().map(ExternalTerm::from));
                            count
                        }
                        _ => {
                            let batch = client.list_tags(page, DEFAULT_PAGE_SIZE, None).await?;
                            let count = batch.len();
                            terms.extend(batch.into_iter().map(ExternalTerm::from));
                            count
                        }
                    };
                    if count < DEFAULT_PAGE_SIZE as usize {
                        break;
                    }
                    page += 1;
                }
                Ok((None, terms))
            }
        }
    }

    /// Non-creating attribute lookup.
    async fn find_attribute(
        &self,
        client: &Arc<WooClient>,
        name: &str,
        slug: &str,
    ) -> SyncResult<Option<CachedAttribute>> {
        let wanted = normalized(name);
        let mut page = 1;
        loop {
            let attributes = client.list_attributes(page, DEFAULT_PAGE_SIZE).await?;
            let count = attributes.len();
            for attribute in attributes {
                if normalized(&attribute.name) == wanted || attribute.slug.as_deref() == Some(slug)
                {
                    return Ok(Some(CachedAttribute {
                        id: attribute.id.unwrap_or_default(),
                        name: attribute.name,
                        slug: attribute.slug.unwrap_or_else(|| slug.to_string()),
                    }));
                }
            }
            if count < DEFAULT_PAGE_SIZE as usize {
                return Ok(None);
            }
            page += 1;
        }
    }

    /// Resolve drift between a matched pair by last-writer-wins.
    #[allow(clippy::too_many_arguments)]
    async fn reconcile_pair(
        &self,
        platform: Platform,
        client: &Arc<WooClient>,
        kind: TaxonomyKind,
        attribute: Option<&CachedAttribute>,
        term: &TaxonomyTerm,
        external: &ExternalTerm,
        dry_run: bool,
        summary: &mut ReconcileSummary,
    ) -> SyncResult<()> {
        if same_content(term, external) {
            summary.outbound.skipped += 1;
            if !dry_run && term.external_ids.get(platform) != Some(external.id) {
                let mut term = term.clone();
                term.record_external_id(platform, external.id);
                self.store.update_term(&term, SaveMode::SkipSync).await?;
            }
            return Ok(());
        }

        let internal_wins = match external.modified_at {
            Some(external_at) => term.updated_at >= external_at,
            None => {
                debug!(
                    kind = %kind,
                    name = %term.name,
                    "External term has no timestamp, catalog side wins"
                );
                true
            }
        };

        if internal_wins {
            summary.outbound.updated += 1;
            if dry_run {
                return Ok(());
            }
            self.push_term_update(platform, client, kind, attribute, term, external)
                .await
        } else {
            summary.inbound.updated += 1;
            if dry_run {
                return Ok(());
            }
            let mut term = term.clone();
            term.name = external.name.trim().to_string();
            term.description = external
                .description
                .as_deref()
                .map(richtext::blocks_from_html)
                .unwrap_or_default();
            term.record_external_id(platform, external.id);
            self.store.update_term(&term, SaveMode::SkipSync).await?;
            Ok(())
        }
    }

    /// Push catalog content over the external record.
    async fn push_term_update(
        &self,
        platform: Platform,
        client: &Arc<WooClient>,
        kind: TaxonomyKind,
        attribute: Option<&CachedAttribute>,
        term: &TaxonomyTerm,
        external: &ExternalTerm,
    ) -> SyncResult<()> {
        let description = term_mapper::description_text(term);
        match kind {
            TaxonomyKind::Category => {
                client
                    .update_category(
                        external.id,
                        &WooCategory {
                            id: None,
                            name: term.name.clone(),
                            slug: external.slug.clone(),
                            parent: None,
                            description,
                            image: None,
                        },
                    )
                    .await?;
            }
            TaxonomyKind::Tag => {
                client
                    .update_tag(
                        external.id,
                        &WooTag {
                            id: None,
                            name: term.name.clone(),
                            slug: external.slug.clone(),
                            description,
                        },
                    )
                    .await?;
            }
            _ => {
                let attribute = attribute.ok_or_else(|| {
                    crate::error::SyncError::configuration(format!(
                        "no store attribute backs {kind} terms"
                    ))
                })?;
                client
                    .update_attribute_term(
                        attribute.id,
                        external.id,
                        &WooAttributeTerm {
                            id: None,
                            name: term.name.clone(),
                            slug: external.slug.clone(),
                            description,
                            date_modified_gmt: None,
                        },
                    )
                    .await?;
            }
        }

        if term.external_ids.get(platform) != Some(external.id) {
            let mut term = term.clone();
            term.record_external_id(platform, external.id);
            self.store.update_term(&term, SaveMode::SkipSync).await?;
        }
        Ok(())
    }

    /// Create the external counterpart of a catalog-only term.
    async fn push_new_term(
        &self,
        platform: Platform,
        client: &Arc<WooClient>,
        kind: TaxonomyKind,
        term: &TaxonomyTerm,
    ) -> SyncResult<()> {
        let description = term_mapper::description_text(term);
        let stable_id = term.stable_id();
        let resolved = match kind {
            TaxonomyKind::Category => {
                client
                    .get_or_create_category(&term.name, Some(&stable_id), None, None)
                    .await?
            }
            TaxonomyKind::Tag => client.get_or_create_tag(&term.name, Some(&stable_id)).await?,
            _ => {
                let (attr_name, attr_slug) = kind.attribute().ok_or_else(|| {
                    crate::error::SyncError::configuration(format!(
                        "no store attribute backs {kind} terms"
                    ))
                })?;
                let attribute = client.get_or_create_attribute(attr_name, attr_slug).await?;
                client
                    .get_or_create_attribute_term(
                        attribute.id,
                        &term.name,
                        description.as_deref(),
                        Some(&stable_id),
                    )
                    .await?
            }
        };

        let mut term = term.clone();
        term.record_external_id(platform, resolved.id);
        self.store.update_term(&term, SaveMode::SkipSync).await?;
        Ok(())
    }

    /// Create the catalog counterpart of a store-only term.
    async fn adopt_external_term(
        &self,
        platform: Platform,
        kind: TaxonomyKind,
        external: &ExternalTerm,
    ) -> SyncResult<()> {
        let mut term = resolve::find_or_create_term(self.store, kind, &external.name).await?;
        if let Some(description) = external.description.as_deref() {
            if term.description.is_empty() && !description.trim().is_empty() {
                term.description = richtext::blocks_from_html(description);
            }
        }
        term.record_external_id(platform, external.id);
        self.store.update_term(&term, SaveMode::SkipSync).await?;
        Ok(())
    }
}
