//! Find-or-create for attributes, attribute terms, categories and tags.
//!
//! Term slugs on the store side have a hard length cap, so external slugs
//! are derived from the internal stable identifier and truncated to
//! [`TERM_SLUG_MAX_LEN`]. Matching by that slug survives renames; the
//! fallback is a trimmed case-insensitive name scan across all pages.
//! Resolved records are always written back to the term cache.

use tracing::{debug, info, warn};

use crate::cache::{attribute_key, term_identity, term_key, CachedAttribute, CachedTerm};
use crate::client::{WooClient, DEFAULT_PAGE_SIZE};
use crate::error::WooResult;
use crate::types::{WooAttribute, WooAttributeTerm, WooCategory, WooImage, WooTag};

/// Hard cap the store enforces on term slugs.
pub const TERM_SLUG_MAX_LEN: usize = 28;

/// Truncate a stable id to the store's slug cap.
///
/// Truncation counts characters, not bytes, so multibyte input cannot
/// split a character even though stable ids are hex in practice.
#[must_use]
pub fn capped_slug(stable_id: &str) -> String {
    match stable_id.char_indices().nth(TERM_SLUG_MAX_LEN) {
        Some((index, _)) => stable_id[..index].to_string(),
        None => stable_id.to_string(),
    }
}

fn normalized(name: &str) -> String {
    name.trim().to_lowercase()
}

impl WooClient {
    /// Resolve a catalog attribute by name or slug, creating it when absent.
    ///
    /// Matching is case-insensitive on name, exact on slug. New attributes
    /// are created with the default `select` type.
    pub async fn get_or_create_attribute(
        &self,
        name: &str,
        slug: &str,
    ) -> WooResult<CachedAttribute> {
        let key = attribute_key(self.platform(), slug);
        if let Some(cached) = self.cache().get_attribute(&key).await {
            return Ok(cached);
        }

        let wanted = normalized(name);
        let mut page = 1;
        loop {
            let attributes = self.list_attributes(page, DEFAULT_PAGE_SIZE).await?;
            let count = attributes.len();
            for attribute in attributes {
                let name_matches = normalized(&attribute.name) == wanted;
                let slug_matches = attribute.slug.as_deref() == Some(slug);
                if name_matches || slug_matches {
                    let cached = CachedAttribute {
                        id: attribute.id.unwrap_or_default(),
                        name: attribute.name,
                        slug: attribute.slug.unwrap_or_else(|| slug.to_string()),
                    };
                    self.cache().set_attribute(key, cached.clone()).await;
                    return Ok(cached);
                }
            }
            if count < DEFAULT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        info!(platform = %self.platform(), name, slug, "Creating catalog attribute");
        let created = self
            .create_attribute(&WooAttribute {
                id: None,
                name: name.to_string(),
                slug: Some(slug.to_string()),
                attribute_type: Some("select".to_string()),
            })
            .await?;
        let cached = CachedAttribute {
            id: created.id.unwrap_or_default(),
            name: created.name,
            slug: created.slug.unwrap_or_else(|| slug.to_string()),
        };
        self.cache().set_attribute(key, cached.clone()).await;
        Ok(cached)
    }

    /// Resolve a term under an attribute, creating or repairing it as needed.
    ///
    /// Resolution order: cache (with description-drift repair), slug lookup
    /// by the capped stable id, full paginated name scan with duplicate
    /// tolerance and slug migration, then create.
    pub async fn get_or_create_attribute_term(
        &self,
        attribute_id: i64,
        name: &str,
        description: Option<&str>,
        stable_id: Option<&str>,
    ) -> WooResult<CachedTerm> {
        let identity = term_identity(stable_id, name);
        let key = term_key(self.platform(), &attribute_id.to_string(), &identity);

        if let Some(cached) = self.cache().get_term(&key).await {
            if let Some(new_description) = description {
                if cached.description.as_deref() != Some(new_description) {
                    debug!(
                        platform = %self.platform(),
                        attribute_id,
                        term_id = cached.id,
                        "Term description drifted, pushing update"
                    );
                    let updated = self
                        .update_attribute_term(
                            attribute_id,
                            cached.id,
                            &WooAttributeTerm {
                                id: None,
                                name: cached.name.clone(),
                                // re-send the slug so the store does not regenerate it
                                slug: cached.slug.clone(),
                                description: Some(new_description.to_string()),
                                date_modified_gmt: None,
                            },
                        )
                        .await?;
                    let refreshed = cached_term_from(&updated);
                    self.cache().set_term(key, refreshed.clone()).await;
                    return Ok(refreshed);
                }
            }
            return Ok(cached);
        }

        // Slug match by stable id survives renames on either side.
        if let Some(stable_id) = stable_id {
            let slug = capped_slug(stable_id);
            let matches = self
                .list_attribute_terms(attribute_id, 1, 10, Some(&slug))
                .await?;
            if let Some(found) = matches.into_iter().next() {
                let resolved = self
                    .repair_term_if_drifted(attribute_id, found, name, description)
                    .await?;
                self.cache().set_term(key, resolved.clone()).await;
                return Ok(resolved);
            }
        }

        // Full scan by normalized name. Duplicates from earlier races are
        // tolerated: the lowest id is canonical, the rest are logged and
        // evicted from cache but never deleted here.
        if let Some(found) = self.scan_terms_by_name(attribute_id, name).await? {
            let resolved = match stable_id {
                Some(stable_id) => {
                    let slug = capped_slug(stable_id);
                    if found.slug.as_deref() != Some(slug.as_str()) {
                        info!(
                            platform = %self.platform(),
                            attribute_id,
                            term_id = ?found.id,
                            new_slug = %slug,
                            "Migrating legacy term slug to stable id"
                        );
                        let updated = self
                            .update_attribute_term(
                                attribute_id,
                                found.id.unwrap_or_default(),
                                &WooAttributeTerm {
                                    id: None,
                                    name: found.name.clone(),
                                    slug: Some(slug),
                                    description: description.map(str::to_string),
                                    date_modified_gmt: None,
                                },
                            )
                            .await?;
                        cached_term_from(&updated)
                    } else {
                        cached_term_from(&found)
                    }
                }
                None => cached_term_from(&found),
            };
            self.cache().set_term(key, resolved.clone()).await;
            return Ok(resolved);
        }

        let slug = stable_id.map(capped_slug);
        info!(
            platform = %self.platform(),
            attribute_id,
            name,
            slug = ?slug,
            "Creating attribute term"
        );
        let created = self
            .create_attribute_term(
                attribute_id,
                &WooAttributeTerm {
                    id: None,
                    name: name.to_string(),
                    slug,
                    description: description.map(str::to_string),
                    date_modified_gmt: None,
                },
            )
            .await?;
        let resolved = cached_term_from(&created);
        self.cache().set_term(key, resolved.clone()).await;
        Ok(resolved)
    }

    /// Update a slug-matched term when its name or description drifted,
    /// re-sending the slug so the store keeps it.
    async fn repair_term_if_drifted(
        &self,
        attribute_id: i64,
        found: WooAttributeTerm,
        name: &str,
        description: Option<&str>,
    ) -> WooResult<CachedTerm> {
        let name_drifted = found.name != name;
        let description_drifted =
            description.is_some() && found.description.as_deref() != description;
        if !name_drifted && !description_drifted {
            return Ok(cached_term_from(&found));
        }

        debug!(
            platform = %self.platform(),
            attribute_id,
            term_id = ?found.id,
            "Slug-matched term drifted, updating name/description"
        );
        let updated = self
            .update_attribute_term(
                attribute_id,
                found.id.unwrap_or_default(),
                &WooAttributeTerm {
                    id: None,
                    name: name.to_string(),
                    slug: found.slug.clone(),
                    description: description
                        .map(str::to_string)
                        .or_else(|| found.description.clone()),
                    date_modified_gmt: None,
                },
            )
            .await?;
        Ok(cached_term_from(&updated))
    }

    /// Page through every term of an attribute looking for a trimmed
    /// case-insensitive name match. Returns the lowest-id match when
    /// duplicates exist.
    async fn scan_terms_by_name(
        &self,
        attribute_id: i64,
        name: &str,
    ) -> WooResult<Option<WooAttributeTerm>> {
        let wanted = normalized(name);
        let mut matches: Vec<WooAttributeTerm> = Vec::new();
        let mut page = 1;
        loop {
            let terms = self
                .list_attribute_terms(attribute_id, page, DEFAULT_PAGE_SIZE, None)
                .await?;
            let count = terms.len();
            matches.extend(
                terms
                    .into_iter()
                    .filter(|term| normalized(&term.name) == wanted),
            );
            if count < DEFAULT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        if matches.len() > 1 {
            matches.sort_by_key(|term| term.id.unwrap_or(i64::MAX));
            let canonical = matches[0].id;
            warn!(
                platform = %self.platform(),
                attribute_id,
                name,
                canonical = ?canonical,
                duplicates = matches.len() - 1,
                "Duplicate terms share a name; using lowest id, cleanup is manual"
            );
            for duplicate in &matches[1..] {
                if let Some(slug) = duplicate.slug.as_deref() {
                    let stale = term_key(
                        self.platform(),
                        &attribute_id.to_string(),
                        &term_identity(Some(slug), &duplicate.name),
                    );
                    self.cache().delete(&stale).await;
                }
            }
        }
        Ok(matches.into_iter().next())
    }

    /// Resolve a product category by stable-id slug or name, creating it
    /// when absent. `parent` is the parent category's external id.
    pub async fn get_or_create_category(
        &self,
        name: &str,
        stable_id: Option<&str>,
        parent: Option<i64>,
        image: Option<WooImage>,
    ) -> WooResult<CachedTerm> {
        let identity = term_identity(stable_id, name);
        let key = term_key(self.platform(), "category", &identity);
        if let Some(cached) = self.cache().get_term(&key).await {
            return Ok(cached);
        }

        if let Some(stable_id) = stable_id {
            let slug = capped_slug(stable_id);
            let matches = self.list_categories(1, 10, Some(&slug)).await?;
            if let Some(found) = matches.into_iter().next() {
                let resolved = cached_category_from(&found);
                self.cache().set_term(key, resolved.clone()).await;
                return Ok(resolved);
            }
        }

        if let Some(found) = self.scan_categories_by_name(name).await? {
            let resolved = match stable_id {
                Some(stable_id) => {
                    let slug = capped_slug(stable_id);
                    if found.slug.as_deref() != Some(slug.as_str()) {
                        info!(
                            platform = %self.platform(),
                            category_id = ?found.id,
                            new_slug = %slug,
                            "Migrating legacy category slug to stable id"
                        );
                        let updated = self
                            .update_category(
                                found.id.unwrap_or_default(),
                                &WooCategory {
                                    id: None,
                                    name: found.name.clone(),
                                    slug: Some(slug),
                                    parent,
                                    description: None,
                                    image: image.clone(),
                                },
                            )
                            .await?;
                        cached_category_from(&updated)
                    } else {
                        cached_category_from(&found)
                    }
                }
                None => cached_category_from(&found),
            };
            self.cache().set_term(key, resolved.clone()).await;
            return Ok(resolved);
        }

        info!(platform = %self.platform(), name, "Creating product category");
        let created = self
            .create_category(&WooCategory {
                id: None,
                name: name.to_string(),
                slug: stable_id.map(capped_slug),
                parent,
                description: None,
                image,
            })
            .await?;
        let resolved = cached_category_from(&created);
        self.cache().set_term(key, resolved.clone()).await;
        Ok(resolved)
    }

    async fn scan_categories_by_name(&self, name: &str) -> WooResult<Option<WooCategory>> {
        let wanted = normalized(name);
        let mut matches: Vec<WooCategory> = Vec::new();
        let mut page = 1;
        loop {
            let categories = self.list_categories(page, DEFAULT_PAGE_SIZE, None).await?;
            let count = categories.len();
            matches.extend(
                categories
                    .into_iter()
                    .filter(|category| normalized(&category.name) == wanted),
            );
            if count < DEFAULT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        if matches.len() > 1 {
            matches.sort_by_key(|category| category.id.unwrap_or(i64::MAX));
            warn!(
                platform = %self.platform(),
                name,
                duplicates = matches.len() - 1,
                "Duplicate categories share a name; using lowest id"
            );
        }
        Ok(matches.into_iter().next())
    }

    /// Resolve a product tag by stable-id slug or name, creating it when
    /// absent.
    pub async fn get_or_create_tag(
        &self,
        name: &str,
        stable_id: Option<&str>,
    ) -> WooResult<CachedTerm> {
        let identity = term_identity(stable_id, name);
        let key = term_key(self.platform(), "tag", &identity);
        if let Some(cached) = self.cache().get_term(&key).await {
            return Ok(cached);
        }

        if let Some(stable_id) = stable_id {
            let slug = capped_slug(stable_id);
            let matches = self.list_tags(1, 10, Some(&slug)).await?;
            if let Some(found) = matches.into_iter().next() {
                let resolved = cached_tag_from(&found);
                self.cache().set_term(key, resolved.clone()).await;
                return Ok(resolved);
            }
        }

        let wanted = normalized(name);
        let mut page = 1;
        let mut found_tag: Option<WooTag> = None;
        loop {
            let tags = self.list_tags(page, DEFAULT_PAGE_SIZE, None).await?;
            let count = tags.len();
            for tag in tags {
                if normalized(&tag.name) == wanted {
                    match &found_tag {
                        Some(existing)
                            if existing.id.unwrap_or(i64::MAX) <= tag.id.unwrap_or(i64::MAX) => {}
                        _ => found_tag = Some(tag),
                    }
                }
            }
            if count < DEFAULT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        if let Some(found) = found_tag {
            let resolved = match stable_id {
                Some(stable_id) => {
                    let slug = capped_slug(stable_id);
                    if found.slug.as_deref() != Some(slug.as_str()) {
                        let updated = self
                            .update_tag(
                                found.id.unwrap_or_default(),
                                &WooTag {
                                    id: None,
                                    name: found.name.clone(),
                                    slug: Some(slug),
                                    description: found.description.clone(),
                                },
                            )
                            .await?;
                        cached_tag_from(&updated)
                    } else {
                        cached_tag_from(&found)
                    }
                }
                None => cached_tag_from(&found),
            };
            self.cache().set_term(key, resolved.clone()).await;
            return Ok(resolved);
        }

        info!(platform = %self.platform(), name, "Creating product tag");
        let created = self
            .create_tag(&WooTag {
                id: None,
                name: name.to_string(),
                slug: stable_id.map(capped_slug),
                description: None,
            })
            .await?;
        let resolved = cached_tag_from(&created);
        self.cache().set_term(key, resolved.clone()).await;
        Ok(resolved)
    }
}

fn cached_term_from(term: &WooAttributeTerm) -> CachedTerm {
    CachedTerm {
        id: term.id.unwrap_or_default(),
        name: term.name.clone(),
        slug: term.slug.clone(),
        description: term.description.clone(),
    }
}

fn cached_category_from(category: &WooCategory) -> CachedTerm {
    CachedTerm {
        id: category.id.unwrap_or_default(),
        name: category.name.clone(),
        slug: category.slug.clone(),
        description: category.description.clone(),
    }
}

fn cached_tag_from(tag: &WooTag) -> CachedTerm {
    CachedTerm {
        id: tag.id.unwrap_or_default(),
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        description: tag.description.clone(),
    }
}
