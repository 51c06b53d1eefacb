//! Identity resolution for taxonomy terms.
//!
//! Inbound attribute options and term sweeps arrive as bare names. Matching
//! goes exact first, then case-insensitive substring (ambiguity is logged,
//! first hit wins), then a minimal record is created. New authors get their
//! name split heuristically and every new term claims the next legacy
//! sequence number.

use tracing::{debug, info, warn};

use tomo_core::{TaxonomyKind, TaxonomyTerm};

use crate::error::{SyncError, SyncResult};
use crate::store::{EntityStore, SaveMode};

/// Attempts at claiming a legacy sequence number before giving up.
const SEQ_CLAIM_ATTEMPTS: u32 = 3;

fn normalized(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Split an author name by token count: one token is a first name, two are
/// first name and surname, three or more keep the remainder as a second
/// surname.
#[must_use]
pub fn split_author_name(full_name: &str) -> (Option<String>, Option<String>, Option<String>) {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => (None, None, None),
        [first] => (Some((*first).to_string()), None, None),
        [first, last] => (Some((*first).to_string()), Some((*last).to_string()), None),
        [first, last, rest @ ..] => (
            Some((*first).to_string()),
            Some((*last).to_string()),
            Some(rest.join(" ")),
        ),
    }
}

/// Resolve a term by name, creating a minimal record when nothing matches.
pub async fn find_or_create_term(
    store: &dyn EntityStore,
    kind: TaxonomyKind,
    name: &str,
) -> SyncResult<TaxonomyTerm> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SyncError::validation(format!(
            "cannot resolve a {kind} term with an empty name"
        )));
    }
    let wanted = normalized(trimmed);

    let mut terms = store.list_terms(kind).await?;
    // Deterministic scan order regardless of the store's iteration order.
    terms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));

    if let Some(exact) = terms.iter().find(|t| normalized(&t.name) == wanted) {
        return Ok(exact.clone());
    }

    let partial: Vec<&TaxonomyTerm> = terms
        .iter()
        .filter(|t| {
            let existing = normalized(&t.name);
            existing.contains(&wanted) || wanted.contains(&existing)
        })
        .collect();
    if let Some(first) = partial.first() {
        if partial.len() > 1 {
            warn!(
                kind = %kind,
                name = trimmed,
                candidates = partial.len(),
                matched = %first.name,
                "Ambiguous partial term match, taking first hit"
            );
        } else {
            debug!(kind = %kind, name = trimmed, matched = %first.name, "Partial term match");
        }
        return Ok((*first).clone());
    }

    info!(kind = %kind, name = trimmed, "Creating catalog term");
    create_term_with_seq(store, kind, trimmed).await
}

/// Create a minimal term, retrying legacy-sequence collisions.
async fn create_term_with_seq(
    store: &dyn EntityStore,
    kind: TaxonomyKind,
    name: &str,
) -> SyncResult<TaxonomyTerm> {
    let mut last_err = None;
    for attempt in 0..SEQ_CLAIM_ATTEMPTS {
        let mut term = TaxonomyTerm::new(kind, name);
        if kind == TaxonomyKind::Author {
            let (first, last, second_last) = split_author_name(name);
            term.first_name = first;
            term.last_name = last;
            term.second_last_name = second_last;
        }
        let next_seq = store.max_legacy_seq(kind).await?.unwrap_or(0) + 1;
        term.legacy_seq = Some(next_seq);

        match store.create_term(&term, SaveMode::Normal).await {
            Ok(()) => return Ok(term),
            Err(err) if err.is_transient() && attempt + 1 < SEQ_CLAIM_ATTEMPTS => {
                warn!(
                    kind = %kind,
                    name,
                    seq = next_seq,
                    attempt = attempt + 1,
                    "Legacy sequence collision, retrying"
                );
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| SyncError::store("term creation failed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_split_author_name_by_token_count() {
        assert_eq!(
            split_author_name("Colette"),
            (Some("Colette".to_string()), None, None)
        );
        assert_eq!(
            split_author_name("Julio Cortázar"),
            (
                Some("Julio".to_string()),
                Some("Cortázar".to_string()),
                None
            )
        );
        assert_eq!(
            split_author_name("Gabriel García Márquez"),
            (
                Some("Gabriel".to_string()),
                Some("García".to_string()),
                Some("Márquez".to_string())
            )
        );
        assert_eq!(
            split_author_name("Ana de la Torre Vega"),
            (
                Some("Ana".to_string()),
                Some("de".to_string()),
                Some("la Torre Vega".to_string())
            )
        );
    }

    #[tokio::test]
    async fn test_exact_match_wins_over_partial() {
        let store = MemoryStore::new();
        let a = TaxonomyTerm::new(TaxonomyKind::Publisher, "Planeta");
        let b = TaxonomyTerm::new(TaxonomyKind::Publisher, "Planeta Cómic");
        store.create_term(&a, SaveMode::Normal).await.unwrap();
        store.create_term(&b, SaveMode::Normal).await.unwrap();

        let found = find_or_create_term(&store, TaxonomyKind::Publisher, "planeta")
            .await
            .unwrap();
        assert_eq!(found.id, a.id);
    }

    #[tokio::test]
    async fn test_partial_match_found() {
        let store = MemoryStore::new();
        let term = TaxonomyTerm::new(TaxonomyKind::Author, "Gabriel García Márquez");
        store.create_term(&term, SaveMode::Normal).await.unwrap();

        let found = find_or_create_term(&store, TaxonomyKind::Author, "García Márquez")
            .await
            .unwrap();
        assert_eq!(found.id, term.id);
    }

    #[tokio::test]
    async fn test_creates_author_with_split_name_and_seq() {
        let store = MemoryStore::new();
        let mut existing = TaxonomyTerm::new(TaxonomyKind::Author, "Alguien");
        existing.legacy_seq = Some(41);
        store.create_term(&existing, SaveMode::Normal).await.unwrap();

        let created = find_or_create_term(&store, TaxonomyKind::Author, "Mario Vargas Llosa")
            .await
            .unwrap();
        assert_eq!(created.first_name.as_deref(), Some("Mario"));
        assert_eq!(created.last_name.as_deref(), Some("Vargas"));
        assert_eq!(created.second_last_name.as_deref(), Some("Llosa"));
        assert_eq!(created.legacy_seq, Some(42));
    }

    #[tokio::test]
    async fn test_empty_name_is_validation_error() {
        let store = MemoryStore::new();
        let err = find_or_create_term(&store, TaxonomyKind::Tag, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
    }
}
