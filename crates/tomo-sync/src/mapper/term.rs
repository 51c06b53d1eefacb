//! Taxonomy term mapping helpers.

use tomo_core::{richtext, TaxonomyKind, TaxonomyTerm};

/// Resolve a store attribute name to an internal taxonomy kind.
///
/// Store attributes may carry Spanish or English names depending on who
/// created them, so matching goes through a case-insensitive alias table.
#[must_use]
pub fn kind_for_attribute_name(name: &str) -> Option<TaxonomyKind> {
    match name.trim().to_lowercase().as_str() {
        "autor" | "author" | "autores" | "authors" => Some(TaxonomyKind::Author),
        "editorial" | "publisher" | "editoriales" => Some(TaxonomyKind::Publisher),
        "sello" | "imprint" => Some(TaxonomyKind::Imprint),
        "coleccion" | "colección" | "collection" => Some(TaxonomyKind::Collection),
        "obra" | "work" => Some(TaxonomyKind::Work),
        "marca" | "brand" => Some(TaxonomyKind::Brand),
        _ => None,
    }
}

/// Plain-text description for pushing a term to the store. Empty
/// descriptions collapse to `None`.
#[must_use]
pub fn description_text(term: &TaxonomyTerm) -> Option<String> {
    let text = richtext::to_plain_text(&term.description);
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomo_core::RichBlock;

    #[test]
    fn test_alias_table_both_languages() {
        assert_eq!(kind_for_attribute_name("Autor"), Some(TaxonomyKind::Author));
        assert_eq!(
            kind_for_attribute_name("author"),
            Some(TaxonomyKind::Author)
        );
        assert_eq!(
            kind_for_attribute_name("EDITORIAL"),
            Some(TaxonomyKind::Publisher)
        );
        assert_eq!(
            kind_for_attribute_name("Colección"),
            Some(TaxonomyKind::Collection)
        );
        assert_eq!(kind_for_attribute_name("color"), None);
    }

    #[test]
    fn test_description_text_collapses_empty() {
        let mut term = TaxonomyTerm::new(TaxonomyKind::Author, "García");
        assert_eq!(description_text(&term), None);

        term.description = vec![RichBlock::paragraph("Nació en Aracataca.")];
        assert_eq!(
            description_text(&term).as_deref(),
            Some("Nació en Aracataca.")
        );
    }
}
