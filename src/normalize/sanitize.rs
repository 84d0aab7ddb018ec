//! Text sanitization for category labels and identity normalization
//!
//! This module turns raw category labels into canonical collection
//! identifiers and provides the folding helpers shared with the identity
//! hasher: accent folding, whitespace collapsing, and case normalization.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::Error;

// Pre-compiled regex patterns for performance
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static SEPARATOR_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Reserved collection for records whose category is empty or unusable
pub const FALLBACK_COLLECTION: &str = "divers";

/// Maximum length of a collection identifier, in characters
pub const MAX_COLLECTION_NAME_LEN: usize = 50;

/// Derive a canonical collection identifier from a raw category label
///
/// Lower-cases, folds accents, replaces every run of non-alphanumeric
/// characters with a single underscore, strips edge underscores, and
/// truncates to [`MAX_COLLECTION_NAME_LEN`] characters. The result matches
/// `^[a-z0-9]+(_[a-z0-9]+)*$` and the function is idempotent.
///
/// Fails with [`Error::InvalidCategory`] only when the input reduces to
/// nothing; callers substitute [`FALLBACK_COLLECTION`] rather than
/// propagating, so ingestion never stalls on a malformed category.
///
/// # Examples
///
/// ```
/// use annuaire::normalize::sanitize::sanitize_collection_name;
///
/// assert_eq!(
///     sanitize_collection_name("Coiffeur / Barbier").unwrap(),
///     "coiffeur_barbier"
/// );
/// assert!(sanitize_collection_name("  --  ").is_err());
/// ```
pub fn sanitize_collection_name(raw: &str) -> Result<String, Error> {
    let folded = fold_accents(&raw.to_lowercase());

    let underscored: String = folded
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let collapsed = SEPARATOR_RUN_REGEX.replace_all(&underscored, "_");
    let trimmed = collapsed.trim_matches('_');

    let truncated: String = trimmed.chars().take(MAX_COLLECTION_NAME_LEN).collect();
    let name = truncated.trim_end_matches('_');

    if name.is_empty() {
        return Err(Error::InvalidCategory(raw.to_string()));
    }

    Ok(name.to_string())
}

/// Fold accented Latin characters to their ASCII base letter
///
/// Covers the accented forms that occur in French directory data (plus the
/// œ/æ ligatures). Characters outside the table pass through unchanged.
///
/// # Examples
///
/// ```
/// use annuaire::normalize::sanitize::fold_accents;
///
/// assert_eq!(fold_accents("Crêperie À l'Étoile"), "Creperie A l'Etoile");
/// ```
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'à' | 'â' | 'ä' | 'á' | 'ã' => out.push('a'),
            'À' | 'Â' | 'Ä' | 'Á' | 'Ã' => out.push('A'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'î' | 'ï' | 'í' => out.push('i'),
            'Î' | 'Ï' | 'Í' => out.push('I'),
            'ô' | 'ö' | 'ó' | 'õ' => out.push('o'),
            'Ô' | 'Ö' | 'Ó' | 'Õ' => out.push('O'),
            'ù' | 'û' | 'ü' | 'ú' => out.push('u'),
            'Ù' | 'Û' | 'Ü' | 'Ú' => out.push('U'),
            'ÿ' => out.push('y'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse any run of whitespace to a single space and trim the edges
///
/// # Examples
///
/// ```
/// use annuaire::normalize::sanitize::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  Le   Gourmet \t "), "Le Gourmet");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").to_string()
}

/// Normalize a text field for matching: lower-case, accent-folded,
/// whitespace-collapsed
///
/// This is the normalization behind both `searchable_name` and the identity
/// hash, so two spellings of the same establishment compare equal.
///
/// # Examples
///
/// ```
/// use annuaire::normalize::sanitize::normalize_for_matching;
///
/// assert_eq!(normalize_for_matching("  LE  Café "), "le cafe");
/// ```
pub fn normalize_for_matching(text: &str) -> String {
    collapse_whitespace(&fold_accents(&text.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_collection_name("Restaurant").unwrap(), "restaurant");
    }

    #[test]
    fn test_sanitize_separator_runs() {
        assert_eq!(
            sanitize_collection_name("Coiffeur / Barbier").unwrap(),
            "coiffeur_barbier"
        );
        assert_eq!(
            sanitize_collection_name("Plombier -- Chauffagiste").unwrap(),
            "plombier_chauffagiste"
        );
    }

    #[test]
    fn test_sanitize_accents() {
        assert_eq!(
            sanitize_collection_name("Boulangerie-Pâtisserie").unwrap(),
            "boulangerie_patisserie"
        );
        assert_eq!(sanitize_collection_name("Crêperie").unwrap(), "creperie");
    }

    #[test]
    fn test_sanitize_edge_underscores() {
        assert_eq!(sanitize_collection_name("  Garage !").unwrap(), "garage");
        assert_eq!(sanitize_collection_name("(Tabac)").unwrap(), "tabac");
    }

    #[test]
    fn test_sanitize_empty_is_invalid() {
        assert!(matches!(
            sanitize_collection_name(""),
            Err(Error::InvalidCategory(_))
        ));
        assert!(matches!(
            sanitize_collection_name("  / -- !  "),
            Err(Error::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_sanitize_truncates_to_max_len() {
        let long = "a".repeat(120);
        let name = sanitize_collection_name(&long).unwrap();
        assert_eq!(name.len(), MAX_COLLECTION_NAME_LEN);
    }

    #[test]
    fn test_sanitize_truncation_never_leaves_trailing_separator() {
        // 50th char lands on the separator between the two words
        let label = format!("{} {}", "a".repeat(49), "b".repeat(20));
        let name = sanitize_collection_name(&label).unwrap();
        assert!(!name.ends_with('_'));
        assert!(name.len() <= MAX_COLLECTION_NAME_LEN);
    }

    #[test]
    fn test_sanitize_idempotent() {
        for label in ["Coiffeur / Barbier", "Boulangerie-Pâtisserie", "a  b  c"] {
            let once = sanitize_collection_name(label).unwrap();
            let twice = sanitize_collection_name(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_sanitize_output_shape() {
        let shape = Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").unwrap();
        for label in [
            "Restaurant",
            "Coiffeur / Barbier",
            "Électricien agréé (24h/24)",
            "1er Choix Dépannage",
        ] {
            let name = sanitize_collection_name(label).unwrap();
            assert!(shape.is_match(&name), "bad shape: {name:?}");
        }
    }

    #[test]
    fn test_sanitize_non_latin_reduces_to_invalid() {
        // Characters with no ASCII folding become separators
        assert!(sanitize_collection_name("日本料理").is_err());
    }

    #[test]
    fn test_fold_accents_passthrough() {
        assert_eq!(fold_accents("plain ascii 123"), "plain ascii 123");
    }

    #[test]
    fn test_fold_accents_ligatures() {
        assert_eq!(fold_accents("œuf"), "oeuf");
        assert_eq!(fold_accents("Lætitia"), "Laetitia");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \t b\n\nc"), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_normalize_for_matching() {
        assert_eq!(
            normalize_for_matching("Café  de la GARE"),
            "cafe de la gare"
        );
        assert_eq!(
            normalize_for_matching("  le gourmet  "),
            normalize_for_matching("LE GOURMET")
        );
    }
}
