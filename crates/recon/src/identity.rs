//! Canonical forms for customer names and Chilean RUTs.
//!
//! Both vendors store identity sloppily (mixed case, diacritics, dotted
//! RUTs, stray whitespace), so every comparison in the resolver goes
//! through these functions first.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a customer name: lowercase, NFD-decompose and drop
/// combining marks, collapse whitespace runs. Idempotent; empty or
/// absent input yields the empty string.
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize a RUT into `body-dv` form (`"12345678-5"`).
///
/// Total over malformed input: anything shorter than two characters or
/// with a non-numeric body yields `None`, never an error. Callers must
/// treat `None` as "no deterministic match possible".
pub fn normalize_rut(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '.' && *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if cleaned.len() < 2 {
        return None;
    }
    let (body, dv) = cleaned.split_at(cleaned.len() - 1);
    // Integer round-trip drops leading zeros, matching how the Billing
    // Service stores tax numbers.
    let body: i64 = body.parse().ok()?;
    Some(format!("{body}-{dv}"))
}

/// Similarity between two already-normalized names, in [0, 1].
/// Both inputs empty scores 0.0; an empty name matches nothing.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_lowercases_and_strips_diacritics() {
        assert_eq!(normalize_name("José  Pérez"), "jose perez");
        assert_eq!(normalize_name("  MARÍA   ÑUÑEZ "), "maria nunez");
    }

    #[test]
    fn name_normalization_is_idempotent() {
        for raw in ["José  Pérez", "", "   ", "CLIENTE por Defecto", "Ägidius O'Brien"] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn empty_name_is_empty_string() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn rut_strips_separators_and_inserts_delimiter() {
        assert_eq!(normalize_rut("12.345.678-5").as_deref(), Some("12345678-5"));
        assert_eq!(normalize_rut("12345678-5").as_deref(), Some("12345678-5"));
        assert_eq!(normalize_rut("123456785").as_deref(), Some("12345678-5"));
        assert_eq!(normalize_rut(" 12345678k ").as_deref(), Some("12345678-K"));
    }

    #[test]
    fn rut_drops_leading_zeros_in_body() {
        assert_eq!(normalize_rut("0012345678-5").as_deref(), Some("12345678-5"));
    }

    #[test]
    fn rut_is_total_over_malformed_input() {
        assert_eq!(normalize_rut(""), None);
        assert_eq!(normalize_rut("5"), None);
        assert_eq!(normalize_rut("-"), None);
        assert_eq!(normalize_rut("ABCDEF-5"), None);
        assert_eq!(normalize_rut("12a45678-5"), None);
    }

    #[test]
    fn similarity_empty_pair_scores_zero() {
        assert_eq!(name_similarity("", ""), 0.0);
    }

    #[test]
    fn similarity_pins_known_values() {
        assert_eq!(name_similarity("juan perez", "juan perez"), 1.0);
        // One substitution over ten characters.
        let s = name_similarity("juan perez", "juan peres");
        assert!((s - 0.9).abs() < 1e-9, "got {s}");
        assert!(name_similarity("juan perez", "ana soto") < 0.5);
    }
}
