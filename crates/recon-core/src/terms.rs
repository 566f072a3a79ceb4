//! Term aggregation across extraction rules
//!
//! Several extraction rules can be attached to one record source. Their term
//! lists are merged into a single deduplicated set that says which columns the
//! source is expected to expose.

use std::collections::BTreeSet;

use crate::models::ExtractionRule;

/// Union of every rule's terms. Blank terms are ignored; surrounding
/// whitespace is trimmed before deduplication.
pub fn aggregate_terms(rules: &[ExtractionRule]) -> BTreeSet<String> {
    rules
        .iter()
        .flat_map(|rule| rule.terms.iter())
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_terms(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_dedupes_across_rules() {
        let rules = vec![
            ExtractionRule::new("sales", &["Date", "Amount", "Rest ID"]),
            ExtractionRule::new("payments", &["Amount", "Description", " Date "]),
        ];
        let terms = aggregate_terms(&rules);
        let terms: Vec<&str> = terms.iter().map(String::as_str).collect();
        assert_eq!(terms, vec!["Amount", "Date", "Description", "Rest ID"]);
    }

    #[test]
    fn test_aggregate_order_insensitive() {
        let a = vec![
            ExtractionRule::new("a", &["X", "Y"]),
            ExtractionRule::new("b", &["Z"]),
        ];
        let b = vec![
            ExtractionRule::new("b", &["Z"]),
            ExtractionRule::new("a", &["Y", "X"]),
        ];
        assert_eq!(aggregate_terms(&a), aggregate_terms(&b));
    }

    #[test]
    fn test_aggregate_skips_blank_terms() {
        let rules = vec![ExtractionRule::new("r", &["", "  ", "Amount"])];
        assert_eq!(aggregate_terms(&rules).len(), 1);
    }
}
