//! Metabolic pathway overlap check.
//!
//! Heuristic: extract `CYP…` isoenzyme tokens from each profile's free-text
//! metabolism descriptor and intersect them. It ignores whether a drug is a
//! substrate, inhibitor or inducer, so it both over- and under-flags. A
//! structured pathway-tagged interaction table would replace it.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::DrugProfile;

/// Matches isoenzyme names such as CYP2D6, CYP3A4, CYP1A2, CYP2C19.
static CYP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCYP\s?(\d[A-Z]\d{1,2})\b").expect("valid CYP regex"));

/// Extract normalized isoenzyme tokens (uppercase, no space) from free text.
pub fn cyp_tokens(text: &str) -> BTreeSet<String> {
    CYP_TOKEN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| format!("CYP{}", m.as_str().to_uppercase()))
        .collect()
}

/// Isoenzymes named in both drugs' metabolism descriptors, sorted.
pub fn shared_pathways(a: &DrugProfile, b: &DrugProfile) -> Vec<String> {
    let left = cyp_tokens(&a.metabolism);
    let right = cyp_tokens(&b.metabolism);
    left.intersection(&right).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrugClass, DrugTable};

    #[test]
    fn test_extracts_tokens() {
        let tokens = cyp_tokens("Potent CYP2D6 inhibitor; substrate of cyp3a4 and CYP 2C19");
        let expected: BTreeSet<String> = ["CYP2D6", "CYP3A4", "CYP2C19"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_no_tokens_in_plain_text() {
        assert!(cyp_tokens("Minimal CYP involvement; conjugation").is_empty());
        assert!(cyp_tokens("").is_empty());
    }

    #[test]
    fn test_shared_pathways_builtin() {
        let table = DrugTable::antidepressants();
        let fluoxetine = table.get("fluoxetine").unwrap();
        let escitalopram = table.get("escitalopram").unwrap();
        let desvenlafaxine = table.get("desvenlafaxine").unwrap();

        assert_eq!(shared_pathways(fluoxetine, escitalopram), vec!["CYP2C19", "CYP2D6"]);
        assert!(shared_pathways(fluoxetine, desvenlafaxine).is_empty());
    }

    #[test]
    fn test_shared_pathways_synthetic() {
        let mut a = DrugProfile::new("a", DrugClass::Ssri, 1.0);
        let mut b = DrugProfile::new("b", DrugClass::Snri, 1.0);
        a.metabolism = "CYP1A2 substrate".into();
        b.metabolism = "inhibits CYP1A2 strongly".into();

        assert_eq!(shared_pathways(&a, &b), vec!["CYP1A2"]);
    }
}
