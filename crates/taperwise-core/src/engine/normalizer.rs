//! Dose normalizer.
//!
//! Handles:
//! - Alias expansion (medrol→methylprednisolone, lexapro→escitalopram)
//! - Conversion to reference-equivalent dose (prednisone mg, fluoxetine mg)
//! - Close-match suggestions for unrecognized drug names

use std::sync::Arc;

use strsim::{jaro_winkler, normalized_levenshtein};
use tracing::warn;

use crate::models::{DrugProfile, DrugTable, NormalizationBasis, NormalizedDose};

/// Minimum similarity for a name to be suggested.
const MIN_SUGGESTION_SCORE: f64 = 0.75;

/// Maximum number of suggestions returned.
const MAX_SUGGESTIONS: usize = 3;

/// Convert a dose to its reference-equivalent dose. No rounding.
pub fn normalize(drug: &DrugProfile, dose: f64, reference_factor: f64) -> f64 {
    (dose / drug.equivalence_factor) * reference_factor
}

/// Convert a reference-equivalent dose into a drug's own mg.
pub fn denormalize(drug: &DrugProfile, equivalent: f64, reference_factor: f64) -> f64 {
    (equivalent / reference_factor) * drug.equivalence_factor
}

/// Normalizer over one drug table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: Arc<DrugTable>,
}

impl Normalizer {
    pub fn new(table: Arc<DrugTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DrugTable {
        &self.table
    }

    /// Normalize a named drug dose.
    ///
    /// Unknown drugs take the passthrough path: the dose is used unchanged and the
    /// result is marked [`NormalizationBasis::UnknownDrugPassthrough`].
    pub fn normalize(&self, drug_name: &str, dose: f64) -> NormalizedDose {
        let canonical = self.table.canonical_name(drug_name);
        let reference = self.table.reference_name().to_string();

        match self.table.get(&canonical) {
            Some(profile) => NormalizedDose {
                drug_name: canonical,
                reference,
                value: normalize(profile, dose, self.table.reference_factor()),
                basis: NormalizationBasis::Equivalence,
            },
            None => self.unknown_drug_passthrough(canonical, reference, dose),
        }
    }

    fn unknown_drug_passthrough(&self, drug_name: String, reference: String, dose: f64) -> NormalizedDose {
        warn!(
            drug = %drug_name,
            reference = %reference,
            "Drug not in reference table, using dose unchanged"
        );
        NormalizedDose {
            drug_name,
            reference,
            value: dose,
            basis: NormalizationBasis::UnknownDrugPassthrough,
        }
    }

    /// Suggest known names close to an unrecognized one, best first.
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, String)> = self
            .table
            .known_names()
            .map(|candidate| (fuzzy_match(&query, candidate), candidate.to_string()))
            .filter(|(score, _)| *score >= MIN_SUGGESTION_SCORE)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut suggestions = Vec::new();
        for (_, candidate) in scored {
            let generic = self.table.canonical_name(&candidate);
            let label = if generic == candidate {
                candidate
            } else {
                format!("{} ({})", candidate, generic)
            };
            if !suggestions.contains(&label) {
                suggestions.push(label);
            }
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
        }
        suggestions
    }
}

/// Compute fuzzy string similarity using combined metrics.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler favors shared prefixes, Levenshtein overall shape
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steroid_normalizer() -> Normalizer {
        Normalizer::new(Arc::new(DrugTable::corticosteroids()))
    }

    #[test]
    fn test_reference_drug_identity() {
        let normalizer = steroid_normalizer();
        let result = normalizer.normalize("prednisone", 20.0);

        assert_eq!(result.value, 20.0);
        assert_eq!(result.reference, "prednisone");
        assert_eq!(result.basis, NormalizationBasis::Equivalence);
    }

    #[test]
    fn test_equivalence_conversion() {
        let normalizer = steroid_normalizer();

        // 4 mg dexamethasone ≈ 26.67 mg prednisone
        let dex = normalizer.normalize("dexamethasone", 4.0);
        assert!((dex.value - 26.6667).abs() < 0.001);

        // 20 mg hydrocortisone = 5 mg prednisone
        let hc = normalizer.normalize("Cortef", 20.0);
        assert_eq!(hc.drug_name, "hydrocortisone");
        assert!((hc.value - 5.0).abs() < 1e-9);

        // 16 mg methylprednisolone = 20 mg prednisone
        let mp = normalizer.normalize("medrol", 16.0);
        assert!((mp.value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_drug_passthrough() {
        let normalizer = steroid_normalizer();
        let result = normalizer.normalize("Budesonide", 9.0);

        assert_eq!(result.value, 9.0);
        assert_eq!(result.drug_name, "budesonide");
        assert_eq!(result.basis, NormalizationBasis::UnknownDrugPassthrough);
    }

    #[test]
    fn test_denormalize_inverts_normalize() {
        let table = DrugTable::antidepressants();
        let sertraline = table.get("sertraline").unwrap();

        let eq = normalize(sertraline, 100.0, 20.0);
        assert!((eq - 40.0).abs() < 1e-9);
        assert!((denormalize(sertraline, eq, 20.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_suggest_misspelling() {
        let normalizer = steroid_normalizer();

        let suggestions = normalizer.suggest("prednisolne");
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0], "prednisolone");

        let suggestions = normalizer.suggest("decadorn");
        assert!(suggestions.iter().any(|s| s == "decadron (dexamethasone)"));
    }

    #[test]
    fn test_suggest_nothing_close() {
        let normalizer = steroid_normalizer();
        assert!(normalizer.suggest("xyz").is_empty());
        assert!(normalizer.suggest("").is_empty());
    }
}
