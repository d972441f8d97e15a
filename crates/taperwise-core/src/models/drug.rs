//! Drug reference data: profiles and the injectable reference table.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pharmacological class of a drug.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DrugClass {
    Glucocorticoid,
    Ssri,
    Snri,
    Tca,
    /// Noradrenergic and specific serotonergic antidepressant
    Nassa,
    /// Norepinephrine-dopamine reuptake inhibitor
    Ndri,
    /// Serotonin antagonist and reuptake inhibitor
    Sari,
    Multimodal,
}

impl DrugClass {
    /// SSRIs and SNRIs, the classes that stack serotonergic load during a switch.
    pub fn is_serotonergic_reuptake(&self) -> bool {
        matches!(self, DrugClass::Ssri | DrugClass::Snri)
    }
}

/// Qualitative level for side-effect attributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Elimination half-life descriptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HalfLife {
    Short,
    Intermediate,
    Long,
}

/// Side-effect profile of a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskProfile {
    pub sedation: RiskLevel,
    pub weight_gain: RiskLevel,
    pub sexual_dysfunction: RiskLevel,
    pub qt_prolongation: RiskLevel,
}

impl RiskProfile {
    /// Profile with every attribute at the same level.
    pub fn uniform(level: RiskLevel) -> Self {
        Self {
            sedation: level,
            weight_gain: level,
            sexual_dysfunction: level,
            qt_prolongation: level,
        }
    }
}

/// Static reference data for a single drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugProfile {
    /// Generic name, lowercase
    pub name: String,
    /// Brand names and alternative spellings
    #[serde(default)]
    pub aliases: Vec<String>,
    pub class: DrugClass,
    /// Dose (mg) equivalent to one reference unit of the class reference compound
    pub equivalence_factor: f64,
    /// Minimum therapeutic dose (mg)
    pub min_dose: f64,
    /// Maximum therapeutic dose (mg)
    pub max_dose: f64,
    pub half_life: HalfLife,
    /// Onset of action, free text (e.g. "2-4 weeks")
    pub onset: String,
    pub risks: RiskProfile,
    /// Free-text metabolism/interaction description (e.g. "Potent CYP2D6 inhibitor")
    #[serde(default)]
    pub metabolism: String,
    /// Drug-free interval required before starting a new agent
    #[serde(default)]
    pub washout_weeks: u32,
}

impl DrugProfile {
    /// Create a profile with required fields and neutral defaults.
    pub fn new(name: &str, class: DrugClass, equivalence_factor: f64) -> Self {
        Self {
            name: name.to_lowercase(),
            aliases: Vec::new(),
            class,
            equivalence_factor,
            min_dose: 0.0,
            max_dose: f64::MAX,
            half_life: HalfLife::Intermediate,
            onset: String::new(),
            risks: RiskProfile::uniform(RiskLevel::Low),
            metabolism: String::new(),
            washout_weeks: 0,
        }
    }

    /// Clamp a dose into this drug's therapeutic range.
    pub fn clamp_to_range(&self, dose: f64) -> f64 {
        dose.clamp(self.min_dose, self.max_dose)
    }

    /// Check if a dose lies within the therapeutic range.
    pub fn is_in_range(&self, dose: f64) -> bool {
        dose >= self.min_dose && dose <= self.max_dose
    }

    fn with_range(mut self, min_dose: f64, max_dose: f64) -> Self {
        self.min_dose = min_dose;
        self.max_dose = max_dose;
        self
    }

    fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_lowercase()).collect();
        self
    }

    fn with_kinetics(mut self, half_life: HalfLife, onset: &str) -> Self {
        self.half_life = half_life;
        self.onset = onset.to_string();
        self
    }

    fn with_risks(
        mut self,
        sedation: RiskLevel,
        weight_gain: RiskLevel,
        sexual_dysfunction: RiskLevel,
        qt_prolongation: RiskLevel,
    ) -> Self {
        self.risks = RiskProfile {
            sedation,
            weight_gain,
            sexual_dysfunction,
            qt_prolongation,
        };
        self
    }

    fn with_metabolism(mut self, metabolism: &str) -> Self {
        self.metabolism = metabolism.to_string();
        self
    }

    fn with_washout(mut self, weeks: u32) -> Self {
        self.washout_weeks = weeks;
        self
    }
}

/// Errors loading or building a drug table.
#[derive(Error, Debug)]
pub enum DrugTableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid drug table: {0}")]
    Invalid(String),
}

/// Serialized form of a drug table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DrugTableFile {
    reference: String,
    drugs: Vec<DrugProfile>,
}

/// Immutable reference table for one drug family.
///
/// Every profile's equivalence factor is relative to the reference compound,
/// whose own factor is the reference factor (e.g. 5 mg prednisone).
#[derive(Debug, Clone, PartialEq)]
pub struct DrugTable {
    reference: String,
    profiles: HashMap<String, DrugProfile>,
    /// alias → generic name
    aliases: HashMap<String, String>,
}

impl DrugTable {
    /// Build a table from profiles. The reference compound must be present.
    pub fn new(reference: &str, drugs: Vec<DrugProfile>) -> Result<Self, DrugTableError> {
        for drug in &drugs {
            validate_profile(drug)?;
        }

        let reference = reference.to_lowercase();
        if !drugs.iter().any(|d| d.name.to_lowercase() == reference) {
            return Err(DrugTableError::Invalid(format!(
                "reference compound {} missing from table",
                reference
            )));
        }

        Ok(Self::assemble(reference, drugs))
    }

    /// Index profiles and aliases without validation.
    fn assemble(reference: String, drugs: Vec<DrugProfile>) -> Self {
        let mut profiles = HashMap::new();
        let mut aliases = HashMap::new();

        for drug in drugs {
            let name = drug.name.to_lowercase();
            for alias in &drug.aliases {
                aliases.insert(alias.to_lowercase(), name.clone());
            }
            profiles.insert(name, drug);
        }

        Self {
            reference,
            profiles,
            aliases,
        }
    }

    /// Load a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DrugTableError> {
        let file: DrugTableFile = serde_json::from_str(json)?;
        Self::new(&file.reference, file.drugs)
    }

    /// Load a table from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DrugTableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the table to JSON (profiles sorted by name).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let file = DrugTableFile {
            reference: self.reference.clone(),
            drugs: self.profiles_sorted().into_iter().cloned().collect(),
        };
        serde_json::to_string_pretty(&file)
    }

    /// Name of the reference compound.
    pub fn reference_name(&self) -> &str {
        &self.reference
    }

    /// Equivalence factor of the reference compound.
    pub fn reference_factor(&self) -> f64 {
        self.profiles
            .get(&self.reference)
            .map(|p| p.equivalence_factor)
            .unwrap_or(1.0)
    }

    /// Look up a profile by generic name or alias (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&DrugProfile> {
        let key = self.canonical_name(name);
        self.profiles.get(&key)
    }

    /// Resolve an alias to its generic name. Unknown names pass through lowercased.
    pub fn canonical_name(&self, name: &str) -> String {
        let lower = name.trim().to_lowercase();
        self.aliases.get(&lower).cloned().unwrap_or(lower)
    }

    /// All generic names and aliases, for fuzzy matching.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        self.profiles
            .keys()
            .map(String::as_str)
            .chain(self.aliases.keys().map(String::as_str))
    }

    /// Profiles sorted by name.
    pub fn profiles_sorted(&self) -> Vec<&DrugProfile> {
        let mut profiles: Vec<&DrugProfile> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Built-in systemic glucocorticoid table (reference: prednisone 5 mg).
    pub fn corticosteroids() -> Self {
        Self::assemble("prednisone".into(), corticosteroid_profiles())
    }

    /// Built-in antidepressant table (reference: fluoxetine 20 mg).
    pub fn antidepressants() -> Self {
        Self::assemble("fluoxetine".into(), antidepressant_profiles())
    }
}

fn validate_profile(drug: &DrugProfile) -> Result<(), DrugTableError> {
    if drug.equivalence_factor.is_nan() || drug.equivalence_factor <= 0.0 {
        return Err(DrugTableError::Invalid(format!(
            "{} has non-positive equivalence factor",
            drug.name
        )));
    }
    if !drug.min_dose.is_finite() || !drug.max_dose.is_finite() {
        return Err(DrugTableError::Invalid(format!(
            "{} has a non-finite dose range",
            drug.name
        )));
    }
    if drug.min_dose > drug.max_dose {
        return Err(DrugTableError::Invalid(format!(
            "{} has min dose above max dose",
            drug.name
        )));
    }
    Ok(())
}

fn corticosteroid_profiles() -> Vec<DrugProfile> {
    use DrugClass::Glucocorticoid as G;
    use HalfLife::*;

    vec![
        DrugProfile::new("prednisone", G, 5.0)
            .with_aliases(&["deltasone", "rayos", "pred"])
            .with_range(1.0, 80.0)
            .with_kinetics(Intermediate, "hours"),
        DrugProfile::new("prednisolone", G, 5.0)
            .with_aliases(&["orapred", "millipred"])
            .with_range(1.0, 80.0)
            .with_kinetics(Intermediate, "hours"),
        DrugProfile::new("methylprednisolone", G, 4.0)
            .with_aliases(&["medrol", "solu-medrol", "depo-medrol"])
            .with_range(2.0, 64.0)
            .with_kinetics(Intermediate, "hours"),
        DrugProfile::new("hydrocortisone", G, 20.0)
            .with_aliases(&["cortef", "solu-cortef"])
            .with_range(5.0, 240.0)
            .with_kinetics(Short, "hours"),
        DrugProfile::new("cortisone", G, 25.0)
            .with_range(5.0, 300.0)
            .with_kinetics(Short, "hours"),
        DrugProfile::new("dexamethasone", G, 0.75)
            .with_aliases(&["decadron", "dex"])
            .with_range(0.5, 16.0)
            .with_kinetics(Long, "hours"),
        DrugProfile::new("betamethasone", G, 0.6)
            .with_aliases(&["celestone"])
            .with_range(0.5, 9.0)
            .with_kinetics(Long, "hours"),
        DrugProfile::new("triamcinolone", G, 4.0)
            .with_aliases(&["kenalog"])
            .with_range(2.0, 48.0)
            .with_kinetics(Intermediate, "hours"),
        DrugProfile::new("deflazacort", G, 6.0)
            .with_aliases(&["emflaza"])
            .with_range(6.0, 90.0)
            .with_kinetics(Intermediate, "hours"),
    ]
}

fn antidepressant_profiles() -> Vec<DrugProfile> {
    use DrugClass::*;
    use HalfLife::*;
    use RiskLevel::{High as H, Low as L, Moderate as M};

    vec![
        DrugProfile::new("fluoxetine", Ssri, 20.0)
            .with_aliases(&["prozac", "sarafem"])
            .with_range(20.0, 80.0)
            .with_kinetics(Long, "2-4 weeks")
            .with_risks(L, L, H, L)
            .with_metabolism("Potent CYP2D6 inhibitor; moderate CYP2C19 inhibitor")
            .with_washout(1),
        DrugProfile::new("sertraline", Ssri, 50.0)
            .with_aliases(&["zoloft"])
            .with_range(50.0, 200.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(L, L, H, L)
            .with_metabolism("Substrate of CYP2B6 and CYP2C19; mild CYP2D6 inhibitor"),
        DrugProfile::new("paroxetine", Ssri, 20.0)
            .with_aliases(&["paxil", "seroxat"])
            .with_range(20.0, 50.0)
            .with_kinetics(Short, "2-4 weeks")
            .with_risks(M, H, H, L)
            .with_metabolism("Potent CYP2D6 inhibitor and substrate"),
        DrugProfile::new("citalopram", Ssri, 20.0)
            .with_aliases(&["celexa", "cipramil"])
            .with_range(20.0, 40.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(L, L, H, H)
            .with_metabolism("Substrate of CYP2C19 and CYP3A4"),
        DrugProfile::new("escitalopram", Ssri, 10.0)
            .with_aliases(&["lexapro", "cipralex"])
            .with_range(10.0, 20.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(L, L, M, M)
            .with_metabolism("Substrate of CYP2C19 and CYP3A4; weak CYP2D6 inhibitor"),
        DrugProfile::new("fluvoxamine", Ssri, 50.0)
            .with_aliases(&["luvox"])
            .with_range(50.0, 300.0)
            .with_kinetics(Short, "2-4 weeks")
            .with_risks(M, L, M, L)
            .with_metabolism("Potent CYP1A2 and CYP2C19 inhibitor"),
        DrugProfile::new("venlafaxine", Snri, 75.0)
            .with_aliases(&["effexor", "efexor"])
            .with_range(75.0, 375.0)
            .with_kinetics(Short, "2-4 weeks")
            .with_risks(L, L, H, M)
            .with_metabolism("Substrate of CYP2D6 and CYP3A4"),
        DrugProfile::new("desvenlafaxine", Snri, 50.0)
            .with_aliases(&["pristiq"])
            .with_range(50.0, 100.0)
            .with_kinetics(Short, "2-4 weeks")
            .with_risks(L, L, M, L)
            .with_metabolism("Minimal CYP involvement; conjugation"),
        DrugProfile::new("duloxetine", Snri, 60.0)
            .with_aliases(&["cymbalta"])
            .with_range(30.0, 120.0)
            .with_kinetics(Short, "2-4 weeks")
            .with_risks(L, L, M, L)
            .with_metabolism("Substrate of CYP1A2 and CYP2D6; moderate CYP2D6 inhibitor"),
        DrugProfile::new("mirtazapine", Nassa, 30.0)
            .with_aliases(&["remeron"])
            .with_range(15.0, 45.0)
            .with_kinetics(Intermediate, "1-2 weeks")
            .with_risks(H, H, L, L)
            .with_metabolism("Substrate of CYP1A2, CYP2D6 and CYP3A4"),
        DrugProfile::new("bupropion", Ndri, 300.0)
            .with_aliases(&["wellbutrin", "zyban"])
            .with_range(150.0, 450.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(L, L, L, L)
            .with_metabolism("Substrate of CYP2B6; potent CYP2D6 inhibitor"),
        DrugProfile::new("trazodone", Sari, 150.0)
            .with_aliases(&["desyrel", "oleptro"])
            .with_range(50.0, 400.0)
            .with_kinetics(Short, "1-2 weeks")
            .with_risks(H, L, L, M)
            .with_metabolism("Substrate of CYP3A4"),
        DrugProfile::new("vortioxetine", Multimodal, 10.0)
            .with_aliases(&["trintellix", "brintellix"])
            .with_range(5.0, 20.0)
            .with_kinetics(Long, "2-4 weeks")
            .with_risks(L, L, L, L)
            .with_metabolism("Substrate of CYP2D6"),
        DrugProfile::new("amitriptyline", Tca, 100.0)
            .with_aliases(&["elavil"])
            .with_range(25.0, 300.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(H, H, M, H)
            .with_metabolism("Substrate of CYP2C19 and CYP2D6"),
        DrugProfile::new("nortriptyline", Tca, 75.0)
            .with_aliases(&["pamelor", "aventyl"])
            .with_range(25.0, 150.0)
            .with_kinetics(Intermediate, "2-4 weeks")
            .with_risks(M, M, M, H)
            .with_metabolism("Substrate of CYP2D6"),
    ]
}
