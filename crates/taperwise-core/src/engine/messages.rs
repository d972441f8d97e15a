//! Message catalog: (message key, mode) → text.
//!
//! Decision logic picks keys; this table owns all phrasing. Both tracks exist for
//! every key. Templates use `{name}` placeholders filled by [`MessageCatalog::render`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::MessageMode;

/// Every message the composers can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    // Taper base messages
    HighRiskTaper,
    HighRiskMonitoring,
    ModerateRiskTaper,
    ModerateRiskSymptoms,
    LowRiskTaper,
    LongTermUse,
    AdrenalCrisisWarning,

    // Taper comorbidity alerts
    DiabetesAlert,
    HypertensionAlert,
    OsteoporosisAlert,
    PsychiatricHistoryAlert,
    ActiveInfectionAlert,
    PepticUlcerAlert,

    // Switch base messages
    WashoutThenStart,
    DirectSwitch,
    CautiousCrossTaper,
    CrossTaper,
    MoodCrisisWarning,

    // Switch alerts
    SerotoninSyndrome,
    FluoxetineWashout,
    ParoxetineWithdrawal,
    VenlafaxineWithdrawal,
    DuloxetineWithdrawal,
    DesvenlafaxineWithdrawal,
    CypOverlap,
    DestinationDoseClamped,
}

/// Built-in English phrasing: (key, clinical, patient).
const DEFAULT_MESSAGES: &[(MessageKey, &str, &str)] = &[
    (
        MessageKey::HighRiskTaper,
        "High risk of HPA-axis suppression: use a slow taper with dose reductions no faster than the schedule below.",
        "Your body may have stopped making enough of its own steroid hormone. Lower the dose slowly, exactly as scheduled.",
    ),
    (
        MessageKey::HighRiskMonitoring,
        "Consider a morning cortisol level before dropping below physiological dose (about 5 mg prednisone) and monitor for adrenal insufficiency.",
        "Your clinician may order a morning blood test before the last steps. Report tiredness, dizziness or nausea.",
    ),
    (
        MessageKey::ModerateRiskTaper,
        "Moderate risk of HPA-axis suppression: gradual taper recommended.",
        "Lower your dose step by step over several weeks rather than stopping at once.",
    ),
    (
        MessageKey::ModerateRiskSymptoms,
        "Review for withdrawal symptoms (fatigue, arthralgia, hypotension) at each step.",
        "Tell your care team if you feel very tired, achy or light-headed while lowering the dose.",
    ),
    (
        MessageKey::LowRiskTaper,
        "Low risk of HPA-axis suppression: short taper or abrupt discontinuation is generally safe.",
        "Short courses like yours usually stop safely with a quick taper.",
    ),
    (
        MessageKey::LongTermUse,
        "Long-term glucocorticoid exposure: assess bone density, glucose and blood pressure, and consider stress-dose cover for intercurrent illness or surgery.",
        "After long use, your care team may check your bones, blood sugar and blood pressure, and give extra steroid if you become ill or need surgery.",
    ),
    (
        MessageKey::AdrenalCrisisWarning,
        "Counsel on adrenal crisis: vomiting, severe weakness, hypotension or confusion require emergency assessment and parenteral hydrocortisone.",
        "Get emergency care right away if you have vomiting, severe weakness, fainting or confusion.",
    ),
    (
        MessageKey::DiabetesAlert,
        "Diabetes: glucose may fall as the dose is reduced; review hypoglycemic therapy.",
        "Diabetes: your blood sugar may drop as the dose goes down. Check it more often.",
    ),
    (
        MessageKey::HypertensionAlert,
        "Hypertension: monitor blood pressure; antihypertensive requirements may change.",
        "High blood pressure: keep checking your blood pressure, your medicines may need adjusting.",
    ),
    (
        MessageKey::OsteoporosisAlert,
        "Osteoporosis: continue bone protection and consider DXA follow-up.",
        "Bone health: keep taking your bone-protecting medicines and calcium as advised.",
    ),
    (
        MessageKey::PsychiatricHistoryAlert,
        "Psychiatric history: steroid withdrawal may precipitate mood disturbance; monitor mental state.",
        "Mental health: lowering steroids can affect mood. Tell someone you trust and your care team about any changes.",
    ),
    (
        MessageKey::ActiveInfectionAlert,
        "Active infection: avoid tapering below physiological dose until the infection is controlled.",
        "Infection: your care team may pause the last steps until the infection has cleared.",
    ),
    (
        MessageKey::PepticUlcerAlert,
        "Peptic ulcer disease: maintain gastroprotection during the taper.",
        "Stomach ulcers: keep taking your stomach-protecting medicine while lowering the dose.",
    ),
    (
        MessageKey::WashoutThenStart,
        "Stop the current agent and allow a washout period before starting the new agent at its minimum dose.",
        "Stop your current medicine, wait for the gap shown in the schedule, then start the new medicine at a low dose.",
    ),
    (
        MessageKey::DirectSwitch,
        "Same-class switch: stop the current agent and start the new agent the next day at the equivalent dose.",
        "Your two medicines work the same way, so you can stop the old one and start the new one the next day.",
    ),
    (
        MessageKey::CautiousCrossTaper,
        "Cross-taper over two-week intervals with close monitoring for serotonergic adverse effects.",
        "You will lower the old medicine while slowly raising the new one, changing doses every two weeks.",
    ),
    (
        MessageKey::CrossTaper,
        "Cross-taper: reduce the current agent while titrating the new agent over four weeks.",
        "You will lower the old medicine while raising the new one over about four weeks.",
    ),
    (
        MessageKey::MoodCrisisWarning,
        "Screen for suicidal ideation at every contact during the switch and provide crisis resources.",
        "If you have thoughts of harming yourself, contact emergency services or a crisis line immediately.",
    ),
    (
        MessageKey::SerotoninSyndrome,
        "Serotonin syndrome risk: both agents are serotonergic reuptake inhibitors; monitor for agitation, tremor, hyperthermia and clonus during overlap.",
        "Taking both medicines together for a while can cause a serious reaction. Seek help for shaking, fever, fast heartbeat or agitation.",
    ),
    (
        MessageKey::FluoxetineWashout,
        "Fluoxetine has a long half-life (active metabolite norfluoxetine): allow a washout before starting the new agent to avoid accumulation.",
        "Fluoxetine stays in your body for weeks, so there is a waiting period before the new medicine starts.",
    ),
    (
        MessageKey::ParoxetineWithdrawal,
        "Paroxetine carries a high risk of discontinuation syndrome; avoid abrupt cessation.",
        "Stopping paroxetine too fast often causes dizziness and flu-like feelings. Follow the schedule closely.",
    ),
    (
        MessageKey::VenlafaxineWithdrawal,
        "Venlafaxine has a short half-life and marked discontinuation symptoms; taper in small decrements.",
        "Venlafaxine can cause strong withdrawal feelings such as 'brain zaps'. Lower it slowly.",
    ),
    (
        MessageKey::DuloxetineWithdrawal,
        "Duloxetine discontinuation symptoms are common; consider a slower final reduction.",
        "Duloxetine can cause withdrawal feelings. Tell your care team if the steps feel too fast.",
    ),
    (
        MessageKey::DesvenlafaxineWithdrawal,
        "Desvenlafaxine: monitor for discontinuation symptoms after each reduction.",
        "Desvenlafaxine can cause withdrawal feelings after each dose drop.",
    ),
    (
        MessageKey::CypOverlap,
        "Shared metabolic pathway ({pathways}): review for pharmacokinetic interaction during overlap.",
        "Both medicines are processed by the same liver enzymes ({pathways}). Your care team will check for interactions.",
    ),
    (
        MessageKey::DestinationDoseClamped,
        "Equivalent dose adjusted to {dose} mg to stay within the {drug} range ({min}-{max} mg).",
        "The new medicine dose was set to {dose} mg to stay within its usual range.",
    ),
];

/// Lookup table of message text by key and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCatalog {
    entries: HashMap<(MessageKey, MessageMode), String>,
}

/// Override file entry: both tracks optional.
#[derive(Debug, Clone, Deserialize)]
struct MessageOverride {
    clinical: Option<String>,
    patient: Option<String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for (key, clinical, patient) in DEFAULT_MESSAGES {
            entries.insert((*key, MessageMode::Clinical), clinical.to_string());
            entries.insert((*key, MessageMode::Patient), patient.to_string());
        }
        Self { entries }
    }
}

impl MessageCatalog {
    /// Built-in catalog overlaid with JSON overrides (`{"key": {"clinical": "...", "patient": "..."}}`).
    pub fn from_json_overrides(json: &str) -> Result<Self, serde_json::Error> {
        let overrides: HashMap<MessageKey, MessageOverride> = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        for (key, o) in overrides {
            if let Some(text) = o.clinical {
                catalog.set(key, MessageMode::Clinical, text);
            }
            if let Some(text) = o.patient {
                catalog.set(key, MessageMode::Patient, text);
            }
        }
        Ok(catalog)
    }

    /// Replace the text for one key and mode.
    pub fn set(&mut self, key: MessageKey, mode: MessageMode, text: String) {
        self.entries.insert((key, mode), text);
    }

    /// Text for a key and mode. Falls back to the key name if missing.
    pub fn text(&self, key: MessageKey, mode: MessageMode) -> String {
        self.entries
            .get(&(key, mode))
            .cloned()
            .unwrap_or_else(|| format!("{:?}", key))
    }

    /// Text with `{name}` placeholders replaced.
    pub fn render(&self, key: MessageKey, mode: MessageMode, vars: &[(&str, &str)]) -> String {
        let mut text = self.text(key, mode);
        for (name, value) in vars {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}
