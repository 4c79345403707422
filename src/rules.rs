//! Rule engine: relative band powers → states, recommendations and alerts.
//!
//! Everything here is a pure function of the relative powers (plus, for
//! alerts, an optional spike count). Missing bands never fail: they are left
//! out of the per-band details and read as 0 by the threshold rules.
//!
//! Order-dependent cascades are written as rule tables evaluated top to
//! bottom; the first matching row wins.
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::bands::Rhythm;

/// Relative-power band state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RhythmState {
    Low,
    Normal,
    High,
}

impl fmt::Display for RhythmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RhythmState::Low => "LOW",
            RhythmState::Normal => "NORMAL",
            RhythmState::High => "HIGH",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelaxationLevel {
    VeryHigh,
    High,
    Medium,
    Normal,
    Low,
}

/// Normal relative-power range of a band; unknown names get `(0.05, 0.25)`.
pub fn normal_range(band: &str) -> (f64, f64) {
    match band {
        "delta" => (0.05, 0.25),
        "theta" => (0.05, 0.15),
        "alpha" => (0.10, 0.30),
        "beta" => (0.15, 0.25),
        "gamma" => (0.05, 0.15),
        _ => (0.05, 0.25),
    }
}

/// Strict comparisons: a value on a range edge is `Normal`.
pub fn classify(band: &str, relative_power: f64) -> RhythmState {
    let (low, high) = normal_range(band);
    if relative_power < low {
        RhythmState::Low
    } else if relative_power > high {
        RhythmState::High
    } else {
        RhythmState::Normal
    }
}

/// Fixed advice for a band in a given state.
pub fn recommendation_text(band: &str, state: RhythmState) -> &'static str {
    match (state, band) {
        (RhythmState::Low, "delta") => "Improve sleep quality and rest",
        (RhythmState::Low, "theta") => "Possibly reduced creativity; meditation is recommended",
        (RhythmState::Low, "alpha") => "Possible stress; relaxation and rest are recommended",
        (RhythmState::Low, "beta") => "Possible distraction; practise concentration and focus",
        (RhythmState::Low, "gamma") => {
            "Possible cognitive difficulties; mental activity is recommended"
        }
        (RhythmState::Low, _) => "Low rhythm power",

        (RhythmState::High, "delta") => {
            "Deep sleep or possible pathology; consult a specialist"
        }
        (RhythmState::High, "theta") => "Meditative state or drowsiness; activity is recommended",
        (RhythmState::High, "alpha") => "Deep relaxation, a good state for rest",
        (RhythmState::High, "beta") => "High activity, possible anxiety; relaxation is recommended",
        (RhythmState::High, "gamma") => "Intense mental activity, possible stress",
        (RhythmState::High, _) => "High rhythm power",

        (RhythmState::Normal, "delta") => "Normal sleep and recovery",
        (RhythmState::Normal, "theta") => "Good state for creativity and intuition",
        (RhythmState::Normal, "alpha") => "Relaxed and calm state",
        (RhythmState::Normal, "beta") => "Active wakefulness and concentration",
        (RhythmState::Normal, "gamma") => "Normal cognitive activity",
        (RhythmState::Normal, _) => "Normal rhythm power",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmDetail {
    pub state: RhythmState,
    pub recommendation: &'static str,
    pub relative_power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralSummary {
    pub summary: &'static str,
    pub dominant_rhythm: Option<Rhythm>,
    pub relaxation_level: RelaxationLevel,
    pub spectral_entropy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub general: GeneralSummary,
    pub rhythm_details: BTreeMap<Rhythm, RhythmDetail>,
    pub specific_recommendations: Vec<&'static str>,
}

/// `(dominant, threshold, summary, level)`; first row with a matching
/// dominant rhythm and power above threshold wins.
const SUMMARY_RULES: [(Rhythm, f64, &str, RelaxationLevel); 4] = [
    (Rhythm::Alpha, 0.25, "Deep relaxation / meditation", RelaxationLevel::High),
    (Rhythm::Beta, 0.25, "Active wakefulness, possible anxiety", RelaxationLevel::Low),
    (Rhythm::Theta, 0.15, "Meditative state or drowsiness", RelaxationLevel::Medium),
    (Rhythm::Delta, 0.20, "Deep sleep or rest", RelaxationLevel::VeryHigh),
];

const BALANCED: (&str, RelaxationLevel) = ("Balanced state", RelaxationLevel::Normal);

/// General summary from the dominant rhythm and its relative power.
pub fn general_summary(
    dominant: Option<Rhythm>,
    relative: &BTreeMap<Rhythm, f64>,
    spectral_entropy: f64,
) -> GeneralSummary {
    let power = dominant.and_then(|d| relative.get(&d).copied()).unwrap_or(0.0);
    let (summary, relaxation_level) = SUMMARY_RULES
        .iter()
        .find(|(r, thr, _, _)| dominant == Some(*r) && power > *thr)
        .map_or(BALANCED, |&(_, _, s, l)| (s, l));
    GeneralSummary { summary, dominant_rhythm: dominant, relaxation_level, spectral_entropy }
}

/// Non-exclusive advice, in fixed order. A missing band counts as 0.
pub fn specific_recommendations(relative: &BTreeMap<Rhythm, f64>) -> Vec<&'static str> {
    let get = |r: Rhythm| relative.get(&r).copied().unwrap_or(0.0);
    let mut out = Vec::new();

    let (alpha, beta) = (get(Rhythm::Alpha), get(Rhythm::Beta));
    if alpha > 0.0 && beta > 0.0 {
        let ratio = alpha / beta;
        if ratio > 2.0 {
            out.push("High relaxation level, a good state for meditation");
        } else if ratio < 0.5 {
            out.push("Low relaxation level, reducing stress is recommended");
        }
    }

    let theta = get(Rhythm::Theta);
    if theta > 0.20 {
        out.push("Elevated theta activity, possible drowsiness");
    } else if theta < 0.05 {
        out.push("Reduced theta activity, possibly lower creativity");
    }

    let total: f64 = relative.values().sum();
    if (total - 1.0).abs() > 0.1 {
        out.push("Imbalance detected in the rhythm power distribution");
    }
    out
}

/// Full recommendation from relative band powers.
pub fn generate_recommendations(
    relative: &BTreeMap<Rhythm, f64>,
    dominant: Option<Rhythm>,
    spectral_entropy: f64,
) -> Recommendation {
    let rhythm_details = relative
        .iter()
        .map(|(&r, &p)| {
            let state = classify(r.name(), p);
            let detail = RhythmDetail {
                state,
                recommendation: recommendation_text(r.name(), state),
                relative_power: p,
            };
            (r, detail)
        })
        .collect();
    Recommendation {
        general: general_summary(dominant, relative, spectral_entropy),
        rhythm_details,
        specific_recommendations: specific_recommendations(relative),
    }
}

/// Threshold alerts plus their rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicalAlerts {
    pub alerts: Vec<&'static str>,
}

impl MedicalAlerts {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

impl fmt::Display for MedicalAlerts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alerts.is_empty() {
            writeln!(f, "No significant deviations detected.")?;
            return writeln!(f, "Indicators are within normal ranges.");
        }
        for a in &self.alerts {
            writeln!(f, "{a}")?;
        }
        writeln!(f, "NOTE: these indications are informational only.")?;
        writeln!(f, "If you have symptoms, consult a neurologist.")
    }
}

/// Independent threshold checks; every triggered alert is reported.
pub fn medical_alerts(relative: &BTreeMap<Rhythm, f64>, spike_count: Option<usize>) -> MedicalAlerts {
    let get = |r: Rhythm| relative.get(&r).copied().unwrap_or(0.0);
    let (delta, theta, alpha, beta) =
        (get(Rhythm::Delta), get(Rhythm::Theta), get(Rhythm::Alpha), get(Rhythm::Beta));

    let mut alerts = Vec::new();
    if delta > 0.4 {
        alerts.push("Very high delta activity: possible deep sleep or pathology");
    }
    if beta > 0.4 {
        alerts.push("Very high beta activity: possible anxiety or stress");
    }
    if alpha < 0.05 && beta > 0.3 {
        alerts.push("Low alpha with high beta: signs of stress or overload");
    }
    if theta > 0.3 && delta < 0.1 {
        alerts.push("High theta with low delta: possible drowsiness while awake");
    }
    if spike_count.is_some_and(|n| n > 10) {
        alerts.push("Elevated spike count: specialist review is recommended");
    }
    MedicalAlerts { alerts }
}

/// `(high, medium)` tiers of the single-rhythm interpretation.
fn interpretation_tiers(rhythm: Rhythm) -> (f64, f64) {
    match rhythm {
        Rhythm::Delta => (0.30, 0.15),
        Rhythm::Theta => (0.25, 0.15),
        Rhythm::Alpha => (0.30, 0.15),
        Rhythm::Beta => (0.40, 0.20),
        Rhythm::Gamma => (0.15, 0.05),
    }
}

/// One-line reading of a single rhythm's relative power.
pub fn interpret_single_rhythm(rhythm: Rhythm, relative_power: f64) -> &'static str {
    let (high, medium) = interpretation_tiers(rhythm);
    let tier = if relative_power > high {
        2
    } else if relative_power > medium {
        1
    } else {
        0
    };
    match (rhythm, tier) {
        (Rhythm::Delta, 2) => "High delta activity (deep sleep or pathology)",
        (Rhythm::Delta, 1) => "Moderate delta activity (normal during sleep)",
        (Rhythm::Delta, _) => "Low delta activity (wakefulness)",
        (Rhythm::Theta, 2) => "High theta activity (drowsiness, meditation)",
        (Rhythm::Theta, 1) => "Moderate theta activity (relaxation)",
        (Rhythm::Theta, _) => "Low theta activity (active wakefulness)",
        (Rhythm::Alpha, 2) => "High alpha activity (deep relaxation)",
        (Rhythm::Alpha, 1) => "Moderate alpha activity (calm wakefulness)",
        (Rhythm::Alpha, _) => "Low alpha activity (active engagement)",
        (Rhythm::Beta, 2) => "High beta activity (active thinking, stress)",
        (Rhythm::Beta, 1) => "Moderate beta activity (normal wakefulness)",
        (Rhythm::Beta, _) => "Low beta activity (relaxed state)",
        (Rhythm::Gamma, 2) => "High gamma activity (intense cognitive activity)",
        (Rhythm::Gamma, 1) => "Moderate gamma activity (normal information processing)",
        (Rhythm::Gamma, _) => "Low gamma activity (reduced cognitive activity)",
    }
}
