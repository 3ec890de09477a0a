//! Personality parameters: the six sliders echoed with every chat request.
//!
//! Each value lives on a 1–7 scale. Values are clamped on construction and
//! on deserialization, so a `PersonalityParameters` is always in range.
//! The struct is a value type: "editing" produces a new snapshot, and the
//! snapshot taken at submit time is what travels with a request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lower bound of every parameter.
pub const PARAMETER_MIN: f64 = 1.0;
/// Upper bound of every parameter.
pub const PARAMETER_MAX: f64 = 7.0;
/// Neutral midpoint used for fresh sessions.
pub const PARAMETER_DEFAULT: f64 = 4.0;

/// Wire names of the six parameters, in display order.
pub const PARAMETER_NAMES: [&str; 6] = [
    "valence",             // attraction vs. aversion
    "arousal",             // readiness for action
    "selection_threshold", // ease of shifting between intentions
    "resolution",          // accuracy of perception
    "goal_directedness",   // stability of motives
    "securing_rate",       // frequency of environmental checks
];

/// Identifies one of the six sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterName {
    Valence,
    Arousal,
    SelectionThreshold,
    Resolution,
    GoalDirectedness,
    SecuringRate,
}

impl ParameterName {
    /// All parameters in display order.
    pub const ALL: [ParameterName; 6] = [
        Self::Valence,
        Self::Arousal,
        Self::SelectionThreshold,
        Self::Resolution,
        Self::GoalDirectedness,
        Self::SecuringRate,
    ];

    /// The snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valence => PARAMETER_NAMES[0],
            Self::Arousal => PARAMETER_NAMES[1],
            Self::SelectionThreshold => PARAMETER_NAMES[2],
            Self::Resolution => PARAMETER_NAMES[3],
            Self::GoalDirectedness => PARAMETER_NAMES[4],
            Self::SecuringRate => PARAMETER_NAMES[5],
        }
    }

    /// Human-readable label for panels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valence => "Valence",
            Self::Arousal => "Arousal",
            Self::SelectionThreshold => "Selection Threshold",
            Self::Resolution => "Resolution",
            Self::GoalDirectedness => "Goal-Directedness",
            Self::SecuringRate => "Securing Rate",
        }
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown parameter '{}'", s))
    }
}

/// Clamp a raw slider value into `[PARAMETER_MIN, PARAMETER_MAX]`.
///
/// NaN collapses to the neutral default.
pub fn clamp_parameter(value: f64) -> f64 {
    if value.is_nan() {
        PARAMETER_DEFAULT
    } else {
        value.clamp(PARAMETER_MIN, PARAMETER_MAX)
    }
}

/// Immutable snapshot of the six personality sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParameters")]
pub struct PersonalityParameters {
    valence: f64,
    arousal: f64,
    selection_threshold: f64,
    resolution: f64,
    goal_directedness: f64,
    securing_rate: f64,
}

/// Unvalidated wire form; missing fields fall back to the default.
#[derive(Deserialize)]
struct RawParameters {
    #[serde(default = "default_value")]
    valence: f64,
    #[serde(default = "default_value")]
    arousal: f64,
    #[serde(default = "default_value")]
    selection_threshold: f64,
    #[serde(default = "default_value")]
    resolution: f64,
    #[serde(default = "default_value")]
    goal_directedness: f64,
    #[serde(default = "default_value")]
    securing_rate: f64,
}

fn default_value() -> f64 {
    PARAMETER_DEFAULT
}

impl From<RawParameters> for PersonalityParameters {
    fn from(raw: RawParameters) -> Self {
        Self::new(
            raw.valence,
            raw.arousal,
            raw.selection_threshold,
            raw.resolution,
            raw.goal_directedness,
            raw.securing_rate,
        )
    }
}

impl Default for PersonalityParameters {
    fn default() -> Self {
        Self::uniform(PARAMETER_DEFAULT)
    }
}

impl PersonalityParameters {
    /// Build a snapshot, clamping every value into range.
    pub fn new(
        valence: f64,
        arousal: f64,
        selection_threshold: f64,
        resolution: f64,
        goal_directedness: f64,
        securing_rate: f64,
    ) -> Self {
        Self {
            valence: clamp_parameter(valence),
            arousal: clamp_parameter(arousal),
            selection_threshold: clamp_parameter(selection_threshold),
            resolution: clamp_parameter(resolution),
            goal_directedness: clamp_parameter(goal_directedness),
            securing_rate: clamp_parameter(securing_rate),
        }
    }

    /// All six sliders set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value, value, value)
    }

    pub fn valence(&self) -> f64 {
        self.valence
    }

    pub fn arousal(&self) -> f64 {
        self.arousal
    }

    pub fn selection_threshold(&self) -> f64 {
        self.selection_threshold
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn goal_directedness(&self) -> f64 {
        self.goal_directedness
    }

    pub fn securing_rate(&self) -> f64 {
        self.securing_rate
    }

    /// Read a parameter by name.
    pub fn get(&self, name: ParameterName) -> f64 {
        match name {
            ParameterName::Valence => self.valence,
            ParameterName::Arousal => self.arousal,
            ParameterName::SelectionThreshold => self.selection_threshold,
            ParameterName::Resolution => self.resolution,
            ParameterName::GoalDirectedness => self.goal_directedness,
            ParameterName::SecuringRate => self.securing_rate,
        }
    }

    /// Return a new snapshot with one parameter replaced (clamped).
    pub fn with(mut self, name: ParameterName, value: f64) -> Self {
        let value = clamp_parameter(value);
        match name {
            ParameterName::Valence => self.valence = value,
            ParameterName::Arousal => self.arousal = value,
            ParameterName::SelectionThreshold => self.selection_threshold = value,
            ParameterName::Resolution => self.resolution = value,
            ParameterName::GoalDirectedness => self.goal_directedness = value,
            ParameterName::SecuringRate => self.securing_rate = value,
        }
        self
    }

    /// `(name, value)` pairs in display order.
    pub fn entries(&self) -> [(ParameterName, f64); 6] {
        ParameterName::ALL.map(|name| (name, self.get(name)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_midpoint() {
        let p = PersonalityParameters::default();
        for (_, value) in p.entries() {
            assert_eq!(value, PARAMETER_DEFAULT);
        }
    }

    #[test]
    fn test_values_are_clamped() {
        let p = PersonalityParameters::new(0.0, 9.5, -3.0, 7.0, 1.0, f64::NAN);
        assert_eq!(p.valence(), 1.0);
        assert_eq!(p.arousal(), 7.0);
        assert_eq!(p.selection_threshold(), 1.0);
        assert_eq!(p.resolution(), 7.0);
        assert_eq!(p.goal_directedness(), 1.0);
        assert_eq!(p.securing_rate(), PARAMETER_DEFAULT);
    }

    #[test]
    fn test_with_returns_new_snapshot() {
        let original = PersonalityParameters::default();
        let edited = original.with(ParameterName::Arousal, 6.5);
        assert_eq!(original.arousal(), PARAMETER_DEFAULT);
        assert_eq!(edited.arousal(), 6.5);
        assert_eq!(edited.with(ParameterName::Arousal, 100.0).arousal(), 7.0);
    }

    #[test]
    fn test_parameter_name_parsing() {
        assert_eq!(
            "goal-directedness".parse::<ParameterName>().unwrap(),
            ParameterName::GoalDirectedness
        );
        assert_eq!(
            "Securing_Rate".parse::<ParameterName>().unwrap(),
            ParameterName::SecuringRate
        );
        assert!("temperature".parse::<ParameterName>().is_err());
    }

    #[test]
    fn test_deserialize_clamps_and_defaults() {
        let json = r#"{"valence": 12, "arousal": 0.5, "resolution": 3}"#;
        let p: PersonalityParameters = serde_json::from_str(json).unwrap();
        assert_eq!(p.valence(), 7.0);
        assert_eq!(p.arousal(), 1.0);
        assert_eq!(p.resolution(), 3.0);
        assert_eq!(p.securing_rate(), PARAMETER_DEFAULT);
    }

    #[test]
    fn test_serialized_field_names_match_wire_names() {
        let value = serde_json::to_value(PersonalityParameters::uniform(2.0)).unwrap();
        for name in PARAMETER_NAMES {
            assert_eq!(value[name], 2.0, "missing field {}", name);
        }
    }
}
