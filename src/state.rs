//! Lab state owned by the reaction engine.
//!
//! The renderer only ever sees a [`LabState`] snapshot; it holds no state of
//! its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reagent::ReagentId;

/// A display colour (CSS colour string such as `#FF0000` or `yellow`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Plain white, the resting colour of most reagents.
    pub const WHITE_HEX: &'static str = "#FFFFFF";

    /// Creates a colour from any CSS colour string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// White liquid.
    #[must_use]
    pub fn white() -> Self {
        Self::new(Self::WHITE_HEX)
    }

    /// The raw colour string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive colour comparison (`#ffffff` equals `#FFFFFF`).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Snapshot of the simulated lab.
///
/// `beaker_reagents` only grows until the next reset. Insertion order is kept
/// for deterministic rule evaluation, but only membership is meaningful.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabState {
    pub beaker_reagents: Vec<ReagentId>,
    pub petri_reagent: Option<ReagentId>,
    /// `None` means the liquid colour is unset.
    pub liquid_color: Option<Color>,
    pub petri_color: Color,
    pub reaction_message: String,
    pub vapors_visible: bool,
    pub shaking: bool,
}

impl LabState {
    /// Default petri marker colour.
    pub const DEFAULT_PETRI_COLOR: &'static str = "yellow";

    /// The state a fresh or freshly reset lab starts in.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            beaker_reagents: Vec::new(),
            petri_reagent: None,
            liquid_color: None,
            petri_color: Color::new(Self::DEFAULT_PETRI_COLOR),
            reaction_message: String::new(),
            vapors_visible: false,
            shaking: false,
        }
    }

    /// True if the reagent is already in the beaker.
    #[must_use]
    pub fn beaker_contains(&self, id: &ReagentId) -> bool {
        self.beaker_reagents.contains(id)
    }

    /// True if every field equals its initial value.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        *self == Self::initial()
    }
}

impl Default for LabState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_empty_with_yellow_petri() {
        let s = LabState::initial();
        assert!(s.beaker_reagents.is_empty());
        assert!(s.petri_reagent.is_none());
        assert!(s.liquid_color.is_none());
        assert_eq!(s.petri_color.as_str(), "yellow");
        assert!(s.reaction_message.is_empty());
        assert!(!s.vapors_visible);
        assert!(!s.shaking);
        assert!(s.is_initial());
        assert_eq!(s, LabState::default());
    }

    #[test]
    fn colour_comparison_ignores_case() {
        assert!(Color::new("#ffffff").same_as(&Color::white()));
        assert!(!Color::new("#FF0000").same_as(&Color::white()));
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut s = LabState::initial();
        s.beaker_reagents.push(ReagentId::parse("Na").unwrap());
        s.liquid_color = Some(Color::white());
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["beaker_reagents"][0], "Na");
        assert_eq!(json["liquid_color"], "#FFFFFF");
        assert_eq!(json["petri_color"], "yellow");
        assert_eq!(json["vapors_visible"], false);
    }
}
