//! Static reagent and reaction catalogue.
//!
//! The catalogue is loaded once at startup and never mutated. It answers
//! three questions for the engine:
//! - what base colour a single reagent gives the beaker liquid,
//! - which reaction (if any) an unordered pair of reagents triggers,
//! - which elements produce a coloured flame in the petri dish.
//!
//! The on-disk form is [`CatalogueDocument`] (JSON via serde). It is validated
//! into an indexed [`Catalogue`] by [`Catalogue::from_document`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reagent::{ReagentId, ReagentKind, ReagentPair};
use crate::state::Color;

/// Timing of a reaction's effect sequence, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTiming {
    /// Number of colour alternations while flashing.
    pub toggles: u32,
    /// Delay between alternations.
    pub interval_ms: u64,
    /// Latency between the trigger and the first visible change.
    pub entry_delay_ms: u64,
    /// Deadline, measured from the trigger, at which vapor and message clear.
    pub total_duration_ms: u64,
}

impl EffectTiming {
    /// Time from trigger until the last toggle, or `None` if it overflows.
    #[must_use]
    pub fn flashing_end_ms(&self) -> Option<u64> {
        u64::from(self.toggles)
            .checked_mul(self.interval_ms)?
            .checked_add(self.entry_delay_ms)
    }

    fn validate(&self, rule: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTiming {
            rule: rule.to_string(),
            reason: reason.to_string(),
        };
        if self.toggles == 0 {
            return Err(invalid("toggles must be greater than zero"));
        }
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms must be greater than zero"));
        }
        let Some(flashing_end) = self.flashing_end_ms() else {
            return Err(invalid("entry_delay_ms + toggles * interval_ms overflows"));
        };
        if self.total_duration_ms < flashing_end {
            return Err(invalid(
                "total_duration_ms must cover entry_delay_ms + toggles * interval_ms",
            ));
        }
        Ok(())
    }
}

impl Default for EffectTiming {
    fn default() -> Self {
        Self {
            toggles: 6,
            interval_ms: 200,
            entry_delay_ms: 1000,
            total_duration_ms: 5000,
        }
    }
}

/// A reagent known to the lab.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReagentEntry {
    pub id: ReagentId,
    pub kind: ReagentKind,
    /// Colour of the reagent's tile or flask on the shelf.
    pub swatch: Color,
    /// Liquid colour applied when the reagent alone enters the beaker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color: Option<Color>,
}

/// A reaction between two reagents.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub reagents: [ReagentId; 2],
    pub message: String,
    pub flash_color: Color,
    #[serde(default)]
    pub timing: EffectTiming,
}

/// A flame-test result for one element.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlameTestEntry {
    pub element: ReagentId,
    pub color: Color,
    pub message: String,
}

/// Serialized catalogue layout.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueDocument {
    #[serde(default)]
    pub reagents: Vec<ReagentEntry>,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub flame_tests: Vec<FlameTestEntry>,
    #[serde(default = "default_flame_vapor_ms")]
    pub flame_vapor_ms: u64,
}

const fn default_flame_vapor_ms() -> u64 {
    3000
}

const ELEMENTS: [(&str, &str); 18] = [
    ("H", "#ff6666"),
    ("He", "#ffcc66"),
    ("Li", "#ff99cc"),
    ("Be", "#ffcc99"),
    ("B", "#99ccff"),
    ("C", "#66cc99"),
    ("N", "#6699cc"),
    ("O", "#ff9966"),
    ("F", "#cccc99"),
    ("Ne", "#cc99ff"),
    ("Na", "#FFD700"),
    ("Mg", "#ffcc99"),
    ("Al", "#66ccff"),
    ("Si", "#ff9966"),
    ("P", "#ffcc99"),
    ("S", "#ffcc66"),
    ("Cl", "#6699cc"),
    ("Ar", "#cc99ff"),
];

const ACIDS: [(&str, &str); 3] = [("HCl", "#FFFFFF"), ("H2SO4", "#FFFFFF"), ("HNO3", "#FFFF00")];

const BASE_COLORS: [(&str, &str); 5] = [
    ("Na", "#FFFFFF"),
    ("HCl", "#FFFFFF"),
    ("H2SO4", "#FFFFFF"),
    ("HNO3", "#FFFF00"),
    ("Mg", "#FFFFFF"),
];

impl Default for CatalogueDocument {
    /// The built-in laboratory shelf.
    fn default() -> Self {
        let base = |id: &str| {
            BASE_COLORS
                .iter()
                .find(|(name, _)| *name == id)
                .map(|(_, c)| Color::new(*c))
        };

        let mut reagents = Vec::with_capacity(ELEMENTS.len() + ACIDS.len());
        for (id, swatch) in ELEMENTS {
            reagents.push(ReagentEntry {
                id: ReagentId::trusted(id),
                kind: ReagentKind::Element,
                swatch: Color::new(swatch),
                base_color: base(id),
            });
        }
        for (id, swatch) in ACIDS {
            reagents.push(ReagentEntry {
                id: ReagentId::trusted(id),
                kind: ReagentKind::Acid,
                swatch: Color::new(swatch),
                base_color: base(id),
            });
        }

        let rule = |a: &str, b: &str, message: &str, flash: &str| RuleEntry {
            reagents: [ReagentId::trusted(a), ReagentId::trusted(b)],
            message: message.to_string(),
            flash_color: Color::new(flash),
            timing: EffectTiming::default(),
        };

        Self {
            reagents,
            rules: vec![
                rule("Na", "HCl", "2Na + 2HCl → 2NaCl + H₂↑", "#FF0000"),
                rule("Na", "H2SO4", "2Na + H2SO4 → Na2SO4 + H₂↑", "#FF00FF"),
                rule("Mg", "HCl", "Mg + 2HCl → MgCl2 + H₂↑", "#00FFCC"),
            ],
            flame_tests: vec![FlameTestEntry {
                element: ReagentId::trusted("Na"),
                color: Color::new("yellow"),
                message: "Na flame test: Yellow flame".to_string(),
            }],
            flame_vapor_ms: default_flame_vapor_ms(),
        }
    }
}

/// A validated reaction rule.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRule {
    pub pair: ReagentPair,
    pub message: String,
    pub flash_color: Color,
    pub timing: EffectTiming,
}

/// A validated flame test.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlameTest {
    pub color: Color,
    pub message: String,
}

/// Indexed, immutable catalogue.
#[derive(Debug, Clone)]
pub struct Catalogue {
    reagents: HashMap<ReagentId, ReagentEntry>,
    rules: HashMap<ReagentPair, ReactionRule>,
    flame_tests: HashMap<ReagentId, FlameTest>,
    flame_vapor_ms: u64,
}

impl Catalogue {
    /// Validates and indexes a catalogue document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a rule pairs a reagent with itself, two rules
    /// share the same unordered pair, or a rule's timing is inconsistent.
    pub fn from_document(doc: CatalogueDocument) -> Result<Self, ConfigError> {
        let reagents = doc
            .reagents
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        let mut rules = HashMap::with_capacity(doc.rules.len());
        for entry in doc.rules {
            let [a, b] = entry.reagents;
            let pair = ReagentPair::new(a, b);
            if pair.is_degenerate() {
                return Err(ConfigError::SelfPair {
                    reagent: pair.first().to_string(),
                });
            }
            entry.timing.validate(&pair.to_string())?;
            if rules.contains_key(&pair) {
                return Err(ConfigError::DuplicateRule {
                    first: pair.first().to_string(),
                    second: pair.second().to_string(),
                });
            }
            rules.insert(
                pair.clone(),
                ReactionRule {
                    pair,
                    message: entry.message,
                    flash_color: entry.flash_color,
                    timing: entry.timing,
                },
            );
        }

        let flame_tests = doc
            .flame_tests
            .into_iter()
            .map(|entry| {
                (
                    entry.element,
                    FlameTest {
                        color: entry.color,
                        message: entry.message,
                    },
                )
            })
            .collect();

        Ok(Self {
            reagents,
            rules,
            flame_tests,
            flame_vapor_ms: doc.flame_vapor_ms,
        })
    }

    /// Parses a JSON catalogue.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON or invalid reagent
    /// identifiers, and the `from_document` errors otherwise.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let doc: CatalogueDocument = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Self::from_document(doc)
    }

    /// Reads and parses a JSON catalogue file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise the
    /// `from_json_str` errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Catalogue entry for a reagent, if known.
    #[must_use]
    pub fn reagent(&self, id: &ReagentId) -> Option<&ReagentEntry> {
        self.reagents.get(id)
    }

    /// Kind of a reagent, if known.
    #[must_use]
    pub fn kind(&self, id: &ReagentId) -> Option<ReagentKind> {
        self.reagents.get(id).map(|e| e.kind)
    }

    /// Liquid colour the reagent gives on its own, if any.
    #[must_use]
    pub fn base_color(&self, id: &ReagentId) -> Option<&Color> {
        self.reagents.get(id).and_then(|e| e.base_color.as_ref())
    }

    /// Reaction rule for an unordered pair.
    #[must_use]
    pub fn rule_for(&self, a: &ReagentId, b: &ReagentId) -> Option<&ReactionRule> {
        self.rules.get(&ReagentPair::new(a.clone(), b.clone()))
    }

    /// Flame-test result for an element, if it has one.
    #[must_use]
    pub fn flame_test(&self, id: &ReagentId) -> Option<&FlameTest> {
        self.flame_tests.get(id)
    }

    /// How long flame-test vapor stays visible.
    #[must_use]
    pub const fn flame_vapor_ms(&self) -> u64 {
        self.flame_vapor_ms
    }

    /// Number of reaction rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::from_document(CatalogueDocument::default())
            .expect("built-in catalogue document is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ReagentId {
        ReagentId::parse(s).unwrap()
    }

    #[test]
    fn builtin_catalogue_has_three_rules() {
        let cat = Catalogue::default();
        assert_eq!(cat.rule_count(), 3);

        let rule = cat.rule_for(&id("HCl"), &id("Na")).unwrap();
        assert_eq!(rule.message, "2Na + 2HCl → 2NaCl + H₂↑");
        assert_eq!(rule.flash_color.as_str(), "#FF0000");
        assert_eq!(rule.timing, EffectTiming::default());

        assert!(cat.rule_for(&id("Na"), &id("HNO3")).is_none());
        assert!(cat.rule_for(&id("Na"), &id("Xe")).is_none());
    }

    #[test]
    fn builtin_base_colors_and_kinds() {
        let cat = Catalogue::default();
        assert_eq!(cat.base_color(&id("Na")).unwrap().as_str(), "#FFFFFF");
        assert_eq!(cat.base_color(&id("HNO3")).unwrap().as_str(), "#FFFF00");
        assert!(cat.base_color(&id("Cl")).is_none());
        assert!(cat.base_color(&id("Xe")).is_none());

        assert_eq!(cat.kind(&id("HCl")), Some(ReagentKind::Acid));
        assert_eq!(cat.kind(&id("Na")), Some(ReagentKind::Element));
        assert_eq!(cat.kind(&id("Xe")), None);
        assert_eq!(cat.reagent(&id("Na")).unwrap().swatch.as_str(), "#FFD700");
    }

    #[test]
    fn only_sodium_has_a_flame_test() {
        let cat = Catalogue::default();
        let flame = cat.flame_test(&id("Na")).unwrap();
        assert_eq!(flame.color.as_str(), "yellow");
        assert_eq!(flame.message, "Na flame test: Yellow flame");
        assert!(cat.flame_test(&id("Cl")).is_none());
        assert_eq!(cat.flame_vapor_ms(), 3000);
    }

    #[test]
    fn json_with_defaults_parses() {
        let json = r##"{
            "rules": [
                { "reagents": ["K", "HCl"], "message": "2K + 2HCl → 2KCl + H₂↑", "flash_color": "#AA00FF" }
            ]
        }"##;
        let cat = Catalogue::from_json_str(json).unwrap();
        let rule = cat.rule_for(&id("HCl"), &id("K")).unwrap();
        assert_eq!(rule.timing.toggles, 6);
        assert_eq!(rule.timing.total_duration_ms, 5000);
        assert_eq!(cat.flame_vapor_ms(), 3000);
        assert!(cat.kind(&id("K")).is_none());
    }

    #[test]
    fn json_partial_timing_fills_remaining_fields() {
        let json = r##"{
            "rules": [
                { "reagents": ["K", "HCl"], "message": "m", "flash_color": "#AA00FF",
                  "timing": { "toggles": 4 } }
            ]
        }"##;
        let cat = Catalogue::from_json_str(json).unwrap();
        let timing = cat.rule_for(&id("K"), &id("HCl")).unwrap().timing;
        assert_eq!(timing.toggles, 4);
        assert_eq!(timing.interval_ms, 200);
        assert_eq!(timing.flashing_end_ms(), Some(1800));
    }

    #[test]
    fn rejects_self_pairs_and_duplicates() {
        let json = r##"{ "rules": [ { "reagents": ["Na", "Na"], "message": "m", "flash_color": "red" } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::SelfPair { .. })
        ));

        let json = r##"{ "rules": [
            { "reagents": ["Na", "HCl"], "message": "a", "flash_color": "red" },
            { "reagents": ["HCl", "Na"], "message": "b", "flash_color": "blue" }
        ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn rejects_inconsistent_timing() {
        let json = r##"{ "rules": [ { "reagents": ["Na", "HCl"], "message": "m", "flash_color": "red",
            "timing": { "total_duration_ms": 1500 } } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::InvalidTiming { .. })
        ));

        let json = r##"{ "rules": [ { "reagents": ["Na", "HCl"], "message": "m", "flash_color": "red",
            "timing": { "toggles": 0 } } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::InvalidTiming { .. })
        ));
    }

    #[test]
    fn rejects_overflowing_timing() {
        let json = r##"{ "rules": [ { "reagents": ["Na", "HCl"], "message": "m", "flash_color": "red",
            "timing": { "toggles": 2, "interval_ms": 18446744073709551615 } } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::InvalidTiming { .. })
        ));

        let json = r##"{ "rules": [ { "reagents": ["Na", "HCl"], "message": "m", "flash_color": "red",
            "timing": { "toggles": 1, "interval_ms": 1, "entry_delay_ms": 18446744073709551615,
                        "total_duration_ms": 18446744073709551615 } } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::InvalidTiming { .. })
        ));
    }

    #[test]
    fn rejects_malformed_identifiers_and_json() {
        let json = r##"{ "rules": [ { "reagents": ["na", "HCl"], "message": "m", "flash_color": "red" } ] }"##;
        assert!(matches!(
            Catalogue::from_json_str(json),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Catalogue::from_json_str("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn document_round_trips_through_json() {
        let doc = CatalogueDocument::default();
        let json = serde_json::to_string(&doc).unwrap();
        let cat = Catalogue::from_json_str(&json).unwrap();
        assert_eq!(cat.rule_count(), 3);
    }
}
