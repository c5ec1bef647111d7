//! Reagent identifiers, reagent kinds and drop zones.
//!
//! Drag payloads arrive as plain strings. They are validated into a
//! [`ReagentId`] at the boundary so malformed input is caught at ingestion.
//! A well-formed identifier that the catalogue does not know is still a valid
//! reagent; it simply never matches anything.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted identifier length.
pub const MAX_REAGENT_LEN: usize = 16;

static FORMULA_RE: OnceLock<Regex> = OnceLock::new();

fn formula_regex() -> &'static Regex {
    FORMULA_RE.get_or_init(|| {
        Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("reagent formula pattern is a valid regex")
    })
}

/// Validated reagent identifier (an element symbol or acid formula).
///
/// # Examples
///
/// ```
/// use reactlab::ReagentId;
///
/// let na = ReagentId::parse(" Na ").unwrap();
/// assert_eq!(na.as_str(), "Na");
/// assert!(ReagentId::parse("").is_err());
/// assert!(ReagentId::parse("sodium chloride").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReagentId(String);

impl ReagentId {
    /// Parses and validates an identifier.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the trimmed input is empty, longer than
    /// [`MAX_REAGENT_LEN`], or not shaped like a chemical symbol or formula.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ValidationError::EmptyReagent);
        }
        if id.chars().count() > MAX_REAGENT_LEN {
            return Err(ValidationError::ReagentTooLong {
                id: id.to_string(),
                max_length: MAX_REAGENT_LEN,
            });
        }
        if !formula_regex().is_match(id) {
            return Err(ValidationError::MalformedReagent { id: id.to_string() });
        }
        Ok(Self(id.to_string()))
    }

    /// Wraps an identifier known to be well-formed (built-in tables).
    pub(crate) fn trusted(id: &str) -> Self {
        debug_assert!(formula_regex().is_match(id));
        Self(id.to_string())
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReagentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReagentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReagentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReagentId> for String {
    fn from(value: ReagentId) -> Self {
        value.0
    }
}

/// What sort of reagent an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReagentKind {
    /// A solid element (e.g. Na, Mg).
    Element,
    /// A liquid acid (e.g. HCl).
    Acid,
}

/// Where a reagent was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// The reaction beaker.
    Beaker,
    /// The flame-test petri dish.
    #[serde(rename = "petri")]
    PetriDish,
}

impl Zone {
    /// Whether this zone accepts a reagent of the given kind.
    ///
    /// Reagents without a catalogue kind are accepted everywhere.
    #[must_use]
    pub const fn accepts(self, kind: Option<ReagentKind>) -> bool {
        match (self, kind) {
            (Self::PetriDish, Some(ReagentKind::Acid)) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beaker => f.write_str("beaker"),
            Self::PetriDish => f.write_str("petri"),
        }
    }
}

impl FromStr for Zone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beaker" => Ok(Self::Beaker),
            "petri" | "petri_dish" | "petridish" => Ok(Self::PetriDish),
            other => Err(ValidationError::UnknownZone {
                zone: other.to_string(),
            }),
        }
    }
}

/// Unordered pair of reagents, stored in canonical (sorted) order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReagentPair {
    first: ReagentId,
    second: ReagentId,
}

impl ReagentPair {
    /// Builds a pair; argument order does not matter.
    #[must_use]
    pub fn new(a: ReagentId, b: ReagentId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The lexicographically smaller member.
    #[must_use]
    pub const fn first(&self) -> &ReagentId {
        &self.first
    }

    /// The lexicographically larger member.
    #[must_use]
    pub const fn second(&self) -> &ReagentId {
        &self.second
    }

    /// True if both members are the same reagent.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.first == self.second
    }

    /// True if `id` is one of the two members.
    #[must_use]
    pub fn contains(&self, id: &ReagentId) -> bool {
        &self.first == id || &self.second == id
    }
}

impl fmt::Display for ReagentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.first, self.second)
    }
}
