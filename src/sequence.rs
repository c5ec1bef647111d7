//! Reaction effect sequence.
//!
//! `Idle → Pending → Flashing → Settling → Idle`
//!
//! - `Pending`: entry delay after the trigger; nothing visible changes.
//! - `Flashing`: the liquid alternates between white and the rule's flash
//!   colour, once per interval, for exactly `toggles` alternations. The count
//!   decides when flashing ends, not the colour it lands on.
//! - `Settling`: vapor and message stay up until the deadline, which is
//!   measured from the trigger rather than from the end of flashing.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalogue::ReactionRule;
use crate::state::Color;
use crate::timer::Epoch;

/// Unique identifier for one run of an effect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(Uuid);

impl SequenceId {
    /// Creates a new random sequence id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a sequence is in its lifecycle.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePhase {
    Idle,
    Pending,
    Flashing,
    Settling,
}

/// One in-flight reaction.
#[derive(Debug, Clone)]
pub struct ReactionSequence {
    id: SequenceId,
    rule: ReactionRule,
    epoch: Epoch,
    triggered_at_ms: u64,
    phase: SequencePhase,
    toggles_done: u32,
}

impl ReactionSequence {
    /// Starts a sequence in `Pending`.
    #[must_use]
    pub fn start(rule: ReactionRule, epoch: Epoch, triggered_at_ms: u64) -> Self {
        Self {
            id: SequenceId::new(),
            rule,
            epoch,
            triggered_at_ms,
            phase: SequencePhase::Pending,
            toggles_done: 0,
        }
    }

    /// Unique id of this run.
    #[must_use]
    pub const fn id(&self) -> SequenceId {
        self.id
    }

    /// Rule this sequence plays out.
    #[must_use]
    pub const fn rule(&self) -> &ReactionRule {
        &self.rule
    }

    /// Epoch the sequence was started in; follow-up timers are scheduled in it.
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Virtual time of the drop that completed the pair.
    #[must_use]
    pub const fn triggered_at_ms(&self) -> u64 {
        self.triggered_at_ms
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SequencePhase {
        self.phase
    }

    /// Colour toggles applied so far.
    #[must_use]
    pub const fn toggles_done(&self) -> u32 {
        self.toggles_done
    }

    /// Absolute time at which vapor and message clear.
    #[must_use]
    pub const fn deadline_ms(&self) -> u64 {
        self.triggered_at_ms
            .saturating_add(self.rule.timing.total_duration_ms)
    }

    /// `Pending → Flashing`. Returns false if the sequence was not pending.
    pub fn begin_flashing(&mut self) -> bool {
        if self.phase != SequencePhase::Pending {
            return false;
        }
        self.phase = SequencePhase::Flashing;
        true
    }

    /// Colour the liquid takes on the next alternation.
    #[must_use]
    pub fn next_flash_color(&self, current: Option<&Color>) -> Color {
        match current {
            Some(c) if c.same_as(&Color::white()) => self.rule.flash_color.clone(),
            _ => Color::white(),
        }
    }

    /// Counts one alternation. Returns true when it was the last one, in
    /// which case the sequence moves to `Settling`.
    pub fn record_toggle(&mut self) -> bool {
        if self.phase != SequencePhase::Flashing {
            return false;
        }
        self.toggles_done += 1;
        if self.toggles_done >= self.rule.timing.toggles {
            self.phase = SequencePhase::Settling;
            return true;
        }
        false
    }

    /// Ends the sequence. Returns the phase it was in.
    pub fn finish(&mut self) -> SequencePhase {
        let prev = self.phase;
        self.phase = SequencePhase::Idle;
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;
    use crate::reagent::ReagentId;

    fn na_hcl() -> ReactionRule {
        Catalogue::default()
            .rule_for(
                &ReagentId::parse("Na").unwrap(),
                &ReagentId::parse("HCl").unwrap(),
            )
            .cloned()
            .unwrap()
    }

    #[test]
    fn phases_advance_in_order() {
        let mut seq = ReactionSequence::start(na_hcl(), Epoch::default(), 250);
        assert_eq!(seq.phase(), SequencePhase::Pending);
        assert_eq!(seq.deadline_ms(), 5250);

        // Toggles are ignored until flashing starts.
        assert!(!seq.record_toggle());
        assert_eq!(seq.toggles_done(), 0);

        assert!(seq.begin_flashing());
        assert!(!seq.begin_flashing());
        for _ in 0..5 {
            assert!(!seq.record_toggle());
        }
        assert!(seq.record_toggle());
        assert_eq!(seq.phase(), SequencePhase::Settling);
        assert_eq!(seq.toggles_done(), 6);

        assert_eq!(seq.finish(), SequencePhase::Settling);
        assert_eq!(seq.phase(), SequencePhase::Idle);
    }

    #[test]
    fn flash_alternates_between_white_and_rule_color() {
        let seq = ReactionSequence::start(na_hcl(), Epoch::default(), 0);
        let white = Color::white();
        let red = seq.next_flash_color(Some(&white));
        assert_eq!(red.as_str(), "#FF0000");
        assert!(seq.next_flash_color(Some(&red)).same_as(&white));
        assert!(seq.next_flash_color(None).same_as(&white));
    }

    #[test]
    fn sequence_ids_are_unique() {
        let a = ReactionSequence::start(na_hcl(), Epoch::default(), 0);
        let b = ReactionSequence::start(na_hcl(), Epoch::default(), 0);
        assert_ne!(a.id(), b.id());
    }
}
