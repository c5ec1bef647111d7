//! The reaction engine.
//!
//! `ReactionEngine` owns the lab state, the timer queue and the active effect
//! sequence. It is driven by discrete events (drops, clicks, timer delivery
//! via [`ReactionEngine::advance`]) processed one at a time in arrival order.
//!
//! Rules fire at most once per reset cycle. Only one effect sequence runs at a
//! time; a rule matched while another sequence is in flight waits in a FIFO
//! queue and is triggered when the running sequence returns to idle.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalogue::{Catalogue, ReactionRule};
use crate::effects::{EffectRenderer, NullRenderer, NullSoundPlayer, SoundCue, SoundPlayer};
use crate::error::LabResult;
use crate::reagent::{ReagentId, ReagentPair, Zone};
use crate::sequence::{ReactionSequence, SequenceId, SequencePhase};
use crate::state::{Color, LabState};
use crate::timer::TimerQueue;

/// Deferred work owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Entry delay elapsed; start flashing.
    BeginFlashing(SequenceId),
    /// Next liquid colour alternation.
    FlashToggle(SequenceId),
    /// Trigger-relative deadline; clear vapor and message.
    Cleanup(SequenceId),
    /// Flame-test vapor has been shown long enough.
    HideFlameVapor,
}

/// What happened to a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    /// The reagent was placed.
    Accepted,
    /// The reagent was already in the beaker; nothing changed.
    Duplicate,
    /// The zone does not take this kind of reagent.
    Rejected,
}

/// Journal entry kinds.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionEventKind {
    Reaction {
        sequence_id: SequenceId,
        pair: ReagentPair,
    },
    FlameTest {
        element: ReagentId,
    },
}

/// A reaction that became visible.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionEvent {
    pub event_id: Uuid,
    pub kind: ReactionEventKind,
    pub message: String,
    /// Engine clock when the event happened.
    pub at_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl ReactionEvent {
    fn new(kind: ReactionEventKind, message: String, at_ms: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            message,
            at_ms,
            recorded_at: Utc::now(),
        }
    }
}

/// Simulated chemistry lab.
pub struct ReactionEngine {
    catalogue: Arc<Catalogue>,
    state: LabState,
    timers: TimerQueue<TimerAction>,
    active: Option<ReactionSequence>,
    queued: VecDeque<ReactionRule>,
    fired: HashSet<ReagentPair>,
    history: Vec<ReactionEvent>,
    sound: Box<dyn SoundPlayer>,
    renderer: Box<dyn EffectRenderer>,
}

impl std::fmt::Debug for ReactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionEngine")
            .field("state", &self.state)
            .field("now_ms", &self.timers.now_ms())
            .field("pending_timers", &self.timers.len())
            .field("active", &self.active.as_ref().map(ReactionSequence::id))
            .field("queued", &self.queued.len())
            .finish_non_exhaustive()
    }
}

impl ReactionEngine {
    /// Engine with silent collaborators.
    #[must_use]
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self {
            catalogue,
            state: LabState::initial(),
            timers: TimerQueue::new(),
            active: None,
            queued: VecDeque::new(),
            fired: HashSet::new(),
            history: Vec::new(),
            sound: Box::new(NullSoundPlayer),
            renderer: Box::new(NullRenderer),
        }
    }

    /// Replaces the sound player.
    #[must_use]
    pub fn with_sound(mut self, sound: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    /// Replaces the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl EffectRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Read-only view of the current state.
    #[must_use]
    pub const fn state(&self) -> &LabState {
        &self.state
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> LabState {
        self.state.clone()
    }

    /// Engine clock.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    /// Earliest outstanding timer, if any.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.timers.next_due_ms()
    }

    /// Phase of the running sequence (`Idle` if none).
    #[must_use]
    pub fn active_phase(&self) -> SequencePhase {
        self.active
            .as_ref()
            .map_or(SequencePhase::Idle, ReactionSequence::phase)
    }

    /// Rules waiting for the running sequence to finish.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Reactions and flame tests seen since the last reset.
    #[must_use]
    pub fn history(&self) -> &[ReactionEvent] {
        &self.history
    }

    /// Catalogue the engine matches against.
    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Ingests a raw drop from the drop surface.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `raw_reagent` is not a well-formed
    /// reagent identifier. Unknown but well-formed reagents are accepted.
    pub fn on_drop(&mut self, zone: Zone, raw_reagent: &str) -> LabResult<DropOutcome> {
        let reagent = ReagentId::parse(raw_reagent)?;
        if !zone.accepts(self.catalogue.kind(&reagent)) {
            warn!(%zone, %reagent, "drop rejected by zone");
            return Ok(DropOutcome::Rejected);
        }
        let outcome = match zone {
            Zone::Beaker => {
                if self.add_to_beaker(reagent) {
                    DropOutcome::Accepted
                } else {
                    DropOutcome::Duplicate
                }
            }
            Zone::PetriDish => {
                self.add_to_petri_dish(reagent);
                DropOutcome::Accepted
            }
        };
        Ok(outcome)
    }

    /// Adds a reagent to the beaker. Returns false if it was already there.
    pub fn add_to_beaker(&mut self, reagent: ReagentId) -> bool {
        if self.state.beaker_contains(&reagent) {
            debug!(%reagent, "reagent already in beaker");
            return false;
        }

        if let Some(color) = self.catalogue.base_color(&reagent) {
            self.state.liquid_color = Some(color.clone());
        }
        debug!(%reagent, now_ms = self.now_ms(), "reagent added to beaker");

        let catalogue = Arc::clone(&self.catalogue);
        let matched: Vec<ReactionRule> = self
            .state
            .beaker_reagents
            .iter()
            .filter_map(|present| catalogue.rule_for(present, &reagent))
            .filter(|rule| !self.fired.contains(&rule.pair))
            .cloned()
            .collect();

        self.state.beaker_reagents.push(reagent);

        for rule in matched {
            self.fired.insert(rule.pair.clone());
            self.trigger(rule);
        }

        self.render();
        true
    }

    /// Places a reagent on the petri dish, replacing whatever was there.
    ///
    /// Only elements with a flame test stay on the dish; anything else
    /// empties it.
    pub fn add_to_petri_dish(&mut self, reagent: ReagentId) {
        match self.catalogue.flame_test(&reagent) {
            Some(flame) => {
                self.state.petri_color = flame.color.clone();
                debug!(%reagent, color = %flame.color, "flame-test reagent placed on petri dish");
                self.state.petri_reagent = Some(reagent);
            }
            None => {
                debug!(%reagent, "petri dish cleared by reagent without flame test");
                self.state.petri_reagent = None;
            }
        }
        self.render();
    }

    /// Runs the flame test for whatever is on the dish. Returns false (and
    /// changes nothing) if the dish is empty.
    pub fn activate_petri_dish(&mut self) -> bool {
        let Some(reagent) = self.state.petri_reagent.clone() else {
            debug!("petri dish activated while empty");
            return false;
        };
        let Some(flame) = self.catalogue.flame_test(&reagent).cloned() else {
            return false;
        };

        info!(%reagent, message = %flame.message, "flame test");
        self.state.reaction_message = flame.message.clone();
        self.state.vapors_visible = true;
        self.sound.play(SoundCue::Fire);
        self.timers
            .schedule(self.catalogue.flame_vapor_ms(), TimerAction::HideFlameVapor);
        self.history.push(ReactionEvent::new(
            ReactionEventKind::FlameTest { element: reagent },
            flame.message,
            self.now_ms(),
        ));
        self.render();
        true
    }

    /// Returns the lab to its initial state.
    ///
    /// Outstanding timers are cancelled before anything else so no callback
    /// scheduled earlier can touch the new state.
    pub fn reset(&mut self) {
        let cancelled = self.timers.cancel_all();
        self.sound.stop_all();
        self.active = None;
        self.queued.clear();
        self.fired.clear();
        self.history.clear();
        self.state = LabState::initial();
        info!(
            cancelled_timers = cancelled,
            epoch = self.timers.epoch().value(),
            "lab reset"
        );
        self.render();
    }

    /// Advances the clock by `delta_ms`, delivering every timer that comes
    /// due. Returns the number of timers delivered.
    pub fn advance(&mut self, delta_ms: u64) -> usize {
        let target = self.now_ms().saturating_add(delta_ms);
        self.advance_to(target)
    }

    /// Advances the clock to `target_ms` (never backwards).
    pub fn advance_to(&mut self, target_ms: u64) -> usize {
        let mut delivered = 0;
        while let Some(fired) = self.timers.pop_due(target_ms) {
            delivered += 1;
            self.apply(fired.action);
        }
        self.timers.set_now(target_ms);
        delivered
    }

    fn trigger(&mut self, rule: ReactionRule) {
        if let Some(active) = &self.active {
            info!(
                pair = %rule.pair,
                running = %active.rule().pair,
                "reaction queued behind running sequence"
            );
            self.queued.push_back(rule);
            return;
        }
        self.start_sequence(rule);
    }

    fn start_sequence(&mut self, rule: ReactionRule) {
        let seq = ReactionSequence::start(rule, self.timers.epoch(), self.now_ms());
        let id = seq.id();
        let timing = seq.rule().timing;
        info!(
            pair = %seq.rule().pair,
            sequence = %id,
            triggered_at_ms = seq.triggered_at_ms(),
            deadline_ms = seq.deadline_ms(),
            "reaction triggered"
        );
        self.timers
            .schedule(timing.entry_delay_ms, TimerAction::BeginFlashing(id));
        self.timers
            .schedule(timing.total_duration_ms, TimerAction::Cleanup(id));
        self.active = Some(seq);
    }

    fn active_mut(&mut self, id: SequenceId) -> Option<&mut ReactionSequence> {
        self.active.as_mut().filter(|s| s.id() == id)
    }

    fn apply(&mut self, action: TimerAction) {
        match action {
            TimerAction::BeginFlashing(id) => self.begin_flashing(id),
            TimerAction::FlashToggle(id) => self.flash_toggle(id),
            TimerAction::Cleanup(id) => self.cleanup(id),
            TimerAction::HideFlameVapor => {
                // A running reaction owns the vapor until its own cleanup.
                if matches!(
                    self.active_phase(),
                    SequencePhase::Flashing | SequencePhase::Settling
                ) {
                    debug!(now_ms = self.now_ms(), "flame vapor kept for running reaction");
                    return;
                }
                debug!(now_ms = self.now_ms(), "flame vapor hidden");
                self.state.vapors_visible = false;
                self.render();
            }
        }
    }

    fn begin_flashing(&mut self, id: SequenceId) {
        let now_ms = self.now_ms();
        let Some(seq) = self.active_mut(id) else {
            return;
        };
        if !seq.begin_flashing() {
            return;
        }
        let rule = seq.rule().clone();
        let epoch = seq.epoch();

        debug!(sequence = %id, now_ms, "sequence flashing");
        self.state.shaking = true;
        self.sound.play(SoundCue::Boom);
        self.state.reaction_message = rule.message.clone();
        self.state.vapors_visible = true;
        self.state.liquid_color = Some(Color::white());
        self.timers
            .schedule_in(epoch, rule.timing.interval_ms, TimerAction::FlashToggle(id));
        self.history.push(ReactionEvent::new(
            ReactionEventKind::Reaction {
                sequence_id: id,
                pair: rule.pair,
            },
            rule.message,
            now_ms,
        ));
        self.render();
    }

    fn flash_toggle(&mut self, id: SequenceId) {
        let current = self.state.liquid_color.clone();
        let Some(seq) = self.active_mut(id) else {
            return;
        };
        if seq.phase() != SequencePhase::Flashing {
            return;
        }
        let next = seq.next_flash_color(current.as_ref());
        let finished = seq.record_toggle();
        let epoch = seq.epoch();
        let interval = seq.rule().timing.interval_ms;

        self.state.liquid_color = Some(next);
        if finished {
            debug!(sequence = %id, now_ms = self.now_ms(), "sequence settling");
            self.state.shaking = false;
        } else {
            self.timers
                .schedule_in(epoch, interval, TimerAction::FlashToggle(id));
        }
        self.render();
    }

    fn cleanup(&mut self, id: SequenceId) {
        let Some(seq) = self.active_mut(id) else {
            return;
        };
        let was = seq.finish();
        debug!(sequence = %id, now_ms = self.now_ms(), ?was, "sequence idle");

        self.state.vapors_visible = false;
        self.state.reaction_message.clear();
        if was == SequencePhase::Flashing {
            self.state.shaking = false;
        }
        self.active = None;
        self.render();

        if let Some(next) = self.queued.pop_front() {
            self.start_sequence(next);
        }
    }

    fn render(&self) {
        self.renderer.render(&self.state);
    }
}

impl Drop for ReactionEngine {
    fn drop(&mut self) {
        self.timers.cancel_all();
        self.sound.stop_all();
    }
}
