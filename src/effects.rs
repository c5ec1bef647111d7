//! Output collaborators: the sound player and the effect renderer.
//!
//! Both are fire-and-forget from the engine's point of view. The renderer is
//! handed a fresh [`LabState`] after every state change and is expected to be
//! a pure projection of it.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::state::LabState;

/// Named audio clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// Shared clip for every beaker reaction.
    Boom,
    /// Flame-test clip.
    Fire,
}

impl SoundCue {
    /// Clip identifier as used by asset players.
    #[must_use]
    pub const fn clip_id(self) -> &'static str {
        match self {
            Self::Boom => "boom",
            Self::Fire => "fire",
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clip_id())
    }
}

/// Plays audio cues.
pub trait SoundPlayer: Send {
    /// Starts a clip; no completion is reported.
    fn play(&self, cue: SoundCue);

    /// Silences anything currently playing.
    fn stop_all(&self);
}

/// Draws the lab from a state snapshot.
pub trait EffectRenderer: Send {
    /// Projects the snapshot onto the scene.
    fn render(&self, state: &LabState);
}

/// Sound player that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSoundPlayer;

impl SoundPlayer for NullSoundPlayer {
    fn play(&self, _cue: SoundCue) {}

    fn stop_all(&self) {}
}

/// Renderer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl EffectRenderer for NullRenderer {
    fn render(&self, _state: &LabState) {}
}

/// Something the recording sound player saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "cue", rename_all = "snake_case")]
pub enum SoundCall {
    /// `play(cue)`.
    Play(SoundCue),
    /// `stop_all()`.
    StopAll,
}

/// Sound player that records every call. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingSoundPlayer {
    calls: Arc<Mutex<Vec<SoundCall>>>,
}

impl RecordingSoundPlayer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<SoundCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Only the cues that were played.
    #[must_use]
    pub fn played(&self) -> Vec<SoundCue> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SoundCall::Play(cue) => Some(cue),
                SoundCall::StopAll => None,
            })
            .collect()
    }

    fn push(&self, call: SoundCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl SoundPlayer for RecordingSoundPlayer {
    fn play(&self, cue: SoundCue) {
        self.push(SoundCall::Play(cue));
    }

    fn stop_all(&self) {
        self.push(SoundCall::StopAll);
    }
}

/// Renderer that keeps every frame it was asked to draw. Clones share frames.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<LabState>>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every rendered snapshot, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<LabState> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// The most recent snapshot, if anything was rendered.
    #[must_use]
    pub fn last(&self) -> Option<LabState> {
        self.frames.lock().ok().and_then(|f| f.last().cloned())
    }

    /// Number of rendered frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// True if nothing has been rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EffectRenderer for RecordingRenderer {
    fn render(&self, state: &LabState) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(state.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_player_shares_log_between_clones() {
        let player = RecordingSoundPlayer::new();
        let handle = player.clone();
        player.play(SoundCue::Boom);
        player.stop_all();
        player.play(SoundCue::Fire);

        assert_eq!(
            handle.calls(),
            vec![
                SoundCall::Play(SoundCue::Boom),
                SoundCall::StopAll,
                SoundCall::Play(SoundCue::Fire)
            ]
        );
        assert_eq!(handle.played(), vec![SoundCue::Boom, SoundCue::Fire]);
    }

    #[test]
    fn recording_renderer_keeps_frames() {
        let renderer = RecordingRenderer::new();
        assert!(renderer.is_empty());
        let mut state = LabState::initial();
        renderer.render(&state);
        state.shaking = true;
        renderer.render(&state);

        assert_eq!(renderer.len(), 2);
        assert!(renderer.last().unwrap().shaking);
        assert!(!renderer.frames()[0].shaking);
    }

    #[test]
    fn cue_clip_ids() {
        assert_eq!(SoundCue::Boom.clip_id(), "boom");
        assert_eq!(SoundCue::Fire.to_string(), "fire");
    }
}
