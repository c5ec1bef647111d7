//! # reactlab - reaction engine for a virtual chemistry lab
//!
//! Reagents are dragged into a beaker or onto a petri dish. When two reagents
//! that form a known reaction meet in the beaker, a timed effect sequence runs:
//! a short latency, the beaker shakes while the liquid flashes, vapor rises,
//! and everything settles after a fixed deadline. Sodium on the petri dish
//! gives a yellow flame test.
//!
//! ## Core Concepts
//!
//! - **Catalogue**: static reagent colours, pair reaction rules and flame tests
//! - **LabState**: the single snapshot a renderer projects
//! - **ReactionEngine**: applies drops and clicks, owns timers and sequences
//! - **LabRuntime**: runs an engine on a worker thread against wall-clock time
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use reactlab::{Catalogue, ReactionEngine, Zone};
//!
//! let mut lab = ReactionEngine::new(Arc::new(Catalogue::default()));
//! lab.on_drop(Zone::Beaker, "Na").unwrap();
//! lab.on_drop(Zone::Beaker, "HCl").unwrap();
//!
//! lab.advance(1200);
//! assert_eq!(lab.state().reaction_message, "2Na + 2HCl → 2NaCl + H₂↑");
//!
//! lab.advance(3800);
//! assert!(lab.state().reaction_message.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalogue;
pub mod effects;
pub mod engine;
pub mod error;
pub mod reagent;
pub mod runtime;
pub mod sequence;
pub mod state;
pub mod timer;

// Re-export primary types at crate root for convenience
pub use catalogue::{Catalogue, CatalogueDocument, EffectTiming, FlameTest, ReactionRule};
pub use effects::{EffectRenderer, SoundCue, SoundPlayer};
pub use engine::{DropOutcome, ReactionEngine, ReactionEvent, ReactionEventKind, TimerAction};
pub use error::{ConfigError, LabError, LabResult, RuntimeError, ValidationError};
pub use reagent::{ReagentId, ReagentKind, ReagentPair, Zone};
pub use runtime::{LabRuntime, LabRuntimeConfig};
pub use sequence::{SequenceId, SequencePhase};
pub use state::{Color, LabState};
