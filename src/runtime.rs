//! Real-time host for the reaction engine.
//!
//! `ReactionEngine` is single-threaded and runs on a virtual clock. `LabRuntime`
//! gives it a home: a dedicated worker thread owns the engine, receives
//! commands over a bounded channel and sleeps until either the next command
//! or the next timer deadline, delivering timers against wall-clock time.
//! Events are still processed strictly one at a time.
//!
//! Dropping the runtime closes the command channel; the worker exits and the
//! engine (with all its pending timers) is dropped with it.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::engine::{DropOutcome, ReactionEngine, ReactionEvent};
use crate::error::{LabError, LabResult, RuntimeError};
use crate::reagent::Zone;
use crate::state::LabState;

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabRuntimeConfig {
    /// Maximum queued commands.
    pub command_queue_capacity: usize,
    /// How long the worker sleeps when no timer is pending.
    #[serde(with = "millis")]
    pub idle_poll: Duration,
    /// How long callers wait for the worker to answer.
    #[serde(with = "millis")]
    pub reply_timeout: Duration,
}

impl Default for LabRuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: 256,
            idle_poll: Duration::from_millis(250),
            reply_timeout: Duration::from_secs(2),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

enum LabCommand {
    Drop {
        zone: Zone,
        reagent: String,
        reply: Sender<LabResult<DropOutcome>>,
    },
    ActivatePetri {
        reply: Sender<bool>,
    },
    Reset {
        reply: Sender<()>,
    },
    Snapshot {
        reply: Sender<LabState>,
    },
    History {
        reply: Sender<Vec<ReactionEvent>>,
    },
}

/// Handle to a running lab.
pub struct LabRuntime {
    cfg: LabRuntimeConfig,
    tx: Option<Sender<LabCommand>>,
    join: Option<JoinHandle<()>>,
}

impl LabRuntime {
    /// Moves `engine` onto a new worker thread.
    ///
    /// The engine's clock is treated as starting now.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the worker thread cannot be spawned.
    pub fn start(engine: ReactionEngine, cfg: LabRuntimeConfig) -> LabResult<Self> {
        let capacity = cfg.command_queue_capacity.max(1);
        let (tx, rx) = bounded::<LabCommand>(capacity);

        let idle_poll = cfg.idle_poll;
        let join = thread::Builder::new()
            .name("reactlab-runtime".to_string())
            .spawn(move || worker_loop(engine, idle_poll, rx))
            .map_err(|e| LabError::internal(format!("failed to spawn lab runtime: {e}")))?;

        Ok(Self {
            cfg,
            tx: Some(tx),
            join: Some(join),
        })
    }

    /// Forwards a drop event.
    ///
    /// # Errors
    ///
    /// Returns the engine's validation error for malformed identifiers, or a
    /// runtime error if the worker is busy or gone.
    pub fn drop_reagent(&self, zone: Zone, reagent: &str) -> LabResult<DropOutcome> {
        let reagent = reagent.to_string();
        self.request(|reply| LabCommand::Drop { zone, reagent, reply })?
    }

    /// Activates the petri dish.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the worker is busy or gone.
    pub fn activate_petri_dish(&self) -> LabResult<bool> {
        self.request(|reply| LabCommand::ActivatePetri { reply })
    }

    /// Resets the lab.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the worker is busy or gone.
    pub fn reset(&self) -> LabResult<()> {
        self.request(|reply| LabCommand::Reset { reply })
    }

    /// Current state, with every timer due by now already applied.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the worker is busy or gone.
    pub fn snapshot(&self) -> LabResult<LabState> {
        self.request(|reply| LabCommand::Snapshot { reply })
    }

    /// Journal since the last reset.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the worker is busy or gone.
    pub fn history(&self) -> LabResult<Vec<ReactionEvent>> {
        self.request(|reply| LabCommand::History { reply })
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> LabCommand) -> LabResult<T> {
        let tx = self.tx.as_ref().ok_or_else(disconnected)?;
        let (reply_tx, reply_rx) = bounded::<T>(1);
        match tx.try_send(make(reply_tx)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(LabError::Runtime(RuntimeError::QueueFull {
                    capacity: self.cfg.command_queue_capacity.max(1),
                }));
            }
            Err(TrySendError::Disconnected(_)) => return Err(disconnected()),
        }

        let timeout = self.cfg.reply_timeout;
        reply_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => LabError::Runtime(RuntimeError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }
}

impl Drop for LabRuntime {
    fn drop(&mut self) {
        // Closing the only sender ends the worker loop; the engine drops there.
        drop(self.tx.take());
        if let Some(handle) = self.join.take() {
            if handle.join().is_err() {
                error!("lab runtime worker panicked");
            }
        }
    }
}

fn disconnected() -> LabError {
    LabError::Runtime(RuntimeError::Disconnected {
        path: "lab_commands".to_string(),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn worker_loop(mut engine: ReactionEngine, idle_poll: Duration, rx: Receiver<LabCommand>) {
    let started = Instant::now();
    let offset = engine.now_ms();
    debug!(offset_ms = offset, "lab runtime started");

    loop {
        let now = offset + elapsed_ms(started);
        engine.advance_to(now);

        let wait = engine
            .next_deadline_ms()
            .map_or(idle_poll, |due| Duration::from_millis(due.saturating_sub(now)));

        match rx.recv_timeout(wait) {
            Ok(cmd) => {
                engine.advance_to(offset + elapsed_ms(started));
                handle(&mut engine, cmd);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(now_ms = engine.now_ms(), "lab runtime stopped");
}

fn handle(engine: &mut ReactionEngine, cmd: LabCommand) {
    match cmd {
        LabCommand::Drop { zone, reagent, reply } => {
            let _ = reply.send(engine.on_drop(zone, &reagent));
        }
        LabCommand::ActivatePetri { reply } => {
            let _ = reply.send(engine.activate_petri_dish());
        }
        LabCommand::Reset { reply } => {
            engine.reset();
            let _ = reply.send(());
        }
        LabCommand::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        LabCommand::History { reply } => {
            let _ = reply.send(engine.history().to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalogue::Catalogue;

    fn runtime() -> LabRuntime {
        let engine = ReactionEngine::new(Arc::new(Catalogue::default()));
        LabRuntime::start(engine, LabRuntimeConfig::default()).unwrap()
    }

    #[test]
    fn commands_round_trip() {
        let lab = runtime();
        assert_eq!(lab.drop_reagent(Zone::Beaker, "Na").unwrap(), DropOutcome::Accepted);
        assert_eq!(lab.drop_reagent(Zone::Beaker, "Na").unwrap(), DropOutcome::Duplicate);
        assert!(lab.drop_reagent(Zone::Beaker, "").unwrap_err().is_validation());

        let snap = lab.snapshot().unwrap();
        assert_eq!(snap.beaker_reagents.len(), 1);

        lab.reset().unwrap();
        assert!(lab.snapshot().unwrap().is_initial());
        assert!(lab.history().unwrap().is_empty());
    }

    #[test]
    fn config_reads_durations_as_millis() {
        let cfg: LabRuntimeConfig =
            serde_json::from_str(r#"{ "idle_poll": 50, "reply_timeout": 1000 }"#).unwrap();
        assert_eq!(cfg.idle_poll, Duration::from_millis(50));
        assert_eq!(cfg.reply_timeout, Duration::from_secs(1));
        assert_eq!(cfg.command_queue_capacity, 256);
    }

    #[test]
    fn drop_joins_worker() {
        let lab = runtime();
        lab.drop_reagent(Zone::Beaker, "Na").unwrap();
        lab.drop_reagent(Zone::Beaker, "HCl").unwrap();
        drop(lab);
    }
}
