//! reactlab simulator
//!
//! Replays a line-oriented lab script against the reaction engine and prints
//! state snapshots as JSON.
//!
//! ```text
//! # comment
//! drop beaker Na
//! drop beaker HCl
//! wait 1200
//! snapshot
//! drop petri Na
//! click petri
//! history
//! reset
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reactlab::effects::{SoundCue, SoundPlayer};
use reactlab::{Catalogue, LabError, LabResult, LabRuntime, LabRuntimeConfig, ReactionEngine, Zone};

/// Simulator configuration
#[derive(Default)]
struct Config {
    /// Catalogue JSON; the built-in shelf when absent
    catalogue: Option<PathBuf>,
    /// Script file; stdin when absent
    script: Option<PathBuf>,
    /// Run on the threaded runtime with real sleeps
    realtime: bool,
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalogue" | "-c" => {
                if i + 1 < args.len() {
                    config.catalogue = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --catalogue requires a value");
                    std::process::exit(1);
                }
            }
            "--script" | "-s" => {
                if i + 1 < args.len() {
                    config.script = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --script requires a value");
                    std::process::exit(1);
                }
            }
            "--realtime" => {
                config.realtime = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("reactlab-sim - replay a virtual chemistry lab script");
                println!();
                println!("USAGE:");
                println!("    reactlab-sim [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -c, --catalogue <PATH>  Catalogue JSON [default: built-in]");
                println!("    -s, --script <PATH>     Script file [default: stdin]");
                println!("        --realtime          Drive the threaded runtime with real sleeps");
                println!("    -h, --help              Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {}", arg);
                std::process::exit(1);
            }
        }
    }

    config
}

/// Logs cues instead of playing them.
struct LoggingSoundPlayer;

impl SoundPlayer for LoggingSoundPlayer {
    fn play(&self, cue: SoundCue) {
        info!(clip = cue.clip_id(), "play");
    }

    fn stop_all(&self) {
        info!("stop all sounds");
    }
}

enum Step {
    Drop(Zone, String),
    ClickPetri,
    Wait(u64),
    Reset,
    Snapshot,
    History,
}

fn parse_step(line_no: usize, line: &str) -> Result<Option<Step>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    let step = match words.as_slice() {
        ["drop", zone, reagent] => {
            let zone: Zone = zone.parse().map_err(|e| format!("line {line_no}: {e}"))?;
            Step::Drop(zone, (*reagent).to_string())
        }
        ["click", "petri"] => Step::ClickPetri,
        ["wait", ms] => Step::Wait(
            ms.parse()
                .map_err(|_| format!("line {line_no}: invalid wait '{ms}'"))?,
        ),
        ["reset"] => Step::Reset,
        ["snapshot"] => Step::Snapshot,
        ["history"] => Step::History,
        _ => return Err(format!("line {line_no}: unrecognised step '{line}'")),
    };
    Ok(Some(step))
}

fn print_json<T: serde::Serialize>(value: &T) -> LabResult<()> {
    let json = serde_json::to_string(value).map_err(|e| LabError::internal(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn run_virtual(engine: &mut ReactionEngine, steps: Vec<Step>) -> LabResult<()> {
    for step in steps {
        match step {
            Step::Drop(zone, reagent) => {
                let outcome = engine.on_drop(zone, &reagent)?;
                info!(%zone, %reagent, ?outcome, now_ms = engine.now_ms(), "drop");
            }
            Step::ClickPetri => {
                engine.activate_petri_dish();
            }
            Step::Wait(ms) => {
                engine.advance(ms);
            }
            Step::Reset => engine.reset(),
            Step::Snapshot => print_json(&serde_json::json!({
                "at_ms": engine.now_ms(),
                "state": engine.snapshot(),
            }))?,
            Step::History => print_json(&engine.history())?,
        }
    }
    Ok(())
}

fn run_realtime(lab: &LabRuntime, steps: Vec<Step>) -> LabResult<()> {
    for step in steps {
        match step {
            Step::Drop(zone, reagent) => {
                let outcome = lab.drop_reagent(zone, &reagent)?;
                info!(%zone, %reagent, ?outcome, "drop");
            }
            Step::ClickPetri => {
                lab.activate_petri_dish()?;
            }
            Step::Wait(ms) => thread::sleep(Duration::from_millis(ms)),
            Step::Reset => lab.reset()?,
            Step::Snapshot => print_json(&lab.snapshot()?)?,
            Step::History => print_json(&lab.history()?)?,
        }
    }
    Ok(())
}

fn run(config: Config) -> LabResult<()> {
    let catalogue = match &config.catalogue {
        Some(path) => Catalogue::load(path)?,
        None => Catalogue::default(),
    };

    let script = match &config.script {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| LabError::internal(format!("failed to read {}: {e}", path.display())))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| LabError::internal(format!("failed to read stdin: {e}")))?;
            buf
        }
    };

    let mut steps = Vec::new();
    for (idx, line) in script.lines().enumerate() {
        if let Some(step) = parse_step(idx + 1, line).map_err(LabError::internal)? {
            steps.push(step);
        }
    }

    let engine = ReactionEngine::new(Arc::new(catalogue)).with_sound(LoggingSoundPlayer);
    if config.realtime {
        let lab = LabRuntime::start(engine, LabRuntimeConfig::default())?;
        run_realtime(&lab, steps)
    } else {
        let mut engine = engine;
        run_virtual(&mut engine, steps)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = parse_args();
    if let Err(e) = run(config) {
        error!(error = %e, "simulation failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
