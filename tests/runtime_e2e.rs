use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reactlab::effects::{RecordingSoundPlayer, SoundCall};
use reactlab::{Catalogue, LabRuntime, LabRuntimeConfig, ReactionEngine, SoundCue, Zone};

fn start(sound: &RecordingSoundPlayer) -> LabRuntime {
    let engine = ReactionEngine::new(Arc::new(Catalogue::default())).with_sound(sound.clone());
    LabRuntime::start(engine, LabRuntimeConfig::default()).unwrap()
}

#[test]
fn runtime_delivers_timers_on_wall_clock() {
    let sound = RecordingSoundPlayer::new();
    let lab = start(&sound);
    lab.drop_reagent(Zone::Beaker, "Na").unwrap();
    lab.drop_reagent(Zone::Beaker, "HCl").unwrap();

    thread::sleep(Duration::from_millis(2500));
    let mid = lab.snapshot().unwrap();
    assert_eq!(mid.reaction_message, "2Na + 2HCl → 2NaCl + H₂↑");
    assert!(mid.vapors_visible);
    assert!(!mid.shaking);
    assert_eq!(sound.played(), vec![SoundCue::Boom]);

    thread::sleep(Duration::from_millis(3000));
    let done = lab.snapshot().unwrap();
    assert!(done.reaction_message.is_empty());
    assert!(!done.vapors_visible);
    assert_eq!(lab.history().unwrap().len(), 1);
}

#[test]
fn runtime_reset_cancels_pending_sequence() {
    let sound = RecordingSoundPlayer::new();
    let lab = start(&sound);
    lab.drop_reagent(Zone::Beaker, "Na").unwrap();
    lab.drop_reagent(Zone::Beaker, "H2SO4").unwrap();
    lab.reset().unwrap();

    thread::sleep(Duration::from_millis(1500));
    assert!(lab.snapshot().unwrap().is_initial());
    assert!(sound.played().is_empty());
}

#[test]
fn dropping_runtime_stops_pending_effects() {
    let sound = RecordingSoundPlayer::new();
    let lab = start(&sound);
    lab.drop_reagent(Zone::Beaker, "Mg").unwrap();
    lab.drop_reagent(Zone::Beaker, "HCl").unwrap();
    drop(lab);

    thread::sleep(Duration::from_millis(1500));
    assert_eq!(sound.calls(), vec![SoundCall::StopAll]);
}

#[test]
fn flame_test_through_runtime() {
    let sound = RecordingSoundPlayer::new();
    let lab = start(&sound);
    lab.drop_reagent(Zone::PetriDish, "Na").unwrap();
    assert!(lab.activate_petri_dish().unwrap());
    assert!(lab.snapshot().unwrap().vapors_visible);

    thread::sleep(Duration::from_millis(3500));
    let snap = lab.snapshot().unwrap();
    assert!(!snap.vapors_visible);
    assert_eq!(snap.reaction_message, "Na flame test: Yellow flame");
    assert_eq!(sound.played(), vec![SoundCue::Fire]);
}
