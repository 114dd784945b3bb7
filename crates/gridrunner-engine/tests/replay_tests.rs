//! Integration tests for the deterministic replay system.
//!
//! These tests validate recording, replaying, checkpoint verification,
//! divergence detection, and JSON serialization of [`ReplayLog`], using
//! seeded `rand_pcg` input streams for two players.

use gridrunner_engine::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LEVEL: &[&str] = &[
    "####################",
    "#..................#",
    "#.....####H........#",
    "#.........H....E...#",
    "#..H......H........#",
    "#..H.....^^H.......#",
    "####################",
];

fn build_scene(level: &[&str]) -> Scene {
    let tiles = TileGrid::from_ascii(level, 16.0).unwrap();
    let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap();
    scene
        .add_player(Vec2::new(40.0, 96.0), PlayerTuning::default())
        .unwrap();
    scene
        .add_player(Vec2::new(232.0, 96.0), PlayerTuning::default())
        .unwrap();
    let coin = PhysicsBody::new(Vec2::new(120.0, 88.0))
        .with_gravity(false)
        .with_collider(Collider::trigger(Shape::circle(4.0), Alignment::Center));
    scene.add_prop(coin, PropKind::Pickup { value: 5 }).unwrap();
    scene
}

/// Two players' held actions per frame, changing every few frames.
fn random_inputs(seed: u64, frames: usize) -> Vec<[ActionSet; 2]> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut held = [ActionSet::EMPTY; 2];
    (0..frames)
        .map(|_| {
            for set in &mut held {
                if rng.gen_bool(0.15) {
                    *set = ActionSet::from_bits(rng.gen());
                }
            }
            held
        })
        .collect()
}

/// Record a run and return the log plus the final state hash.
fn record(scene: &mut Scene, inputs: &[[ActionSet; 2]], interval: u64) -> (ReplayLog, String) {
    let mut recorder = ReplayRecorder::new(scene.capture_snapshot().unwrap(), interval);
    for held in inputs {
        recorder.record_step(scene, held).unwrap();
    }
    (recorder.finish(), scene.state_hash().unwrap())
}

// ---------------------------------------------------------------------------
// Recording and replaying
// ---------------------------------------------------------------------------

#[test]
fn replay_reproduces_recorded_run() {
    let mut scene = build_scene(LEVEL);
    let inputs = random_inputs(42, 300);
    let (log, final_hash) = record(&mut scene, &inputs, 30);

    assert_eq!(log.total_frames, 300);
    let checkpoints = log
        .entries
        .iter()
        .filter(|e| matches!(e, ReplayEntry::Checkpoint { .. }))
        .count();
    assert_eq!(checkpoints, 10);

    let mut fresh = build_scene(LEVEL);
    let result = replay(&mut fresh, &log).unwrap();
    assert!(result.completed);
    assert_eq!(result.frames_replayed, 300);
    assert!(result.first_divergence.is_none());
    assert_eq!(fresh.state_hash().unwrap(), final_hash);
}

#[test]
fn same_seed_same_hash_different_seed_different_hash() {
    let run = |seed| {
        let mut scene = build_scene(LEVEL);
        for held in random_inputs(seed, 240) {
            scene.step(&held).unwrap();
        }
        scene.state_hash().unwrap()
    };
    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn idle_frames_are_not_logged_as_inputs() {
    let mut scene = build_scene(LEVEL);
    let mut inputs = vec![[ActionSet::EMPTY; 2]; 20];
    inputs[5][1] = ActionSet::EMPTY.with(Action::Jump);
    let (log, _) = record(&mut scene, &inputs, 0);

    let input_frames: Vec<u64> = log
        .entries
        .iter()
        .filter_map(|e| match e {
            ReplayEntry::Input { frame, .. } => Some(*frame),
            ReplayEntry::Checkpoint { .. } => None,
        })
        .collect();
    assert_eq!(input_frames, vec![5]);
}

#[test]
fn log_survives_json_roundtrip() {
    let mut scene = build_scene(LEVEL);
    let (log, final_hash) = record(&mut scene, &random_inputs(3, 120), 20);

    let json = log.to_json().unwrap();
    let parsed = ReplayLog::from_json(&json).unwrap();
    assert_eq!(parsed, log);

    let mut fresh = build_scene(LEVEL);
    let result = replay(&mut fresh, &parsed).unwrap();
    assert!(result.completed);
    assert_eq!(fresh.state_hash().unwrap(), final_hash);
}

// ---------------------------------------------------------------------------
// Divergence
// ---------------------------------------------------------------------------

#[test]
fn tampered_checkpoint_reports_divergence() {
    let mut scene = build_scene(LEVEL);
    let (mut log, _) = record(&mut scene, &random_inputs(11, 100), 25);

    for entry in &mut log.entries {
        if let ReplayEntry::Checkpoint { frame: 50, state_hash } = entry {
            *state_hash = "0".repeat(64);
        }
    }

    let result = replay(&mut scene, &log).unwrap();
    assert!(!result.completed);
    assert_eq!(result.frames_replayed, 50);
    let divergence = result.first_divergence.unwrap();
    assert_eq!(divergence.frame, 50);
    assert_eq!(divergence.expected_hash, "0".repeat(64));
    assert_ne!(divergence.actual_hash, divergence.expected_hash);
}

#[test]
fn replay_on_a_different_level_diverges() {
    let mut scene = build_scene(LEVEL);
    let (log, _) = record(&mut scene, &random_inputs(5, 90), 30);

    // Same layout without the floor: the tile layer is not part of the
    // snapshot, so the first checkpoint still matches.
    let mut floorless = LEVEL.to_vec();
    floorless[6] = "#..................#";
    let mut other = build_scene(&floorless);

    let result = replay(&mut other, &log).unwrap();
    assert!(!result.completed);
    assert_eq!(result.first_divergence.unwrap().frame, 30);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn duplicate_entries_are_rejected_before_touching_the_scene() {
    let mut scene = build_scene(LEVEL);
    let (mut log, _) = record(&mut scene, &random_inputs(9, 40), 10);
    let duplicate = log
        .entries
        .iter()
        .find(|e| matches!(e, ReplayEntry::Checkpoint { .. }))
        .cloned()
        .unwrap();
    log.entries.push(duplicate);

    let before = scene.state_hash().unwrap();
    let err = replay(&mut scene, &log).unwrap_err();
    assert!(err.to_string().contains("duplicate checkpoint"), "{err}");
    assert_eq!(scene.state_hash().unwrap(), before);
}

#[test]
fn out_of_order_recording_is_an_error() {
    let scene = build_scene(LEVEL);
    let mut recorder = ReplayRecorder::new(scene.capture_snapshot().unwrap(), 10);
    recorder.record_frame(3, &[], None).unwrap();
    assert!(recorder.record_frame(3, &[], None).is_err());
    assert!(recorder.record_frame(2, &[], None).is_err());
    recorder.record_frame(4, &[], None).unwrap();
    assert_eq!(recorder.finish().total_frames, 2);
}

#[test]
fn empty_log_completes_immediately() {
    let mut scene = build_scene(LEVEL);
    scene.run_frames(10, &[]).unwrap();
    let recorder = ReplayRecorder::new(scene.capture_snapshot().unwrap(), 10);
    let log = recorder.finish();

    let result = replay(&mut scene, &log).unwrap();
    assert!(result.completed);
    assert_eq!(result.frames_replayed, 0);
    assert_eq!(scene.frame(), 10);
}
