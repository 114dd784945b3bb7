//! Headless two-player run -- seeded random input, recorded and replayed.
//!
//! Run with:
//!   cargo run --example headless_run -p gridrunner-engine -- [seed] [frames]
//!
//! Set `RUST_LOG=debug` to watch state transitions and game events.

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use gridrunner_engine::prelude::*;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

const LEVEL: &[&str] = &[
    "##############################",
    "#............................#",
    "#............................#",
    "#.....####H.........-----....#",
    "#.........H..................#",
    "#.........H.......##......E..#",
    "#..H......H.....######....#..#",
    "#..H.......^^^..........###..#",
    "#..H.........................#",
    "##############################",
];

// ---------------------------------------------------------------------------
// Input bot
// ---------------------------------------------------------------------------

/// Holds a random set of actions for a random number of frames.
struct Bot {
    rng: Pcg64,
    held: ActionSet,
    frames_left: u32,
}

impl Bot {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            held: ActionSet::EMPTY,
            frames_left: 0,
        }
    }

    fn next(&mut self) -> ActionSet {
        if self.frames_left == 0 {
            self.held = ActionSet::from_bits(self.rng.gen());
            self.frames_left = self.rng.gen_range(5..40);
        }
        self.frames_left -= 1;
        self.held
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid seed {arg:?}"))?,
        None => 7,
    };
    let frames: u64 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid frame count {arg:?}"))?,
        None => 1_800,
    };

    let tiles = TileGrid::from_ascii(LEVEL, 16.0)?;
    let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles)?;
    let p1 = scene.add_player(Vec2::new(40.0, 144.0), PlayerTuning::default())?;
    let p2 = scene.add_player(Vec2::new(120.0, 144.0), PlayerTuning::default())?;
    for (x, y) in [(88.0, 88.0), (200.0, 120.0), (264.0, 136.0), (440.0, 136.0)] {
        let coin = PhysicsBody::new(Vec2::new(x, y))
            .with_gravity(false)
            .with_collider(Collider::trigger(Shape::circle(4.0), Alignment::Center));
        scene.add_prop(coin, PropKind::Pickup { value: 10 })?;
    }

    let mut bots = [Bot::new(seed), Bot::new(seed.wrapping_add(1))];
    let mut recorder = ReplayRecorder::new(scene.capture_snapshot()?, 60);
    let mut event_count = 0usize;

    for _ in 0..frames {
        let held = [bots[0].next(), bots[1].next()];
        let events = recorder.record_step(&mut scene, &held)?;
        for event in &events {
            match event {
                GameEvent::Contact { .. } => {}
                other => println!("frame {:>5}: {other:?}", scene.frame()),
            }
        }
        event_count += events.len();
        if scene.all_players_dead() {
            println!("frame {:>5}: everybody is dead", scene.frame());
            break;
        }
    }

    let final_hash = scene.state_hash()?;
    let log = recorder.finish();
    println!(
        "recorded {} frames, {} log entries, {event_count} events",
        log.total_frames,
        log.entries.len()
    );
    for id in [p1, p2] {
        if let Some(slot) = scene.player(id) {
            println!(
                "{id}: {:?}, health {}, score {}",
                slot.state_kind(),
                slot.health(),
                slot.score()
            );
        }
    }

    let result = replay(&mut scene, &log)?;
    anyhow::ensure!(
        result.completed && result.first_divergence.is_none(),
        "replay diverged: {:?}",
        result.first_divergence
    );
    anyhow::ensure!(
        scene.state_hash()? == final_hash,
        "replay finished in a different state"
    );
    println!("replay verified: {} frames, hash {final_hash}", result.frames_replayed);
    Ok(())
}
