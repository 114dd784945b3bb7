//! Deterministic replay with input recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] captures every frame's held actions and periodic
//! state hash checkpoints into a [`ReplayLog`]. [`replay`] restores the
//! log's initial snapshot onto a scene built for the same level, feeds the
//! recorded inputs frame by frame and compares state hashes at every
//! checkpoint.
//!
//! # Recording
//!
//! ```
//! use gridrunner_engine::prelude::*;
//!
//! let tiles = TileGrid::from_ascii(&["......", "......", "######"], 16.0).unwrap();
//! let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap();
//! scene.add_player(Vec2::new(24.0, 32.0), PlayerTuning::default()).unwrap();
//!
//! let mut recorder = ReplayRecorder::new(scene.capture_snapshot().unwrap(), 10);
//! for frame in 0..60 {
//!     let held = if frame < 30 { ActionSet::EMPTY.with(Action::MoveRight) } else { ActionSet::EMPTY };
//!     recorder.record_step(&mut scene, &[held]).unwrap();
//! }
//! let log = recorder.finish();
//!
//! let result = replay(&mut scene, &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gridrunner_player::ActionSet;

use crate::scene::{GameEvent, Scene};
use crate::snapshot::SceneSnapshot;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay log: initial snapshot plus the ordered inputs and
/// checkpoints recorded after it.
///
/// The log serializes to JSON for storage or regression fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// The snapshot replay begins from.
    pub initial_snapshot: SceneSnapshot,
    /// Number of frames recorded. Replay runs exactly this many frames,
    /// however many entries exist.
    pub total_frames: u64,
    pub entries: Vec<ReplayEntry>,
}

impl ReplayLog {
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be produced.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("failed to serialize replay log")
    }

    /// # Errors
    ///
    /// Returns an error for malformed JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse replay log")
    }
}

// ---------------------------------------------------------------------------
// ReplayEntry
// ---------------------------------------------------------------------------

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEntry {
    /// Held actions per player for one frame. Frames where nobody holds
    /// anything are not recorded.
    Input { frame: u64, held: Vec<ActionSet> },
    /// State hash taken before the frame ran.
    Checkpoint { frame: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of replaying a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every recorded frame was replayed without divergence.
    pub completed: bool,
    pub frames_replayed: u64,
    /// The first checkpoint whose hash did not match. `None` when the run
    /// was deterministic.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details about a determinism failure detected during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub frame: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a scene run into a [`ReplayLog`].
///
/// Frames must be recorded in strictly increasing order.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Checkpoint every this many frames; 0 checkpoints whenever a hash is
    /// supplied.
    checkpoint_interval: u64,
    frames_recorded: u64,
    last_frame: Option<u64>,
}

impl ReplayRecorder {
    /// Start a recording from `snapshot`.
    ///
    /// `checkpoint_interval` of 10 means checkpoints at frames 0, 10, 20 and
    /// so on, counted on the scene's frame counter.
    pub fn new(snapshot: SceneSnapshot, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                initial_snapshot: snapshot,
                total_frames: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            frames_recorded: 0,
            last_frame: None,
        }
    }

    /// Whether a checkpoint would be kept for `frame`.
    pub fn wants_checkpoint(&self, frame: u64) -> bool {
        self.checkpoint_interval == 0 || frame % self.checkpoint_interval == 0
    }

    /// Record one frame. Call this before the frame runs, with the hash of
    /// the state the frame starts from.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame` is not strictly greater than the frame of
    /// the previous call.
    pub fn record_frame(
        &mut self,
        frame: u64,
        held: &[ActionSet],
        state_hash: Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(prev) = self.last_frame {
            ensure!(
                frame > prev,
                "frame {frame} is not strictly greater than previous frame {prev}"
            );
        }
        self.last_frame = Some(frame);
        self.frames_recorded += 1;

        if held.iter().any(|set| !set.is_empty()) {
            self.log.entries.push(ReplayEntry::Input {
                frame,
                held: held.to_vec(),
            });
        }
        if let Some(state_hash) = state_hash.filter(|_| self.wants_checkpoint(frame)) {
            self.log
                .entries
                .push(ReplayEntry::Checkpoint { frame, state_hash });
        }
        Ok(())
    }

    /// Record and run one frame of `scene`, hashing only on checkpoint
    /// frames.
    ///
    /// # Errors
    ///
    /// Returns an error if recording is out of order or the frame fails.
    pub fn record_step(
        &mut self,
        scene: &mut Scene,
        held: &[ActionSet],
    ) -> anyhow::Result<Vec<GameEvent>> {
        let frame = scene.frame();
        let hash = if self.wants_checkpoint(frame) {
            Some(scene.state_hash()?)
        } else {
            None
        };
        self.record_frame(frame, held, hash)?;
        Ok(scene.step(held)?)
    }

    /// Finish recording and return the log.
    pub fn finish(mut self) -> ReplayLog {
        self.log.total_frames = self.frames_recorded;
        debug!(
            frames = self.log.total_frames,
            entries = self.log.entries.len(),
            "replay recording finished"
        );
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `scene`, verifying every checkpoint.
///
/// The log is validated (no duplicate entries, no frame overflow) before
/// the scene is touched. Replay then restores the initial snapshot and, for
/// each frame, compares any checkpoint against the current state hash
/// before running the frame with the recorded input. It stops at the first
/// divergence.
///
/// # Errors
///
/// Returns an error for a malformed log, a snapshot that fails to restore,
/// or a frame that fails to run. On a validation error the scene is
/// unmodified.
pub fn replay(scene: &mut Scene, log: &ReplayLog) -> anyhow::Result<ReplayResult> {
    let mut inputs: BTreeMap<u64, &[ActionSet]> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { frame, held } => {
                if inputs.insert(*frame, held.as_slice()).is_some() {
                    bail!("replay log contains duplicate input entry at frame {frame}");
                }
            }
            ReplayEntry::Checkpoint { frame, state_hash } => {
                if checkpoints.insert(*frame, state_hash).is_some() {
                    bail!("replay log contains duplicate checkpoint entry at frame {frame}");
                }
            }
        }
    }

    let start = log.initial_snapshot.frame;
    let end = start.checked_add(log.total_frames).ok_or_else(|| {
        anyhow!(
            "frame range overflow: start {start} + total {} exceeds u64::MAX",
            log.total_frames
        )
    })?;

    scene
        .restore_from_snapshot(&log.initial_snapshot)
        .context("failed to restore initial snapshot for replay")?;

    let mut frames_replayed = 0;
    for frame in start..end {
        if let Some(expected) = checkpoints.get(&frame) {
            let actual = scene.state_hash()?;
            if actual != *expected {
                warn!(frame, "replay diverged from recording");
                return Ok(ReplayResult {
                    completed: false,
                    frames_replayed,
                    first_divergence: Some(ReplayDivergence {
                        frame,
                        expected_hash: (*expected).to_owned(),
                        actual_hash: actual,
                    }),
                });
            }
        }
        let held = inputs.get(&frame).copied().unwrap_or_default();
        scene
            .step(held)
            .with_context(|| format!("replay frame {frame} failed"))?;
        frames_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        frames_replayed,
        first_divergence: None,
    })
}
