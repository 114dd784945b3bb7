//! Scene snapshot and restore with BLAKE3 hashing.
//!
//! [`SceneSnapshot`] is a serializable copy of everything a frame depends
//! on: the body registry (handles and free slots included), every player's
//! controller, latched input and bookkeeping, the props, the frame counters
//! and the scene configuration. A BLAKE3 digest of that state backs
//! determinism checks and replay checkpoints.
//!
//! # Usage
//!
//! ```
//! use gridrunner_engine::prelude::*;
//!
//! let tiles = TileGrid::from_ascii(&["......", "......", "######"], 16.0).unwrap();
//! let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap();
//! scene.add_player(Vec2::new(24.0, 32.0), PlayerTuning::default()).unwrap();
//! scene.run_frames(10, &[]).unwrap();
//!
//! let snapshot = scene.capture_snapshot().unwrap();
//! assert_eq!(snapshot.frame, 10);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//!
//! scene.run_frames(10, &[]).unwrap();
//! scene.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(scene.frame(), 10);
//! assert_eq!(scene.state_hash().unwrap(), snapshot.hash);
//! ```
//!
//! # What Is NOT Serialized
//!
//! - **Tile layer** and **physics configuration**: a snapshot is restored
//!   onto a scene built for the same level.
//! - **Physics event lists**: cleared on restore; the next frame refills
//!   them.
//! - **Diagnostics**: per-frame timing is transient.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gridrunner_physics::handle::SlotArena;
use gridrunner_physics::{BodyHandle, PhysicsBody};

use crate::config::SceneConfig;
use crate::scene::{PlayerSlot, PropKind, Scene};
use crate::SceneError;

// ---------------------------------------------------------------------------
// SceneSnapshot
// ---------------------------------------------------------------------------

/// A serializable snapshot of a scene's simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Number of frames the scene had executed at capture.
    pub frame: u64,
    /// Number of physics `advance` calls at capture.
    pub physics_frame: u64,
    pub config: SceneConfig,
    pub bodies: SlotArena<PhysicsBody>,
    pub players: Vec<PlayerSlot>,
    /// Props in handle order.
    pub props: Vec<(BodyHandle, PropKind)>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of every other field.
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

/// The hashed part of a snapshot, borrowed so hashing a live scene does not
/// clone it.
#[derive(Serialize)]
struct HashableState<'a> {
    frame: u64,
    physics_frame: u64,
    config: &'a SceneConfig,
    bodies: &'a SlotArena<PhysicsBody>,
    players: &'a [PlayerSlot],
    props: &'a [(BodyHandle, PropKind)],
}

impl HashableState<'_> {
    fn hash(&self) -> Result<String, SceneError> {
        let bytes = serde_json::to_vec(self).map_err(|e| SceneError::Snapshot {
            details: e.to_string(),
        })?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

impl SceneSnapshot {
    fn hashable(&self) -> HashableState<'_> {
        HashableState {
            frame: self.frame,
            physics_frame: self.physics_frame,
            config: &self.config,
            bodies: &self.bodies,
            players: &self.players,
            props: &self.props,
        }
    }

    /// Recompute the digest and compare it with the recorded one.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SnapshotHashMismatch`] if the snapshot was
    /// altered after capture.
    pub fn verify(&self) -> Result<(), SceneError> {
        let recomputed = self.hashable().hash()?;
        if recomputed != self.hash {
            return Err(SceneError::SnapshotHashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Snapshot`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SceneError> {
        serde_json::to_string(self).map_err(|e| SceneError::Snapshot {
            details: e.to_string(),
        })
    }

    /// Parse from JSON and verify the digest.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Snapshot`] on malformed JSON and
    /// [`SceneError::SnapshotHashMismatch`] if the content does not match
    /// its digest.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let snapshot: SceneSnapshot =
            serde_json::from_str(json).map_err(|e| SceneError::Snapshot {
                details: e.to_string(),
            })?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Scene snapshot/restore methods
// ---------------------------------------------------------------------------

impl Scene {
    /// Capture the scene's simulation state.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Snapshot`] if the state cannot be serialized
    /// for hashing.
    pub fn capture_snapshot(&self) -> Result<SceneSnapshot, SceneError> {
        let props = self.prop_list();
        let mut snapshot = SceneSnapshot {
            frame: self.frame(),
            physics_frame: self.physics().frame_count(),
            config: self.config().clone(),
            bodies: self.physics().registry().clone(),
            players: self.players().to_vec(),
            props,
            hash: String::new(),
        };
        snapshot.hash = snapshot.hashable().hash()?;
        Ok(snapshot)
    }

    /// Restore a previously captured state onto this scene.
    ///
    /// The snapshot is verified before anything is touched, so on error the
    /// scene is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidConfig`] for a snapshot carrying an
    /// unusable configuration, [`SceneError::SnapshotHashMismatch`] for a
    /// corrupted one, and [`SceneError::SnapshotMismatch`] if a player or
    /// prop refers to a body missing from the snapshot's registry.
    pub fn restore_from_snapshot(&mut self, snapshot: &SceneSnapshot) -> Result<(), SceneError> {
        snapshot.config.validate()?;
        snapshot.verify()?;

        let missing = snapshot
            .players
            .iter()
            .map(PlayerSlot::body)
            .chain(snapshot.props.iter().map(|(handle, _)| *handle))
            .find(|handle| !snapshot.bodies.contains(*handle));
        if let Some(handle) = missing {
            return Err(SceneError::SnapshotMismatch {
                details: format!("body {handle} is referenced but not in the registry"),
            });
        }

        self.physics_mut()
            .restore_registry(snapshot.bodies.clone(), snapshot.physics_frame);
        self.restore_parts(
            snapshot.config.clone(),
            snapshot.frame,
            snapshot.players.clone(),
            &snapshot.props,
        );
        debug!(frame = snapshot.frame, "scene restored from snapshot");
        Ok(())
    }

    /// BLAKE3 digest of the current state, equal to
    /// `capture_snapshot()?.hash` without cloning the state.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Snapshot`] if the state cannot be serialized.
    pub fn state_hash(&self) -> Result<String, SceneError> {
        let props = self.prop_list();
        HashableState {
            frame: self.frame(),
            physics_frame: self.physics().frame_count(),
            config: self.config(),
            bodies: self.physics().registry(),
            players: self.players(),
            props: &props,
        }
        .hash()
    }

    /// Capture a branch point. Identical to
    /// [`capture_snapshot`](Self::capture_snapshot), named for branching
    /// workflows.
    ///
    /// # Errors
    ///
    /// Same as [`capture_snapshot`](Self::capture_snapshot).
    pub fn fork_snapshot(&self) -> Result<SceneSnapshot, SceneError> {
        self.capture_snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
