//! Replay system for recording and playing back galaxies.
//!
//! A replay stores the initial galaxy snapshot and every command applied to
//! it, time advancement included. Playing the commands back against the
//! snapshot recreates the run exactly, which the stored final hash confirms.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GameError, Result};
use crate::galaxy::{CommandOutcome, Galaxy, GalaxyCommand};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Serialized initial galaxy state.
    pub initial_state: Vec<u8>,
    /// Commands in the order they were applied.
    pub commands: Vec<GalaxyCommand>,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from a galaxy's current state.
    ///
    /// # Errors
    /// Returns an error if the galaxy cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Galaxy) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            initial_state: initial_state.serialize()?,
            commands: Vec::new(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record a command for replay.
    pub fn record_command(&mut self, command: GalaxyCommand) {
        self.commands.push(command);
    }

    /// Apply a command to `galaxy` and record it.
    ///
    /// Refused commands are recorded too; they change nothing on playback
    /// either.
    ///
    /// # Errors
    /// Propagates the error of the command.
    pub fn apply_and_record(
        &mut self,
        galaxy: &mut Galaxy,
        command: GalaxyCommand,
    ) -> Result<CommandOutcome> {
        self.commands.push(command.clone());
        galaxy.apply(command)
    }

    /// Store the end-of-run hash.
    pub fn finalize(&mut self, final_hash: u64) {
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization or the version
    /// check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Rebuild the galaxy the replay started from.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Galaxy> {
        Galaxy::deserialize(&self.initial_state)
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    galaxy: Galaxy,
    position: usize,
    rejected: usize,
}

impl ReplayPlayer {
    /// Create a player positioned before the first command.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let galaxy = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            galaxy,
            position: 0,
            rejected: 0,
        })
    }

    /// Apply the next command.
    ///
    /// Returns `false` once every command has been played.
    pub fn advance(&mut self) -> bool {
        let Some(command) = self.replay.commands.get(self.position).cloned() else {
            return false;
        };
        if let Err(e) = self.galaxy.apply(command) {
            debug!(position = self.position, error = %e, "Recorded command refused");
            self.rejected += 1;
        }
        self.position += 1;
        !self.is_finished()
    }

    /// Restart from the snapshot and play up to `position` commands.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        self.galaxy = self.replay.restore_initial_state()?;
        self.position = 0;
        self.rejected = 0;
        while self.position < position.min(self.replay.commands.len()) {
            self.advance();
        }
        Ok(())
    }

    /// Commands applied so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Commands that were refused during playback so far.
    #[must_use]
    pub const fn rejected(&self) -> usize {
        self.rejected
    }

    /// Current galaxy state.
    #[must_use]
    pub const fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether every command has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.position >= self.replay.commands.len()
    }

    /// Play every command from the start and compare the final hash.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.commands.len())?;
        let actual = self.galaxy.state_hash();
        if actual != self.replay.final_hash {
            warn!(
                expected = self.replay.final_hash,
                actual, "Replay hash mismatch"
            );
        }
        Ok(actual == self.replay.final_hash)
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.commands.is_empty() {
            100.0
        } else {
            (self.position as f64 / self.replay.commands.len() as f64) * 100.0
        }
    }
}
