//! Data source module - Abstraction for loading replay frames
//!
//! This module provides a trait-based abstraction for reading replays from
//! multiple sources (JSON files on disk, built-in mock data).

use crate::session::SequenceSearchModel;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub mod mock;
pub mod models;

// Re-export models
use crate::cli::DataSourceType;
pub use models::{FighterFrame, FighterInfo, Replay, SessionMetadata};

/// Replay provider
///
/// Implementations provide different backends for replay data:
/// - `JsonReplayFile`: Reads a serialized replay from disk
/// - `MockReplaySource`: Provides a generated sample match
pub trait ReplaySource {
    /// Where the replay comes from, for logs and error messages
    fn describe(&self) -> String;

    /// Read the whole replay
    fn load(&self) -> Result<Replay>;
}

/// Replay stored as JSON
#[derive(Debug, Clone)]
pub struct JsonReplayFile {
    path: PathBuf,
}

impl JsonReplayFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplaySource for JsonReplayFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Replay> {
        let contents = std::fs::read_to_string(&self.path)?;
        let replay: Replay = serde_json::from_str(&contents)?;
        validate(&replay)?;
        tracing::debug!(
            "Loaded {} frame(s) from {}",
            replay.frame_count(),
            self.path.display()
        );
        Ok(replay)
    }
}

/// Every frame must hold exactly one entry per fighter slot
pub fn validate(replay: &Replay) -> Result<()> {
    let slots = replay.metadata.fighters.len();
    if slots == 0 {
        return Err(Error::data("Replay has no fighters"));
    }
    if let Some((idx, frame)) = replay
        .frames
        .iter()
        .enumerate()
        .find(|(_, frame)| frame.len() != slots)
    {
        return Err(Error::data(format!(
            "Frame {} has {} fighter entries, expected {}",
            idx,
            frame.len(),
            slots
        )));
    }
    Ok(())
}

/// Start a new session in `model` and feed it every frame of `replay`
pub fn ingest(model: &mut SequenceSearchModel, replay: &Replay) -> Result<usize> {
    validate(replay)?;
    let session = model.start_new_session(replay.metadata.clone());
    for frame in &replay.frames {
        model.add_frame(frame)?;
    }
    Ok(session)
}

/// Create replay sources based on type
pub fn create_replay_sources(
    source_type: DataSourceType,
    paths: &[PathBuf],
) -> Result<Vec<Box<dyn ReplaySource>>> {
    match source_type {
        DataSourceType::Mock => Ok(vec![Box::new(mock::MockReplaySource::new())]),
        DataSourceType::Json => {
            if paths.is_empty() {
                return Err(Error::custom("No replay files given (use --replay)"));
            }
            Ok(paths
                .iter()
                .map(|path| Box::new(JsonReplayFile::new(path)) as Box<dyn ReplaySource>)
                .collect())
        }
    }
}
