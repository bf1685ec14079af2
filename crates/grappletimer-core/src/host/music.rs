use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::timer::Phase;

/// What to do with background music as the session moves between phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MusicMode {
    /// Leave playback alone.
    #[default]
    Off,
    /// Resume whatever the music service was playing.
    UseCurrentPlayback,
    /// Start a specific playlist on every work round.
    UsePlaylist { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MusicAction {
    Resume,
    Play { uri: String },
    Pause,
}

impl MusicMode {
    /// Action to take on entering `phase`.
    pub fn action_for(&self, phase: Phase) -> Option<MusicAction> {
        match (self, phase) {
            (MusicMode::Off, _) => None,
            (MusicMode::UseCurrentPlayback, Phase::Work { .. }) => Some(MusicAction::Resume),
            (MusicMode::UsePlaylist { uri }, Phase::Work { .. }) => {
                Some(MusicAction::Play { uri: uri.clone() })
            }
            (_, Phase::Rest { .. } | Phase::Done) => Some(MusicAction::Pause),
            _ => None,
        }
    }
}

/// Remote control for an external music service.
pub trait MusicControl: Send {
    /// # Errors
    /// Returns an error if the service rejects the command.
    fn resume(&mut self) -> Result<(), CoreError>;

    /// # Errors
    /// Returns an error if the service rejects the command.
    fn play(&mut self, uri: &str) -> Result<(), CoreError>;

    /// # Errors
    /// Returns an error if the service rejects the command.
    fn pause(&mut self) -> Result<(), CoreError>;

    /// # Errors
    /// Returns whatever the underlying call returned.
    fn apply(&mut self, action: &MusicAction) -> Result<(), CoreError> {
        match action {
            MusicAction::Resume => self.resume(),
            MusicAction::Play { uri } => self.play(uri),
            MusicAction::Pause => self.pause(),
        }
    }
}

/// Music control that does nothing, for hosts without a music service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMusic;

impl MusicControl for NoMusic {
    fn resume(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    fn play(&mut self, _uri: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
}
