// Observable playback state mirrored onto the host session

use crate::error::{BridgeError, Result};
use crate::report::EngineReport;

pub const UNKNOWN_TITLE: &str = "Unknown Media";
pub const UNKNOWN_AUTHOR: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Transport mode of the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Audio is currently playing
    Playing,
    /// Audio is paused, the session stays alive
    Paused,
    /// Playback has stopped
    #[default]
    Stopped,
}

impl Transport {
    /// Decode the integer code used across the engine boundary
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Transport::Playing),
            1 => Ok(Transport::Paused),
            2 => Ok(Transport::Stopped),
            other => Err(BridgeError::InvalidReport(format!(
                "Unknown transport code: {}",
                other
            ))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Transport::Playing => 0,
            Transport::Paused => 1,
            Transport::Stopped => 2,
        }
    }

    pub fn is_playing(self) -> bool {
        self == Transport::Playing
    }
}

/// Snapshot of everything the host can observe about playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub transport: Transport,
    pub title: String,
    pub author: String,
    pub album: String,
    /// Current playback position in milliseconds
    pub position_ms: u64,
    /// Total duration in milliseconds, 0 when unknown
    pub duration_ms: u64,
    /// Current playback speed/rate
    pub speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            transport: Transport::Stopped,
            title: UNKNOWN_TITLE.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            position_ms: 0,
            duration_ms: 0,
            speed: 1.0,
        }
    }
}

fn or_sentinel(value: &str, sentinel: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        sentinel.to_string()
    } else {
        trimmed.to_string()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration_known(&self) -> bool {
        self.duration_ms > 0
    }

    /// Clamp a position into `[0, duration]`, leaving it alone if duration is unknown
    pub fn clamp_position(&self, position_ms: u64) -> u64 {
        if self.duration_known() {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        }
    }

    /// Apply one engine report.
    ///
    /// Validation happens before any field is touched, so a rejected report
    /// leaves the state exactly as it was.
    pub fn apply(&mut self, report: &EngineReport) -> Result<()> {
        match report {
            EngineReport::State(transport) => {
                self.transport = *transport;
            }
            EngineReport::Metadata {
                title,
                author,
                album,
                duration_ms,
            } => {
                self.title = or_sentinel(title, UNKNOWN_TITLE);
                self.author = or_sentinel(author, UNKNOWN_AUTHOR);
                self.album = or_sentinel(album, UNKNOWN_ALBUM);
                self.set_duration(*duration_ms);
            }
            EngineReport::Position(position_ms) => {
                self.position_ms = self.clamp_position(*position_ms);
            }
            EngineReport::Speed(speed) => {
                if !speed.is_finite() || *speed <= 0.0 {
                    return Err(BridgeError::InvalidReport(format!(
                        "Playback speed must be > 0, got {}",
                        speed
                    )));
                }
                self.speed = *speed;
            }
            EngineReport::Duration(duration_ms) => {
                self.set_duration(*duration_ms);
            }
        }
        Ok(())
    }

    fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        self.position_ms = self.clamp_position(self.position_ms);
    }
}
