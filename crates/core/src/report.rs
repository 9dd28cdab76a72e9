// Reports sent by the native playback engine

use crate::state::Transport;

/// One inbound report from the playback engine.
///
/// Every report triggers exactly one sync pass once it has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReport {
    /// Transport mode changed
    State(Transport),

    /// Track metadata changed
    Metadata {
        title: String,
        author: String,
        album: String,
        duration_ms: u64,
    },

    /// Playback position updated
    Position(u64),

    /// Playback speed changed
    Speed(f32),

    /// Duration became known or changed
    Duration(u64),
}

impl EngineReport {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            EngineReport::State(_) => "state",
            EngineReport::Metadata { .. } => "metadata",
            EngineReport::Position(_) => "position",
            EngineReport::Speed(_) => "speed",
            EngineReport::Duration(_) => "duration",
        }
    }
}
