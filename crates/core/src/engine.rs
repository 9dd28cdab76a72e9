// Control surface exposed by the native playback engine

use crate::error::Result;

/// Capability interface the playback engine provides to the bridge.
///
/// Calls are fire-and-forget: implementations should queue the command and
/// return quickly. The engine reports the resulting state change back through
/// the bridge's report entry points; the bridge never assumes a call succeeded.
pub trait EngineControl: Send + Sync {
    /// Start or resume playback
    fn play(&self) -> Result<()>;

    /// Pause playback
    fn pause(&self) -> Result<()>;

    /// Stop playback
    fn stop(&self) -> Result<()>;

    /// Skip to the next track
    fn skip_next(&self) -> Result<()>;

    /// Skip to the previous track
    fn skip_previous(&self) -> Result<()>;

    /// Seek to a specific position (in milliseconds)
    fn seek(&self, position_ms: u64) -> Result<()>;
}
