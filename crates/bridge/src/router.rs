// Routes host actions to the playback engine

use mediabridge_core::{
    BridgeError, EngineControl, HostAction, PlaybackState, Result, RoutingKey, SessionHandle,
    SessionHost, Transport,
};
use std::sync::Arc;

/// Exactly one call on the engine's control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Play,
    Pause,
    Stop,
    SkipNext,
    SkipPrevious,
    Seek(u64),
}

/// Turns routing keys into engine calls.
///
/// The router reads a state snapshot to resolve toggles and relative seeks
/// but never writes to it: the engine reports the outcome through the normal
/// report path.
pub struct ActionRouter {
    engine: Arc<dyn EngineControl>,
    sessions: Arc<dyn SessionHost>,
    pause_instead_of_stop: bool,
}

impl ActionRouter {
    pub fn new(
        engine: Arc<dyn EngineControl>,
        sessions: Arc<dyn SessionHost>,
        pause_instead_of_stop: bool,
    ) -> Self {
        Self {
            engine,
            sessions,
            pause_instead_of_stop,
        }
    }

    /// Normalize a routing key against the current snapshot
    pub fn resolve(&self, key: RoutingKey, state: &PlaybackState) -> EngineCommand {
        match key {
            RoutingKey::Play => EngineCommand::Play,
            RoutingKey::Pause => EngineCommand::Pause,
            RoutingKey::PlayPause => match state.transport {
                Transport::Playing => EngineCommand::Pause,
                Transport::Paused | Transport::Stopped => EngineCommand::Play,
            },
            RoutingKey::Stop if self.pause_instead_of_stop => EngineCommand::Pause,
            RoutingKey::Stop => EngineCommand::Stop,
            RoutingKey::Next => EngineCommand::SkipNext,
            RoutingKey::Previous => EngineCommand::SkipPrevious,
            RoutingKey::Seek(position_ms) => EngineCommand::Seek(state.clamp_position(position_ms)),
            RoutingKey::SeekBy(offset_ms) => {
                let target = if offset_ms < 0 {
                    state.position_ms.saturating_sub(offset_ms.unsigned_abs())
                } else {
                    state.position_ms.saturating_add(offset_ms as u64)
                };
                EngineCommand::Seek(state.clamp_position(target))
            }
        }
    }

    /// Handle one host action.
    ///
    /// Routing keys become one engine call; raw media button events go back to
    /// the host session untouched.
    pub fn handle(
        &self,
        action: HostAction,
        state: &PlaybackState,
        session: Option<&SessionHandle>,
    ) -> Result<()> {
        match action {
            HostAction::Route(key) => {
                let command = self.resolve(key, state);
                log::info!("Routing {} -> {:?}", key, command);
                self.dispatch(command)
            }
            HostAction::MediaButton(event) => {
                let session = session.ok_or_else(|| {
                    BridgeError::HostUnavailable("No session to dispatch media button".into())
                })?;
                log::debug!("Forwarding media button {:?} to session", event);
                self.sessions.dispatch_media_button(session, &event)
            }
        }
    }

    /// Parse a host action string and route it.
    ///
    /// Unknown strings are logged and ignored without touching the engine.
    pub fn handle_raw(
        &self,
        action: &str,
        argument: i64,
        state: &PlaybackState,
        session: Option<&SessionHandle>,
    ) -> Result<()> {
        let key = RoutingKey::parse_with_argument(action, argument).map_err(|e| {
            log::warn!("Ignoring host action: {}", e);
            e
        })?;
        self.handle(HostAction::Route(key), state, session)
    }

    fn dispatch(&self, command: EngineCommand) -> Result<()> {
        let result = match command {
            EngineCommand::Play => self.engine.play(),
            EngineCommand::Pause => self.engine.pause(),
            EngineCommand::Stop => self.engine.stop(),
            EngineCommand::SkipNext => self.engine.skip_next(),
            EngineCommand::SkipPrevious => self.engine.skip_previous(),
            EngineCommand::Seek(position_ms) => self.engine.seek(position_ms),
        };
        if let Err(e) = &result {
            log::error!("Engine rejected {:?}: {}", command, e);
        }
        result
    }
}
