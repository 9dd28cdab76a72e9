// Mirrors PlaybackState onto the host media session

use mediabridge_core::{
    PlaybackState, SessionActions, SessionHandle, SessionHost, SessionMetadata,
    SessionPlaybackState, Transport,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Session metadata derived from a state snapshot
pub fn session_metadata(state: &PlaybackState) -> SessionMetadata {
    SessionMetadata {
        title: state.title.clone(),
        artist: state.author.clone(),
        album: state.album.clone(),
        duration_ms: state.duration_ms,
    }
}

/// Session playback triple derived from a state snapshot
pub fn session_playback_state(state: &PlaybackState) -> SessionPlaybackState {
    SessionPlaybackState {
        mode: state.transport.into(),
        position_ms: state.position_ms,
        speed: state.speed,
        actions: SessionActions::for_transport(state.transport),
    }
}

/// The bridge's view of the host media session.
///
/// Only the bridge's sync pass calls into the mirror, so the host never sees
/// two syncs at once. The session handle itself is owned by the bridge.
pub struct SessionMirror {
    host: Arc<dyn SessionHost>,
    deactivate_on_stop: bool,
    active: Mutex<bool>,
}

impl SessionMirror {
    pub fn new(host: Arc<dyn SessionHost>, deactivate_on_stop: bool) -> Self {
        Self {
            host,
            deactivate_on_stop,
            active: Mutex::new(false),
        }
    }

    /// Whether the session is currently marked active on the host
    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }

    /// Push one snapshot to the session: metadata, then playback state, then
    /// the active flag.
    ///
    /// Host failures are logged and absorbed; the next sync pushes the whole
    /// snapshot again.
    pub fn sync(&self, state: &PlaybackState, session: Option<&SessionHandle>) {
        let Some(session) = session else {
            log::warn!("Session not available, skipping sync of {:?}", state.transport);
            return;
        };

        if let Err(e) = self.host.set_metadata(session, &session_metadata(state)) {
            log::error!("Failed to set session metadata: {}", e);
        }

        if let Err(e) = self
            .host
            .set_playback_state(session, &session_playback_state(state))
        {
            log::error!("Failed to set session playback state: {}", e);
        }

        let was_active = self.is_active();
        let want_active = match state.transport {
            Transport::Playing => true,
            Transport::Stopped if self.deactivate_on_stop => false,
            Transport::Paused | Transport::Stopped => was_active,
        };

        if want_active || was_active {
            match self.host.set_active(session, want_active) {
                Ok(()) => {
                    if was_active != want_active {
                        log::info!("Session active: {}", want_active);
                    }
                    *self.active.lock() = want_active;
                }
                Err(e) => log::error!("Failed to set session active={}: {}", want_active, e),
            }
        }
    }

    /// Mark the session inactive ahead of releasing it
    pub fn deactivate(&self, session: &SessionHandle) {
        let was_active = std::mem::replace(&mut *self.active.lock(), false);
        if was_active {
            if let Err(e) = self.host.set_active(session, false) {
                log::warn!("Failed to deactivate session: {}", e);
            }
        }
    }
}
