// Host OS surfaces: the media session and the notification manager

use crate::action::{ActionDescriptor, MediaButtonEvent};
use crate::error::Result;
use crate::state::Transport;

/// Opaque handle to a host media session.
///
/// Created by [`SessionHost::create_session`] and owned by the bridge, which
/// releases it exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Playback mode reported to the host session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlaybackMode {
    Playing,
    Paused,
    Stopped,
}

impl From<Transport> for HostPlaybackMode {
    fn from(transport: Transport) -> Self {
        match transport {
            Transport::Playing => HostPlaybackMode::Playing,
            Transport::Paused => HostPlaybackMode::Paused,
            Transport::Stopped => HostPlaybackMode::Stopped,
        }
    }
}

/// Mask of transport actions the session advertises to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionActions(u32);

impl SessionActions {
    pub const STOP: SessionActions = SessionActions(1 << 0);
    pub const PAUSE: SessionActions = SessionActions(1 << 1);
    pub const PLAY: SessionActions = SessionActions(1 << 2);
    pub const SKIP_TO_PREVIOUS: SessionActions = SessionActions(1 << 4);
    pub const SKIP_TO_NEXT: SessionActions = SessionActions(1 << 5);
    pub const SEEK_TO: SessionActions = SessionActions(1 << 8);
    pub const PLAY_PAUSE: SessionActions = SessionActions(1 << 9);

    pub const fn empty() -> Self {
        SessionActions(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: SessionActions) -> Self {
        SessionActions(self.0 | other.0)
    }

    pub const fn contains(self, other: SessionActions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Actions available in a given transport mode
    pub fn for_transport(transport: Transport) -> Self {
        let base = SessionActions::SKIP_TO_NEXT
            .union(SessionActions::SKIP_TO_PREVIOUS)
            .union(SessionActions::SEEK_TO)
            .union(SessionActions::PLAY_PAUSE);
        match transport {
            Transport::Playing => base.union(SessionActions::PAUSE).union(SessionActions::STOP),
            Transport::Paused => base.union(SessionActions::PLAY).union(SessionActions::STOP),
            Transport::Stopped => base.union(SessionActions::PLAY),
        }
    }
}

/// Metadata keys published on the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
}

/// Playback triple plus the advertised action mask
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlaybackState {
    pub mode: HostPlaybackMode,
    pub position_ms: u64,
    pub speed: f32,
    pub actions: SessionActions,
}

/// Parameters used when the host session is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub tag: String,
    pub handles_media_buttons: bool,
    pub handles_transport_controls: bool,
}

/// Host media session service.
///
/// Implementations are responsible for hopping onto whatever thread the host
/// API requires; the bridge may call from any thread but never concurrently.
pub trait SessionHost: Send + Sync {
    fn create_session(&self, config: &SessionConfig) -> Result<SessionHandle>;

    fn set_metadata(&self, session: &SessionHandle, metadata: &SessionMetadata) -> Result<()>;

    fn set_playback_state(&self, session: &SessionHandle, state: &SessionPlaybackState) -> Result<()>;

    fn set_active(&self, session: &SessionHandle, active: bool) -> Result<()>;

    /// Hand a raw media button event to the session's own dispatcher
    fn dispatch_media_button(&self, session: &SessionHandle, event: &MediaButtonEvent) -> Result<()>;

    fn release_session(&self, session: SessionHandle);
}

/// Notification channel importance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
    Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub enable_lights: bool,
    pub enable_vibration: bool,
}

/// Fully derived notification, rebuilt on every refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDescriptor {
    pub channel_id: String,
    pub title: String,
    pub subtext: String,
    pub content_text: String,
    pub actions: Vec<ActionDescriptor>,
    /// Indices into `actions` shown in the compact view
    pub compact_actions: Vec<usize>,
    pub session: SessionHandle,
    pub group: String,
    pub visibility: Visibility,
    pub auto_cancel: bool,
    pub show_when: bool,
    pub ongoing: bool,
}

/// Host notification service
pub trait NotificationHost: Send + Sync {
    /// Create the channel. Creating an existing channel must be a no-op.
    fn create_channel(&self, channel: &ChannelDescriptor) -> Result<()>;

    /// Post or replace the notification with the given id
    fn post(&self, notification_id: i32, notification: &NotificationDescriptor) -> Result<()>;

    fn cancel(&self, notification_id: i32);
}
