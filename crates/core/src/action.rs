// Routing keys and action descriptors for host-initiated transport actions

use crate::error::{BridgeError, Result};
use std::fmt;
use std::str::FromStr;

/// Normalized identifier for a user transport action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKey {
    Play,
    Pause,
    /// Toggle, resolved against the current transport
    PlayPause,
    Stop,
    Next,
    Previous,
    /// Absolute seek target in milliseconds
    Seek(u64),
    /// Relative seek offset in milliseconds
    SeekBy(i64),
}

impl RoutingKey {
    /// Action string broadcast by the host for this key
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingKey::Play => "ACTION_PLAY",
            RoutingKey::Pause => "ACTION_PAUSE",
            RoutingKey::PlayPause => "ACTION_PLAY_PAUSE",
            RoutingKey::Stop => "ACTION_STOP",
            RoutingKey::Next => "ACTION_NEXT",
            RoutingKey::Previous => "ACTION_PREVIOUS",
            RoutingKey::Seek(_) => "ACTION_SEEK",
            RoutingKey::SeekBy(_) => "ACTION_SEEK_BY",
        }
    }

    /// Parse a host action string together with its numeric argument.
    ///
    /// The argument is only read by the seek keys. A negative absolute seek
    /// target is rejected.
    pub fn parse_with_argument(action: &str, argument: i64) -> Result<Self> {
        match action {
            "ACTION_SEEK" => {
                if argument < 0 {
                    return Err(BridgeError::UnknownAction(format!(
                        "ACTION_SEEK with negative position {}",
                        argument
                    )));
                }
                Ok(RoutingKey::Seek(argument as u64))
            }
            "ACTION_SEEK_BY" => Ok(RoutingKey::SeekBy(argument)),
            other => other.parse(),
        }
    }
}

impl FromStr for RoutingKey {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACTION_PLAY" => Ok(RoutingKey::Play),
            "ACTION_PAUSE" => Ok(RoutingKey::Pause),
            "ACTION_PLAY_PAUSE" => Ok(RoutingKey::PlayPause),
            "ACTION_STOP" => Ok(RoutingKey::Stop),
            "ACTION_NEXT" => Ok(RoutingKey::Next),
            "ACTION_PREVIOUS" => Ok(RoutingKey::Previous),
            other => Err(BridgeError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RoutingKey::Seek(pos) => write!(f, "{}({})", self.as_str(), pos),
            RoutingKey::SeekBy(offset) => write!(f, "{}({:+})", self.as_str(), offset),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Raw media button event as delivered by the host.
///
/// Never interpreted by the bridge; it is handed back to the host session's
/// own dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaButtonEvent {
    pub action: i32,
    pub key_code: i32,
}

/// Single action-dispatch event coming from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Route(RoutingKey),
    MediaButton(MediaButtonEvent),
}

impl From<RoutingKey> for HostAction {
    fn from(key: RoutingKey) -> Self {
        HostAction::Route(key)
    }
}

/// Notification action button, bound to a routing key rather than an engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub label: String,
    /// Host-side icon resource name
    pub icon: String,
    pub routing_key: RoutingKey,
}

impl ActionDescriptor {
    pub fn new(label: impl Into<String>, icon: impl Into<String>, routing_key: RoutingKey) -> Self {
        Self {
            label: label.into(),
            icon: icon.into(),
            routing_key,
        }
    }
}

/// The fixed set of notification actions, built once per bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    pub play: ActionDescriptor,
    pub pause: ActionDescriptor,
    pub next: ActionDescriptor,
    pub previous: ActionDescriptor,
}

impl Default for ActionSet {
    fn default() -> Self {
        Self {
            play: ActionDescriptor::new("Play", "ic_play_white", RoutingKey::Play),
            pause: ActionDescriptor::new("Pause", "ic_pause_white", RoutingKey::Pause),
            next: ActionDescriptor::new("Next", "ic_next_white", RoutingKey::Next),
            previous: ActionDescriptor::new("Previous", "ic_previous_white", RoutingKey::Previous),
        }
    }
}
