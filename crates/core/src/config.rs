// Bridge configuration

use crate::action::ActionSet;
use crate::host::{ChannelDescriptor, Importance, SessionConfig};

/// Fixed notification id, so every post replaces the previous one
pub const DEFAULT_NOTIFICATION_ID: i32 = 0x487671;
pub const DEFAULT_CHANNEL_ID: &str = "mediabridge.mediaNotification";
pub const DEFAULT_SESSION_TAG: &str = "mediabridge.mediasession";

/// Bridge configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub channel: ChannelDescriptor,
    pub notification_id: i32,
    pub notification_group: String,
    /// Indices of the actions shown in the compact notification view
    pub compact_actions: Vec<usize>,
    pub session: SessionConfig,
    pub actions: ActionSet,
    /// Run one sync pass right after activation
    pub publish_on_activate: bool,
    /// Mark the session inactive whenever the engine reports Stopped
    pub deactivate_on_stop: bool,
    /// Route the Stop action to `pause()` on the engine
    pub pause_instead_of_stop: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: ChannelDescriptor {
                id: DEFAULT_CHANNEL_ID.to_string(),
                name: "Media Notification".to_string(),
                description: "Playback controls".to_string(),
                importance: Importance::High,
                enable_lights: false,
                enable_vibration: false,
            },
            notification_id: DEFAULT_NOTIFICATION_ID,
            notification_group: "MediaNotification".to_string(),
            compact_actions: vec![0, 1],
            session: SessionConfig {
                tag: DEFAULT_SESSION_TAG.to_string(),
                handles_media_buttons: true,
                handles_transport_controls: true,
            },
            actions: ActionSet::default(),
            publish_on_activate: true,
            deactivate_on_stop: false,
            pause_instead_of_stop: false,
        }
    }
}

impl BridgeConfig {
    pub fn with_channel(mut self, channel: ChannelDescriptor) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_notification_id(mut self, id: i32) -> Self {
        self.notification_id = id;
        self
    }

    pub fn with_session_tag(mut self, tag: impl Into<String>) -> Self {
        self.session.tag = tag.into();
        self
    }

    pub fn with_actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_publish_on_activate(mut self, enabled: bool) -> Self {
        self.publish_on_activate = enabled;
        self
    }

    pub fn with_deactivate_on_stop(mut self, enabled: bool) -> Self {
        self.deactivate_on_stop = enabled;
        self
    }

    pub fn with_pause_instead_of_stop(mut self, enabled: bool) -> Self {
        self.pause_instead_of_stop = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.notification_id, DEFAULT_NOTIFICATION_ID);
        assert_eq!(config.channel.id, DEFAULT_CHANNEL_ID);
        assert_eq!(config.compact_actions, vec![0, 1]);
        assert!(config.publish_on_activate);
        assert!(!config.deactivate_on_stop);
        assert!(!config.pause_instead_of_stop);
        assert!(!config.channel.enable_vibration);
    }

    #[test]
    fn test_builders() {
        let config = BridgeConfig::default()
            .with_notification_id(7)
            .with_session_tag("org.example.player")
            .with_deactivate_on_stop(true)
            .with_pause_instead_of_stop(true)
            .with_publish_on_activate(false);
        assert_eq!(config.notification_id, 7);
        assert_eq!(config.session.tag, "org.example.player");
        assert!(config.deactivate_on_stop);
        assert!(config.pause_instead_of_stop);
        assert!(!config.publish_on_activate);
    }
}
