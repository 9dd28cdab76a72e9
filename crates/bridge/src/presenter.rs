// Persistent media notification built from PlaybackState

use mediabridge_core::{
    ActionSet, BridgeConfig, ChannelDescriptor, NotificationDescriptor, NotificationHost,
    PlaybackState, SessionHandle, Visibility,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Derive the notification for a snapshot.
///
/// Pure: the same inputs always produce an equal descriptor. Playing shows
/// {Pause, Next}, every other transport shows {Play, Next}.
pub fn build_notification(
    state: &PlaybackState,
    actions: &ActionSet,
    config: &BridgeConfig,
    session: &SessionHandle,
) -> NotificationDescriptor {
    let primary = if state.transport.is_playing() {
        actions.pause.clone()
    } else {
        actions.play.clone()
    };

    NotificationDescriptor {
        channel_id: config.channel.id.clone(),
        title: state.title.clone(),
        subtext: state.author.clone(),
        content_text: state.album.clone(),
        actions: vec![primary, actions.next.clone()],
        compact_actions: config.compact_actions.clone(),
        session: session.clone(),
        group: config.notification_group.clone(),
        visibility: Visibility::Public,
        auto_cancel: false,
        show_when: false,
        ongoing: state.transport.is_playing(),
    }
}

#[derive(Default)]
struct PresenterState {
    channel_ready: bool,
    posted: bool,
}

/// Owns the notification channel and the single persistent notification
pub struct NotificationPresenter {
    host: Arc<dyn NotificationHost>,
    config: BridgeConfig,
    state: Mutex<PresenterState>,
}

impl NotificationPresenter {
    pub fn new(host: Arc<dyn NotificationHost>, config: BridgeConfig) -> Self {
        Self {
            host,
            config,
            state: Mutex::new(PresenterState::default()),
        }
    }

    pub fn channel(&self) -> &ChannelDescriptor {
        &self.config.channel
    }

    pub fn notification_id(&self) -> i32 {
        self.config.notification_id
    }

    pub fn is_posted(&self) -> bool {
        self.state.lock().posted
    }

    /// Rebuild the notification and post it under the fixed id.
    ///
    /// The channel is created lazily before the first post. If the host
    /// refuses either call nothing is cached, so the next refresh retries.
    pub fn refresh(&self, state: &PlaybackState, session: &SessionHandle) {
        // Bookkeeping lock is never held across a host call
        let channel_ready = self.state.lock().channel_ready;
        if !channel_ready {
            match self.host.create_channel(&self.config.channel) {
                Ok(()) => {
                    log::info!("Notification channel ready: {}", self.config.channel.id);
                    self.state.lock().channel_ready = true;
                }
                Err(e) => {
                    log::warn!("Notification channel unavailable, skipping refresh: {}", e);
                    return;
                }
            }
        }

        let notification = build_notification(state, &self.config.actions, &self.config, session);
        match self.host.post(self.config.notification_id, &notification) {
            Ok(()) => {
                log::debug!(
                    "Notification posted: {:?} '{}'",
                    state.transport,
                    notification.title
                );
                self.state.lock().posted = true;
            }
            Err(e) => log::error!("Failed to post notification: {}", e),
        }
    }

    /// Remove the notification. No-op if nothing was posted.
    pub fn cancel(&self) {
        let was_posted = std::mem::replace(&mut self.state.lock().posted, false);
        if was_posted {
            self.host.cancel(self.config.notification_id);
            log::info!("Notification {:#x} cancelled", self.config.notification_id);
        }
    }
}
