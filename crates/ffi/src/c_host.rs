// C vtables for the host surfaces and the playback engine

use mediabridge::{
    BridgeError, ChannelDescriptor, EngineControl, HostPlaybackMode, Importance,
    MediaButtonEvent, NotificationDescriptor, NotificationHost, Result, SessionConfig,
    SessionHandle, SessionHost, SessionMetadata, SessionPlaybackState, Visibility,
};
use std::ffi::CString;
use std::os::raw::{c_char, c_void};

pub const SESSION_FLAG_MEDIA_BUTTONS: u32 = 1 << 0;
pub const SESSION_FLAG_TRANSPORT_CONTROLS: u32 = 1 << 1;

/// One notification action as seen by C
#[repr(C)]
pub struct MediaBridgeAction {
    pub label: *const c_char,
    pub icon: *const c_char,
    pub routing_key: *const c_char,
}

/// Notification passed to `post_notification`. Pointers are only valid for
/// the duration of the call.
#[repr(C)]
pub struct MediaBridgeNotification {
    pub channel_id: *const c_char,
    pub title: *const c_char,
    pub subtext: *const c_char,
    pub content_text: *const c_char,
    pub actions: *const MediaBridgeAction,
    pub action_count: usize,
    pub compact_actions: *const u32,
    pub compact_count: usize,
    pub session: i64,
    pub group: *const c_char,
    /// 0 = private, 1 = public, 2 = secret
    pub visibility: i32,
    pub auto_cancel: bool,
    pub show_when: bool,
    pub ongoing: bool,
}

/// Host session and notification callbacks.
///
/// Every callback returning `i32` signals success with `0`. `create_session`
/// returns a non-negative session id, or a negative value if the session
/// service is not available yet.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MediaBridgeHostVTable {
    pub user_data: *mut c_void,
    pub create_session: extern "C" fn(*mut c_void, *const c_char, u32) -> i64,
    pub set_metadata:
        extern "C" fn(*mut c_void, i64, *const c_char, *const c_char, *const c_char, i64) -> i32,
    /// mode: 0 = playing, 1 = paused, 2 = stopped
    pub set_playback_state: extern "C" fn(*mut c_void, i64, i32, i64, f32, u32) -> i32,
    pub set_active: extern "C" fn(*mut c_void, i64, bool) -> i32,
    pub dispatch_media_button: extern "C" fn(*mut c_void, i64, i32, i32) -> i32,
    pub release_session: extern "C" fn(*mut c_void, i64),
    /// importance: 0 = low, 1 = default, 2 = high
    pub create_channel:
        extern "C" fn(*mut c_void, *const c_char, *const c_char, *const c_char, i32, bool, bool) -> i32,
    pub post_notification: extern "C" fn(*mut c_void, i32, *const MediaBridgeNotification) -> i32,
    pub cancel_notification: extern "C" fn(*mut c_void, i32),
}

/// Playback engine callbacks, all returning `0` on success
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MediaBridgeEngineVTable {
    pub user_data: *mut c_void,
    pub play: extern "C" fn(*mut c_void) -> i32,
    pub pause: extern "C" fn(*mut c_void) -> i32,
    pub stop: extern "C" fn(*mut c_void) -> i32,
    pub skip_next: extern "C" fn(*mut c_void) -> i32,
    pub skip_previous: extern "C" fn(*mut c_void) -> i32,
    pub seek: extern "C" fn(*mut c_void, i64) -> i32,
}

/// Bridge options passed at creation
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MediaBridgeOptions {
    pub publish_on_activate: bool,
    pub deactivate_on_stop: bool,
    pub pause_instead_of_stop: bool,
    /// 0 keeps the default notification id
    pub notification_id: i32,
}

fn c_string(s: &str) -> CString {
    // Interior NULs cannot cross the boundary
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

fn check(code: i32, what: &str) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(BridgeError::HostUnavailable(format!("{} failed with code {}", what, code)))
    }
}

pub(crate) fn mode_code(mode: HostPlaybackMode) -> i32 {
    match mode {
        HostPlaybackMode::Playing => 0,
        HostPlaybackMode::Paused => 1,
        HostPlaybackMode::Stopped => 2,
    }
}

pub(crate) fn importance_code(importance: Importance) -> i32 {
    match importance {
        Importance::Low => 0,
        Importance::Default => 1,
        Importance::High => 2,
    }
}

pub(crate) fn visibility_code(visibility: Visibility) -> i32 {
    match visibility {
        Visibility::Private => 0,
        Visibility::Public => 1,
        Visibility::Secret => 2,
    }
}

/// Host implemented in C
pub struct CHost {
    vtable: MediaBridgeHostVTable,
}

// The C side promises its callbacks and user_data may be used from any thread.
unsafe impl Send for CHost {}
unsafe impl Sync for CHost {}

impl CHost {
    pub fn new(vtable: MediaBridgeHostVTable) -> Self {
        Self { vtable }
    }

    fn session_id(session: &SessionHandle) -> i64 {
        session.raw() as i64
    }
}

impl SessionHost for CHost {
    fn create_session(&self, config: &SessionConfig) -> Result<SessionHandle> {
        let tag = c_string(&config.tag);
        let mut flags = 0;
        if config.handles_media_buttons {
            flags |= SESSION_FLAG_MEDIA_BUTTONS;
        }
        if config.handles_transport_controls {
            flags |= SESSION_FLAG_TRANSPORT_CONTROLS;
        }
        let id = (self.vtable.create_session)(self.vtable.user_data, tag.as_ptr(), flags);
        if id < 0 {
            return Err(BridgeError::HostUnavailable(format!(
                "create_session returned {}",
                id
            )));
        }
        Ok(SessionHandle::new(id as u64))
    }

    fn set_metadata(&self, session: &SessionHandle, metadata: &SessionMetadata) -> Result<()> {
        let title = c_string(&metadata.title);
        let artist = c_string(&metadata.artist);
        let album = c_string(&metadata.album);
        let code = (self.vtable.set_metadata)(
            self.vtable.user_data,
            Self::session_id(session),
            title.as_ptr(),
            artist.as_ptr(),
            album.as_ptr(),
            metadata.duration_ms as i64,
        );
        check(code, "set_metadata")
    }

    fn set_playback_state(&self, session: &SessionHandle, state: &SessionPlaybackState) -> Result<()> {
        let code = (self.vtable.set_playback_state)(
            self.vtable.user_data,
            Self::session_id(session),
            mode_code(state.mode),
            state.position_ms as i64,
            state.speed,
            state.actions.bits(),
        );
        check(code, "set_playback_state")
    }

    fn set_active(&self, session: &SessionHandle, active: bool) -> Result<()> {
        let code = (self.vtable.set_active)(self.vtable.user_data, Self::session_id(session), active);
        check(code, "set_active")
    }

    fn dispatch_media_button(&self, session: &SessionHandle, event: &MediaButtonEvent) -> Result<()> {
        let code = (self.vtable.dispatch_media_button)(
            self.vtable.user_data,
            Self::session_id(session),
            event.action,
            event.key_code,
        );
        check(code, "dispatch_media_button")
    }

    fn release_session(&self, session: SessionHandle) {
        (self.vtable.release_session)(self.vtable.user_data, Self::session_id(&session));
    }
}

impl NotificationHost for CHost {
    fn create_channel(&self, channel: &ChannelDescriptor) -> Result<()> {
        let id = c_string(&channel.id);
        let name = c_string(&channel.name);
        let description = c_string(&channel.description);
        let code = (self.vtable.create_channel)(
            self.vtable.user_data,
            id.as_ptr(),
            name.as_ptr(),
            description.as_ptr(),
            importance_code(channel.importance),
            channel.enable_lights,
            channel.enable_vibration,
        );
        check(code, "create_channel")
    }

    fn post(&self, notification_id: i32, notification: &NotificationDescriptor) -> Result<()> {
        let channel_id = c_string(&notification.channel_id);
        let title = c_string(&notification.title);
        let subtext = c_string(&notification.subtext);
        let content_text = c_string(&notification.content_text);
        let group = c_string(&notification.group);

        // Keep the CStrings alive until the callback returns
        let strings: Vec<(CString, CString, CString)> = notification
            .actions
            .iter()
            .map(|a| {
                (
                    c_string(&a.label),
                    c_string(&a.icon),
                    c_string(a.routing_key.as_str()),
                )
            })
            .collect();
        let actions: Vec<MediaBridgeAction> = strings
            .iter()
            .map(|(label, icon, key)| MediaBridgeAction {
                label: label.as_ptr(),
                icon: icon.as_ptr(),
                routing_key: key.as_ptr(),
            })
            .collect();
        let compact: Vec<u32> = notification.compact_actions.iter().map(|&i| i as u32).collect();

        let raw = MediaBridgeNotification {
            channel_id: channel_id.as_ptr(),
            title: title.as_ptr(),
            subtext: subtext.as_ptr(),
            content_text: content_text.as_ptr(),
            actions: actions.as_ptr(),
            action_count: actions.len(),
            compact_actions: compact.as_ptr(),
            compact_count: compact.len(),
            session: Self::session_id(&notification.session),
            group: group.as_ptr(),
            visibility: visibility_code(notification.visibility),
            auto_cancel: notification.auto_cancel,
            show_when: notification.show_when,
            ongoing: notification.ongoing,
        };
        let code = (self.vtable.post_notification)(self.vtable.user_data, notification_id, &raw);
        check(code, "post_notification")
    }

    fn cancel(&self, notification_id: i32) {
        (self.vtable.cancel_notification)(self.vtable.user_data, notification_id);
    }
}

/// Playback engine implemented in C
pub struct CEngine {
    vtable: MediaBridgeEngineVTable,
}

unsafe impl Send for CEngine {}
unsafe impl Sync for CEngine {}

impl CEngine {
    pub fn new(vtable: MediaBridgeEngineVTable) -> Self {
        Self { vtable }
    }

    fn call(&self, code: i32, what: &str) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(BridgeError::Engine(format!("{} failed with code {}", what, code)))
        }
    }
}

impl EngineControl for CEngine {
    fn play(&self) -> Result<()> {
        self.call((self.vtable.play)(self.vtable.user_data), "play")
    }

    fn pause(&self) -> Result<()> {
        self.call((self.vtable.pause)(self.vtable.user_data), "pause")
    }

    fn stop(&self) -> Result<()> {
        self.call((self.vtable.stop)(self.vtable.user_data), "stop")
    }

    fn skip_next(&self) -> Result<()> {
        self.call((self.vtable.skip_next)(self.vtable.user_data), "skip_next")
    }

    fn skip_previous(&self) -> Result<()> {
        self.call((self.vtable.skip_previous)(self.vtable.user_data), "skip_previous")
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        self.call(
            (self.vtable.seek)(self.vtable.user_data, position_ms as i64),
            "seek",
        )
    }
}
