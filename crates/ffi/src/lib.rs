// FFI surface for the media session bridge
// C ABI entry points plus JNI entry points for Android hosts.

mod c_host;

#[cfg(feature = "android")]
mod jni_bridge;

pub use c_host::{
    CEngine, CHost, MediaBridgeAction, MediaBridgeEngineVTable, MediaBridgeHostVTable,
    MediaBridgeNotification, MediaBridgeOptions, SESSION_FLAG_MEDIA_BUTTONS,
    SESSION_FLAG_TRANSPORT_CONTROLS,
};

use mediabridge::{Bridge, BridgeConfig, HostAction, MediaButtonEvent, Result, Transport};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

/// Status codes returned across the boundary
pub const MEDIABRIDGE_OK: i32 = 0;
pub const MEDIABRIDGE_ERROR: i32 = -1;
pub const MEDIABRIDGE_INVALID_HANDLE: i32 = -2;

static BRIDGE_REGISTRY: Lazy<Mutex<HashMap<i64, Arc<Bridge>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_BRIDGE_ID: Lazy<Mutex<i64>> = Lazy::new(|| Mutex::new(1));
static INIT_LOGGER: Once = Once::new();

fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("MediaBridge"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            // The embedding app may already own the logger
            let _ = env_logger::builder()
                .is_test(false)
                .filter_level(log::LevelFilter::Info)
                .try_init();
        }
    });
}

fn register_bridge(bridge: Bridge) -> i64 {
    let mut next = NEXT_BRIDGE_ID.lock();
    let id = *next;
    *next += 1;
    drop(next);

    BRIDGE_REGISTRY.lock().insert(id, Arc::new(bridge));
    log::info!("Registered bridge {}", id);
    id
}

fn lookup(id: i64) -> Option<Arc<Bridge>> {
    // Cloned out so host callbacks never run under the registry lock
    BRIDGE_REGISTRY.lock().get(&id).cloned()
}

fn unregister(id: i64) -> Option<Arc<Bridge>> {
    BRIDGE_REGISTRY.lock().remove(&id)
}

fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(_) => MEDIABRIDGE_OK,
        Err(err) => {
            log::error!("FFI error: {}", err);
            MEDIABRIDGE_ERROR
        }
    }
}

/// Run `f` against a registered bridge, mapping the outcome to a status code.
/// Panics are caught here so they never unwind into the host.
fn with_bridge(id: i64, f: impl FnOnce(&Bridge) -> Result<()>) -> i32 {
    let Some(bridge) = lookup(id) else {
        log::warn!("Invalid bridge handle {}", id);
        return MEDIABRIDGE_INVALID_HANDLE;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| f(&bridge))) {
        Ok(result) => to_code(result),
        Err(_) => {
            log::error!("Panic inside bridge {}", id);
            MEDIABRIDGE_ERROR
        }
    }
}

fn config_from_options(options: Option<&MediaBridgeOptions>) -> BridgeConfig {
    let config = BridgeConfig::default();
    match options {
        None => config,
        Some(options) => {
            let config = config
                .with_publish_on_activate(options.publish_on_activate)
                .with_deactivate_on_stop(options.deactivate_on_stop)
                .with_pause_instead_of_stop(options.pause_instead_of_stop);
            if options.notification_id != 0 {
                config.with_notification_id(options.notification_id)
            } else {
                config
            }
        }
    }
}

/// Read a borrowed C string, `None` for null or invalid UTF-8
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn read_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn clamp_ms(value: i64) -> u64 {
    value.max(0) as u64
}

// -------------------------------
// C ABI
// -------------------------------

/// Create a bridge around a C host and engine. `options` may be null.
///
/// # Safety
/// `options` must be null or point to a valid `MediaBridgeOptions`. The
/// vtables' `user_data` must stay valid until `mediabridge_release`.
#[no_mangle]
pub unsafe extern "C" fn mediabridge_create(
    host: MediaBridgeHostVTable,
    engine: MediaBridgeEngineVTable,
    options: *const MediaBridgeOptions,
) -> i64 {
    init_logging();
    let config = config_from_options(options.as_ref());
    let host = Arc::new(CHost::new(host));
    let engine = Arc::new(CEngine::new(engine));
    register_bridge(Bridge::new(config, host.clone(), host, engine))
}

#[no_mangle]
pub extern "C" fn mediabridge_activate(bridge_id: i64) -> i32 {
    with_bridge(bridge_id, |b| b.activate())
}

#[no_mangle]
pub extern "C" fn mediabridge_deactivate(bridge_id: i64) -> i32 {
    with_bridge(bridge_id, |b| {
        b.deactivate();
        Ok(())
    })
}

/// Tear down and forget the handle
#[no_mangle]
pub extern "C" fn mediabridge_release(bridge_id: i64) -> i32 {
    release_bridge(bridge_id)
}

pub(crate) fn release_bridge(bridge_id: i64) -> i32 {
    match unregister(bridge_id) {
        Some(bridge) => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| bridge.deactivate()));
            log::info!("Released bridge {}", bridge_id);
            if result.is_ok() {
                MEDIABRIDGE_OK
            } else {
                MEDIABRIDGE_ERROR
            }
        }
        None => MEDIABRIDGE_INVALID_HANDLE,
    }
}

/// `state`: 0 = playing, 1 = paused, 2 = stopped
#[no_mangle]
pub extern "C" fn mediabridge_report_state(bridge_id: i64, state: i32) -> i32 {
    with_bridge(bridge_id, |b| b.report_state(Transport::from_code(state)?))
}

/// # Safety
/// Each string must be null or NUL-terminated. Null reads as empty.
#[no_mangle]
pub unsafe extern "C" fn mediabridge_report_metadata(
    bridge_id: i64,
    title: *const c_char,
    author: *const c_char,
    album: *const c_char,
    duration_ms: i64,
) -> i32 {
    let title = read_c_str(title).unwrap_or_default();
    let author = read_c_str(author).unwrap_or_default();
    let album = read_c_str(album).unwrap_or_default();
    with_bridge(bridge_id, |b| {
        b.report_metadata(title, author, album, clamp_ms(duration_ms))
    })
}

#[no_mangle]
pub extern "C" fn mediabridge_report_position(bridge_id: i64, position_ms: i64) -> i32 {
    with_bridge(bridge_id, |b| b.report_position(clamp_ms(position_ms)))
}

#[no_mangle]
pub extern "C" fn mediabridge_report_speed(bridge_id: i64, speed: f32) -> i32 {
    with_bridge(bridge_id, |b| b.report_speed(speed))
}

#[no_mangle]
pub extern "C" fn mediabridge_report_duration(bridge_id: i64, duration_ms: i64) -> i32 {
    with_bridge(bridge_id, |b| b.report_duration(clamp_ms(duration_ms)))
}

/// Route a host action string such as `ACTION_PLAY`. `argument` is only read
/// by the seek actions.
///
/// # Safety
/// `action` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn mediabridge_dispatch_action(
    bridge_id: i64,
    action: *const c_char,
    argument: i64,
) -> i32 {
    let Some(action) = read_c_str(action) else {
        log::error!("Action string is null or not UTF-8");
        return MEDIABRIDGE_ERROR;
    };
    with_bridge(bridge_id, |b| b.handle_raw_action(action, argument))
}

#[no_mangle]
pub extern "C" fn mediabridge_dispatch_media_button(
    bridge_id: i64,
    action: i32,
    key_code: i32,
) -> i32 {
    let event = MediaButtonEvent { action, key_code };
    with_bridge(bridge_id, |b| b.handle_action(HostAction::MediaButton(event)))
}

/// Current transport code, or a negative status
#[no_mangle]
pub extern "C" fn mediabridge_get_state(bridge_id: i64) -> i32 {
    match lookup(bridge_id) {
        Some(bridge) => bridge.state().transport.code(),
        None => MEDIABRIDGE_INVALID_HANDLE,
    }
}

#[no_mangle]
pub extern "C" fn mediabridge_get_position(bridge_id: i64) -> i64 {
    match lookup(bridge_id) {
        Some(bridge) => bridge.state().position_ms as i64,
        None => MEDIABRIDGE_INVALID_HANDLE as i64,
    }
}
