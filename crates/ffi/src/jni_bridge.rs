// JNI bindings: Java host/engine objects and the native entry points

use crate::c_host::{importance_code, mode_code, visibility_code};
use crate::{
    config_from_options, init_logging, register_bridge, release_bridge, to_code, with_bridge,
    MediaBridgeOptions, MEDIABRIDGE_ERROR,
};
use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JString, JValue};
use jni::sys::{jboolean, jfloat, jint, jlong};
use jni::{JNIEnv, JavaVM};
use mediabridge::{
    Bridge, BridgeError, ChannelDescriptor, EngineControl, HostAction, MediaButtonEvent,
    NotificationDescriptor, NotificationHost, Result, SessionConfig, SessionHandle, SessionHost,
    SessionMetadata, SessionPlaybackState, Transport,
};
use std::sync::Arc;

#[cfg(target_os = "android")]
fn jni_error(e: jni::errors::Error) -> BridgeError {
    e.into()
}

#[cfg(not(target_os = "android"))]
fn jni_error(e: jni::errors::Error) -> BridgeError {
    BridgeError::Other(format!("JNI: {}", e))
}

fn jbool(value: bool) -> jboolean {
    u8::from(value)
}

fn jstring_to_string(env: &mut JNIEnv, jstr: &JString) -> Result<String> {
    if jstr.is_null() {
        return Ok(String::new());
    }
    let java_str = env.get_string(jstr).map_err(jni_error)?;
    Ok(java_str.into())
}

fn string_array<'local, 'a>(
    env: &mut JNIEnv<'local>,
    items: impl ExactSizeIterator<Item = &'a str>,
) -> jni::errors::Result<JObjectArray<'local>> {
    let array = env.new_object_array(items.len() as jint, "java/lang/String", JObject::null())?;
    for (i, item) in items.enumerate() {
        let value = env.new_string(item)?;
        env.set_object_array_element(&array, i as jint, &value)?;
        env.delete_local_ref(value)?;
    }
    Ok(array)
}

/// A Java object reachable from any native thread
struct JavaPeer {
    vm: JavaVM,
    object: GlobalRef,
}

impl JavaPeer {
    fn new(env: &mut JNIEnv, object: &JObject) -> Result<Self> {
        let vm = env.get_java_vm().map_err(jni_error)?;
        let object = env.new_global_ref(object).map_err(jni_error)?;
        Ok(Self { vm, object })
    }

    fn call<T>(&self, f: impl FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<T>) -> Result<T> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let result = f(&mut env, self.object.as_obj());
        if result.is_err() && env.exception_check().unwrap_or(false) {
            // A pending Java exception would poison the next call on this thread
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result.map_err(jni_error)
    }
}

/// Session and notification host backed by an `org.mediabridge.MediaBridgeHost`
struct JniHost {
    peer: JavaPeer,
}

impl SessionHost for JniHost {
    fn create_session(&self, config: &SessionConfig) -> Result<SessionHandle> {
        let id = self.peer.call(|env, host| {
            let tag = env.new_string(&config.tag)?;
            env.call_method(
                host,
                "createSession",
                "(Ljava/lang/String;ZZ)J",
                &[
                    JValue::Object(&tag),
                    JValue::Bool(jbool(config.handles_media_buttons)),
                    JValue::Bool(jbool(config.handles_transport_controls)),
                ],
            )?
            .j()
        })?;
        if id < 0 {
            return Err(BridgeError::HostUnavailable(format!(
                "createSession returned {}",
                id
            )));
        }
        Ok(SessionHandle::new(id as u64))
    }

    fn set_metadata(&self, session: &SessionHandle, metadata: &SessionMetadata) -> Result<()> {
        self.peer.call(|env, host| {
            let title = env.new_string(&metadata.title)?;
            let artist = env.new_string(&metadata.artist)?;
            let album = env.new_string(&metadata.album)?;
            env.call_method(
                host,
                "setMetadata",
                "(JLjava/lang/String;Ljava/lang/String;Ljava/lang/String;J)V",
                &[
                    JValue::Long(session.raw() as jlong),
                    JValue::Object(&title),
                    JValue::Object(&artist),
                    JValue::Object(&album),
                    JValue::Long(metadata.duration_ms as jlong),
                ],
            )?
            .v()
        })
    }

    fn set_playback_state(&self, session: &SessionHandle, state: &SessionPlaybackState) -> Result<()> {
        self.peer.call(|env, host| {
            env.call_method(
                host,
                "setPlaybackState",
                "(JIJFJ)V",
                &[
                    JValue::Long(session.raw() as jlong),
                    JValue::Int(mode_code(state.mode)),
                    JValue::Long(state.position_ms as jlong),
                    JValue::Float(state.speed),
                    JValue::Long(state.actions.bits() as jlong),
                ],
            )?
            .v()
        })
    }

    fn set_active(&self, session: &SessionHandle, active: bool) -> Result<()> {
        self.peer.call(|env, host| {
            env.call_method(
                host,
                "setActive",
                "(JZ)V",
                &[JValue::Long(session.raw() as jlong), JValue::Bool(jbool(active))],
            )?
            .v()
        })
    }

    fn dispatch_media_button(&self, session: &SessionHandle, event: &MediaButtonEvent) -> Result<()> {
        self.peer.call(|env, host| {
            env.call_method(
                host,
                "dispatchMediaButton",
                "(JII)V",
                &[
                    JValue::Long(session.raw() as jlong),
                    JValue::Int(event.action),
                    JValue::Int(event.key_code),
                ],
            )?
            .v()
        })
    }

    fn release_session(&self, session: SessionHandle) {
        let result = self.peer.call(|env, host| {
            env.call_method(
                host,
                "releaseSession",
                "(J)V",
                &[JValue::Long(session.raw() as jlong)],
            )?
            .v()
        });
        if let Err(e) = result {
            log::error!("Failed to release session: {}", e);
        }
    }
}

impl NotificationHost for JniHost {
    fn create_channel(&self, channel: &ChannelDescriptor) -> Result<()> {
        self.peer.call(|env, host| {
            let id = env.new_string(&channel.id)?;
            let name = env.new_string(&channel.name)?;
            let description = env.new_string(&channel.description)?;
            env.call_method(
                host,
                "createChannel",
                "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;IZZ)V",
                &[
                    JValue::Object(&id),
                    JValue::Object(&name),
                    JValue::Object(&description),
                    JValue::Int(importance_code(channel.importance)),
                    JValue::Bool(jbool(channel.enable_lights)),
                    JValue::Bool(jbool(channel.enable_vibration)),
                ],
            )?
            .v()
        })
    }

    fn post(&self, notification_id: i32, notification: &NotificationDescriptor) -> Result<()> {
        let n = notification;
        self.peer.call(|env, host| {
            let channel_id = env.new_string(&n.channel_id)?;
            let title = env.new_string(&n.title)?;
            let subtext = env.new_string(&n.subtext)?;
            let content_text = env.new_string(&n.content_text)?;
            let group = env.new_string(&n.group)?;
            let labels = string_array(env, n.actions.iter().map(|a| a.label.as_str()))?;
            let icons = string_array(env, n.actions.iter().map(|a| a.icon.as_str()))?;
            let keys = string_array(env, n.actions.iter().map(|a| a.routing_key.as_str()))?;

            let indices: Vec<jint> = n.compact_actions.iter().map(|&i| i as jint).collect();
            let compact = env.new_int_array(indices.len() as jint)?;
            env.set_int_array_region(&compact, 0, &indices)?;

            env.call_method(
                host,
                "postNotification",
                "(ILjava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;\
                 [Ljava/lang/String;[Ljava/lang/String;[Ljava/lang/String;[IJLjava/lang/String;IZZZ)V",
                &[
                    JValue::Int(notification_id),
                    JValue::Object(&channel_id),
                    JValue::Object(&title),
                    JValue::Object(&subtext),
                    JValue::Object(&content_text),
                    JValue::Object(&labels),
                    JValue::Object(&icons),
                    JValue::Object(&keys),
                    JValue::Object(&compact),
                    JValue::Long(n.session.raw() as jlong),
                    JValue::Object(&group),
                    JValue::Int(visibility_code(n.visibility)),
                    JValue::Bool(jbool(n.auto_cancel)),
                    JValue::Bool(jbool(n.show_when)),
                    JValue::Bool(jbool(n.ongoing)),
                ],
            )?
            .v()
        })
    }

    fn cancel(&self, notification_id: i32) {
        let result = self.peer.call(|env, host| {
            env.call_method(host, "cancelNotification", "(I)V", &[JValue::Int(notification_id)])?
                .v()
        });
        if let Err(e) = result {
            log::error!("Failed to cancel notification {}: {}", notification_id, e);
        }
    }
}

/// Engine backed by an `org.mediabridge.PlaybackEngine`
struct JniEngine {
    peer: JavaPeer,
}

impl JniEngine {
    fn invoke(&self, method: &str) -> Result<()> {
        self.peer
            .call(|env, engine| env.call_method(engine, method, "()V", &[])?.v())
            .map_err(|e| BridgeError::Engine(format!("{}: {}", method, e)))
    }
}

impl EngineControl for JniEngine {
    fn play(&self) -> Result<()> {
        self.invoke("play")
    }

    fn pause(&self) -> Result<()> {
        self.invoke("pause")
    }

    fn stop(&self) -> Result<()> {
        self.invoke("stop")
    }

    fn skip_next(&self) -> Result<()> {
        self.invoke("skipNext")
    }

    fn skip_previous(&self) -> Result<()> {
        self.invoke("skipPrevious")
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        self.peer
            .call(|env, engine| {
                env.call_method(engine, "seek", "(J)V", &[JValue::Long(position_ms as jlong)])?
                    .v()
            })
            .map_err(|e| BridgeError::Engine(format!("seek: {}", e)))
    }
}

fn create_bridge(
    env: &mut JNIEnv,
    host: &JObject,
    engine: &JObject,
    options: &MediaBridgeOptions,
) -> Result<i64> {
    let host = Arc::new(JniHost {
        peer: JavaPeer::new(env, host)?,
    });
    let engine = Arc::new(JniEngine {
        peer: JavaPeer::new(env, engine)?,
    });
    let config = config_from_options(Some(options));
    Ok(register_bridge(Bridge::new(config, host.clone(), host, engine)))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeCreate(
    mut env: JNIEnv,
    _class: JClass,
    host: JObject,
    engine: JObject,
    deactivate_on_stop: jboolean,
    pause_instead_of_stop: jboolean,
) -> jlong {
    init_logging();
    let options = MediaBridgeOptions {
        publish_on_activate: true,
        deactivate_on_stop: deactivate_on_stop != 0,
        pause_instead_of_stop: pause_instead_of_stop != 0,
        notification_id: 0,
    };
    match create_bridge(&mut env, &host, &engine, &options) {
        Ok(id) => id,
        Err(err) => {
            log::error!("Failed to create bridge: {}", err);
            MEDIABRIDGE_ERROR as jlong
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeActivate(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
) -> jint {
    with_bridge(bridge_id, |b| b.activate())
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeDeactivate(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
) -> jint {
    with_bridge(bridge_id, |b| {
        b.deactivate();
        Ok(())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
) -> jint {
    release_bridge(bridge_id)
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeReportState(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    state: jint,
) -> jint {
    with_bridge(bridge_id, |b| b.report_state(Transport::from_code(state)?))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeReportMetadata(
    mut env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    title: JString,
    author: JString,
    album: JString,
    duration_ms: jlong,
) -> jint {
    let strings = (|| -> Result<(String, String, String)> {
        Ok((
            jstring_to_string(&mut env, &title)?,
            jstring_to_string(&mut env, &author)?,
            jstring_to_string(&mut env, &album)?,
        ))
    })();
    match strings {
        Ok((title, author, album)) => with_bridge(bridge_id, |b| {
            b.report_metadata(&title, &author, &album, duration_ms.max(0) as u64)
        }),
        Err(err) => to_code(Err(err)),
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeReportPosition(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    position_ms: jlong,
) -> jint {
    with_bridge(bridge_id, |b| b.report_position(position_ms.max(0) as u64))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeReportSpeed(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    speed: jfloat,
) -> jint {
    with_bridge(bridge_id, |b| b.report_speed(speed))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeReportDuration(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    duration_ms: jlong,
) -> jint {
    with_bridge(bridge_id, |b| b.report_duration(duration_ms.max(0) as u64))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeDispatchAction(
    mut env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    action: JString,
    argument: jlong,
) -> jint {
    match jstring_to_string(&mut env, &action) {
        Ok(action) => with_bridge(bridge_id, |b| b.handle_raw_action(&action, argument)),
        Err(err) => {
            log::error!("Failed to read action: {}", err);
            MEDIABRIDGE_ERROR
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaBridge_nativeDispatchMediaButton(
    _env: JNIEnv,
    _class: JClass,
    bridge_id: jlong,
    action: jint,
    key_code: jint,
) -> jint {
    let event = MediaButtonEvent { action, key_code };
    with_bridge(bridge_id, |b| b.handle_action(HostAction::MediaButton(event)))
}
