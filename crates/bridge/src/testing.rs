// Recording host and engine doubles for tests

use crate::router::EngineCommand;
use mediabridge_core::{
    BridgeError, ChannelDescriptor, EngineControl, MediaButtonEvent, NotificationDescriptor,
    NotificationHost, Result, SessionConfig, SessionHandle, SessionHost, SessionMetadata,
    SessionPlaybackState,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateSession(SessionConfig),
    SetMetadata(SessionMetadata),
    SetPlaybackState(SessionPlaybackState),
    SetActive(bool),
    DispatchMediaButton(MediaButtonEvent),
    ReleaseSession(SessionHandle),
    CreateChannel(ChannelDescriptor),
    Post(i32, NotificationDescriptor),
    Cancel(i32),
}

impl HostCall {
    fn is_session_call(&self) -> bool {
        matches!(
            self,
            HostCall::CreateSession(_)
                | HostCall::SetMetadata(_)
                | HostCall::SetPlaybackState(_)
                | HostCall::SetActive(_)
                | HostCall::DispatchMediaButton(_)
                | HostCall::ReleaseSession(_)
        )
    }
}

/// Pauses the first metadata update until the test releases it
pub struct Gate {
    entered: Barrier,
    release: Barrier,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }

    /// Block until a sync pass is parked inside the host
    pub fn wait_entered(&self) {
        self.entered.wait();
    }

    pub fn release(&self) {
        self.release.wait();
    }
}

/// Session and notification host that records every call in order
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    next_session: AtomicU64,
    fail_session: AtomicBool,
    fail_metadata: AtomicBool,
    fail_channel: AtomicBool,
    panic_metadata: AtomicBool,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_session: AtomicU64::new(1),
            fail_session: AtomicBool::new(false),
            fail_metadata: AtomicBool::new(false),
            fail_channel: AtomicBool::new(false),
            panic_metadata: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub fn fail_session(&self, fail: bool) {
        self.fail_session.store(fail, Ordering::SeqCst);
    }

    pub fn fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn fail_channel(&self, fail: bool) {
        self.fail_channel.store(fail, Ordering::SeqCst);
    }

    /// Panic inside the next metadata update only
    pub fn panic_once_on_metadata(&self) {
        self.panic_metadata.store(true, Ordering::SeqCst);
    }

    pub fn arm_gate(&self, gate: Arc<Gate>) {
        *self.gate.lock() = Some(gate);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn session_calls(&self) -> Vec<HostCall> {
        self.calls().into_iter().filter(HostCall::is_session_call).collect()
    }

    pub fn notification_calls(&self) -> Vec<HostCall> {
        self.calls().into_iter().filter(|c| !c.is_session_call()).collect()
    }

    pub fn last_metadata(&self) -> Option<SessionMetadata> {
        self.calls().into_iter().rev().find_map(|c| match c {
            HostCall::SetMetadata(m) => Some(m),
            _ => None,
        })
    }

    pub fn playback_states(&self) -> Vec<SessionPlaybackState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::SetPlaybackState(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn last_playback_state(&self) -> Option<SessionPlaybackState> {
        self.playback_states().pop()
    }

    pub fn posts(&self) -> Vec<(i32, NotificationDescriptor)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Post(id, n) => Some((id, n)),
                _ => None,
            })
            .collect()
    }

    pub fn last_post(&self) -> Option<NotificationDescriptor> {
        self.posts().pop().map(|(_, n)| n)
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn channel_creations(&self) -> usize {
        self.count(|c| matches!(c, HostCall::CreateChannel(_)))
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

impl SessionHost for RecordingHost {
    fn create_session(&self, config: &SessionConfig) -> Result<SessionHandle> {
        self.record(HostCall::CreateSession(config.clone()));
        if self.fail_session.load(Ordering::SeqCst) {
            return Err(BridgeError::HostUnavailable("session service not ready".into()));
        }
        Ok(SessionHandle::new(self.next_session.fetch_add(1, Ordering::SeqCst)))
    }

    fn set_metadata(&self, _session: &SessionHandle, metadata: &SessionMetadata) -> Result<()> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.wait();
            gate.release.wait();
        }
        if self.panic_metadata.swap(false, Ordering::SeqCst) {
            panic!("session host crashed");
        }
        self.record(HostCall::SetMetadata(metadata.clone()));
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(BridgeError::HostUnavailable("metadata rejected".into()));
        }
        Ok(())
    }

    fn set_playback_state(&self, _session: &SessionHandle, state: &SessionPlaybackState) -> Result<()> {
        self.record(HostCall::SetPlaybackState(state.clone()));
        Ok(())
    }

    fn set_active(&self, _session: &SessionHandle, active: bool) -> Result<()> {
        self.record(HostCall::SetActive(active));
        Ok(())
    }

    fn dispatch_media_button(&self, _session: &SessionHandle, event: &MediaButtonEvent) -> Result<()> {
        self.record(HostCall::DispatchMediaButton(*event));
        Ok(())
    }

    fn release_session(&self, session: SessionHandle) {
        self.record(HostCall::ReleaseSession(session));
    }
}

impl NotificationHost for RecordingHost {
    fn create_channel(&self, channel: &ChannelDescriptor) -> Result<()> {
        if self.fail_channel.load(Ordering::SeqCst) {
            return Err(BridgeError::HostUnavailable("notification service not ready".into()));
        }
        self.record(HostCall::CreateChannel(channel.clone()));
        Ok(())
    }

    fn post(&self, notification_id: i32, notification: &NotificationDescriptor) -> Result<()> {
        self.record(HostCall::Post(notification_id, notification.clone()));
        Ok(())
    }

    fn cancel(&self, notification_id: i32) {
        self.record(HostCall::Cancel(notification_id));
    }
}

/// Engine that records the commands it receives
pub struct RecordingEngine {
    commands: Mutex<Vec<EngineCommand>>,
    fail: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }

    fn record(&self, command: EngineCommand) -> Result<()> {
        self.commands.lock().push(command);
        if self.fail.load(Ordering::SeqCst) {
            Err(BridgeError::Engine(format!("{:?} rejected", command)))
        } else {
            Ok(())
        }
    }
}

impl EngineControl for RecordingEngine {
    fn play(&self) -> Result<()> {
        self.record(EngineCommand::Play)
    }

    fn pause(&self) -> Result<()> {
        self.record(EngineCommand::Pause)
    }

    fn stop(&self) -> Result<()> {
        self.record(EngineCommand::Stop)
    }

    fn skip_next(&self) -> Result<()> {
        self.record(EngineCommand::SkipNext)
    }

    fn skip_previous(&self) -> Result<()> {
        self.record(EngineCommand::SkipPrevious)
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        self.record(EngineCommand::Seek(position_ms))
    }
}
