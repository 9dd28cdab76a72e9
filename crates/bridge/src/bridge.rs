// Bridge orchestrator: serializes reports into sync passes

use crate::mirror::SessionMirror;
use crate::presenter::NotificationPresenter;
use crate::router::ActionRouter;
use mediabridge_core::{
    BridgeConfig, BridgeError, EngineControl, EngineReport, HostAction, NotificationHost,
    PlaybackState, Result, SessionHandle, SessionHost, Transport,
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Bridge lifecycle, tied to host activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, `activate()` not called yet
    Created,
    Active,
    /// Torn down for good; reports are dropped
    Deactivated,
}

struct Shared {
    lifecycle: Lifecycle,
    state: PlaybackState,
    session: Option<SessionHandle>,
    /// State changed since the last snapshot was taken
    dirty: bool,
    /// Thread currently running the sync loop (or teardown)
    drainer: Option<ThreadId>,
    /// Session released and notification cancelled
    torn_down: bool,
    passes: u64,
}

/// Mirrors the engine's playback state onto the host session and
/// notification, and routes host actions back to the engine.
///
/// All entry points may be called from any thread. State mutations happen
/// under a short lock; host calls happen outside it, one pass at a time. A
/// report that lands while a pass is running is folded into the next pass
/// run by the same thread, so intermediate values may never reach the host
/// but the final one always does.
pub struct Bridge {
    config: BridgeConfig,
    sessions: Arc<dyn SessionHost>,
    mirror: SessionMirror,
    presenter: NotificationPresenter,
    router: ActionRouter,
    shared: Mutex<Shared>,
    /// Signalled whenever the drainer hands the loop back
    idle: Condvar,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        sessions: Arc<dyn SessionHost>,
        notifications: Arc<dyn NotificationHost>,
        engine: Arc<dyn EngineControl>,
    ) -> Self {
        log::info!("Bridge::new (session tag {})", config.session.tag);
        Self {
            mirror: SessionMirror::new(sessions.clone(), config.deactivate_on_stop),
            presenter: NotificationPresenter::new(notifications, config.clone()),
            router: ActionRouter::new(engine, sessions.clone(), config.pause_instead_of_stop),
            sessions,
            config,
            shared: Mutex::new(Shared {
                lifecycle: Lifecycle::Created,
                state: PlaybackState::new(),
                session: None,
                dirty: false,
                drainer: None,
                torn_down: false,
                passes: 0,
            }),
            idle: Condvar::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lock().lifecycle
    }

    /// Copy of the current playback state
    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state.clone()
    }

    pub fn has_session(&self) -> bool {
        self.shared.lock().session.is_some()
    }

    pub fn is_session_active(&self) -> bool {
        self.mirror.is_active()
    }

    /// Number of completed sync passes
    pub fn pass_count(&self) -> u64 {
        self.shared.lock().passes
    }

    /// Acquire the host session and, if configured, publish the initial state.
    ///
    /// A failure to obtain the session is not an error: the bridge tracks state
    /// and retries on the next report. Activating a deactivated bridge is a
    /// precondition violation.
    pub fn activate(&self) -> Result<()> {
        let mut shared = self.shared.lock();
        match shared.lifecycle {
            Lifecycle::Active => {
                log::debug!("Bridge already active");
                return Ok(());
            }
            Lifecycle::Deactivated => {
                log::warn!("activate() called on a deactivated bridge");
                return Err(BridgeError::PreconditionViolation(
                    "Bridge was deactivated".into(),
                ));
            }
            Lifecycle::Created => {}
        }

        log::info!("Activating bridge");
        shared.lifecycle = Lifecycle::Active;
        if self.config.publish_on_activate {
            shared.dirty = true;
        }
        self.drain(shared);
        Ok(())
    }

    /// Release the session and cancel the notification. Idempotent.
    ///
    /// Blocks until the teardown has reached the host: if a sync pass is
    /// running on another thread, this waits for it to finish first. Called
    /// from a host callback inside a pass, it only marks the bridge and the
    /// pass tears down once the callback returns.
    pub fn deactivate(&self) {
        let mut shared = self.shared.lock();
        match shared.lifecycle {
            Lifecycle::Deactivated => log::debug!("Bridge already deactivated"),
            Lifecycle::Created => {
                log::info!("Deactivating bridge that was never activated");
                shared.lifecycle = Lifecycle::Deactivated;
                shared.torn_down = true;
                return;
            }
            Lifecycle::Active => {
                log::info!("Deactivating bridge");
                shared.lifecycle = Lifecycle::Deactivated;
            }
        }

        if shared.drainer == Some(thread::current().id()) {
            return;
        }
        while shared.drainer.is_some() {
            self.idle.wait(&mut shared);
        }
        if !shared.torn_down {
            self.drain(shared);
        }
    }

    /// Apply one engine report and run a sync pass.
    ///
    /// Reports outside the active lifecycle are dropped with
    /// [`BridgeError::PreconditionViolation`]; invalid values are dropped with
    /// [`BridgeError::InvalidReport`]. Neither changes any state.
    pub fn apply(&self, report: EngineReport) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.lifecycle != Lifecycle::Active {
            log::warn!(
                "Dropping {} report: bridge is {:?}",
                report.kind(),
                shared.lifecycle
            );
            return Err(BridgeError::PreconditionViolation(format!(
                "{} report while bridge is {:?}",
                report.kind(),
                shared.lifecycle
            )));
        }

        if let Err(e) = shared.state.apply(&report) {
            log::warn!("Dropping {} report: {}", report.kind(), e);
            return Err(e);
        }
        shared.dirty = true;
        self.drain(shared);
        Ok(())
    }

    pub fn report_state(&self, transport: Transport) -> Result<()> {
        self.apply(EngineReport::State(transport))
    }

    pub fn report_metadata(&self, title: &str, author: &str, album: &str, duration_ms: u64) -> Result<()> {
        self.apply(EngineReport::Metadata {
            title: title.to_string(),
            author: author.to_string(),
            album: album.to_string(),
            duration_ms,
        })
    }

    pub fn report_position(&self, position_ms: u64) -> Result<()> {
        self.apply(EngineReport::Position(position_ms))
    }

    pub fn report_speed(&self, speed: f32) -> Result<()> {
        self.apply(EngineReport::Speed(speed))
    }

    pub fn report_duration(&self, duration_ms: u64) -> Result<()> {
        self.apply(EngineReport::Duration(duration_ms))
    }

    /// Route one host action to the engine. Never blocks on the engine and
    /// never changes the playback state.
    pub fn handle_action(&self, action: HostAction) -> Result<()> {
        let (state, session) = self.action_context()?;
        self.router.handle(action, &state, session.as_ref())
    }

    /// Route a host action given as its broadcast string
    pub fn handle_raw_action(&self, action: &str, argument: i64) -> Result<()> {
        let (state, session) = self.action_context()?;
        self.router.handle_raw(action, argument, &state, session.as_ref())
    }

    fn action_context(&self) -> Result<(PlaybackState, Option<SessionHandle>)> {
        let shared = self.shared.lock();
        if shared.lifecycle != Lifecycle::Active {
            log::warn!("Dropping host action: bridge is {:?}", shared.lifecycle);
            return Err(BridgeError::PreconditionViolation(format!(
                "Host action while bridge is {:?}",
                shared.lifecycle
            )));
        }
        Ok((shared.state.clone(), shared.session.clone()))
    }

    /// Run sync passes until no change is pending.
    ///
    /// Only one thread drains at a time; everyone else just marks the state
    /// dirty and leaves. The lock is released around every host call.
    fn drain<'a>(&'a self, mut shared: MutexGuard<'a, Shared>) {
        if shared.drainer.is_some() {
            return;
        }
        shared.drainer = Some(thread::current().id());
        let mut session_attempted = false;

        loop {
            if shared.lifecycle == Lifecycle::Deactivated {
                if !shared.torn_down {
                    shared.torn_down = true;
                    let session = shared.session.take();
                    self.unlocked(&mut shared, || self.teardown(session));
                }
                break;
            }

            if shared.session.is_none() && !session_attempted {
                session_attempted = true;
                let created = self.unlocked(&mut shared, || {
                    self.sessions.create_session(&self.config.session)
                });
                match created {
                    Ok(session) => {
                        log::info!("Host session created: {:?}", session);
                        shared.session = Some(session);
                    }
                    Err(e) => log::warn!("Host session unavailable, tracking state only: {}", e),
                }
                continue;
            }

            if !shared.dirty {
                break;
            }

            shared.dirty = false;
            let snapshot = shared.state.clone();
            let session = shared.session.clone();
            self.unlocked(&mut shared, || {
                self.mirror.sync(&snapshot, session.as_ref());
                match &session {
                    Some(session) => self.presenter.refresh(&snapshot, session),
                    None => log::warn!("Skipping notification refresh: no host session"),
                }
            });
            shared.passes += 1;
        }

        shared.drainer = None;
        self.idle.notify_all();
    }

    /// Run a host call with the state lock released.
    ///
    /// A panic in the host hands the loop back before unwinding, so later
    /// reports and `deactivate()` still reach the host.
    fn unlocked<T>(&self, shared: &mut MutexGuard<'_, Shared>, f: impl FnOnce() -> T) -> T {
        let outcome = MutexGuard::unlocked(shared, || panic::catch_unwind(AssertUnwindSafe(f)));
        match outcome {
            Ok(value) => value,
            Err(payload) => {
                log::error!("Host call panicked, abandoning sync pass");
                shared.drainer = None;
                self.idle.notify_all();
                panic::resume_unwind(payload)
            }
        }
    }

    fn teardown(&self, session: Option<SessionHandle>) {
        self.presenter.cancel();
        if let Some(session) = session {
            self.mirror.deactivate(&session);
            self.sessions.release_session(session);
            log::info!("Host session released");
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::EngineCommand;
    use crate::testing::{Gate, HostCall, RecordingEngine, RecordingHost};
    use mediabridge_core::{HostPlaybackMode, MediaButtonEvent, RoutingKey};
    use std::thread;

    fn setup(config: BridgeConfig) -> (Bridge, Arc<RecordingHost>, Arc<RecordingEngine>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = Arc::new(RecordingHost::new());
        let engine = Arc::new(RecordingEngine::new());
        let bridge = Bridge::new(config, host.clone(), host.clone(), engine.clone());
        (bridge, host, engine)
    }

    fn action_keys(host: &RecordingHost) -> Vec<RoutingKey> {
        host.last_post()
            .unwrap()
            .actions
            .iter()
            .map(|a| a.routing_key)
            .collect()
    }

    #[test]
    fn test_playback_scenario() {
        let (bridge, host, engine) = setup(BridgeConfig::default());
        bridge.activate().unwrap();

        bridge.report_state(Transport::Playing).unwrap();
        assert_eq!(action_keys(&host), vec![RoutingKey::Pause, RoutingKey::Next]);
        assert!(bridge.is_session_active());

        bridge.report_state(Transport::Paused).unwrap();
        assert_eq!(action_keys(&host), vec![RoutingKey::Play, RoutingKey::Next]);
        assert!(bridge.is_session_active());
        assert!(!host.calls().contains(&HostCall::SetActive(false)));

        let before = bridge.state();
        let passes = bridge.pass_count();
        bridge.handle_action(RoutingKey::Next.into()).unwrap();
        assert_eq!(engine.commands(), vec![EngineCommand::SkipNext]);
        assert_eq!(bridge.state(), before);
        assert_eq!(bridge.pass_count(), passes);
    }

    #[test]
    fn test_activation_publishes_initial_state() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();

        assert!(bridge.has_session());
        assert_eq!(bridge.pass_count(), 1);
        let post = host.last_post().unwrap();
        assert_eq!(post.title, "Unknown Media");
        assert_eq!(host.last_playback_state().unwrap().mode, HostPlaybackMode::Stopped);
        assert!(!bridge.is_session_active());
    }

    #[test]
    fn test_activation_without_publish() {
        let (bridge, host, _) = setup(BridgeConfig::default().with_publish_on_activate(false));
        bridge.activate().unwrap();

        assert!(bridge.has_session());
        assert_eq!(bridge.pass_count(), 0);
        assert!(host.posts().is_empty());
        assert_eq!(host.count(|c| matches!(c, HostCall::CreateSession(_))), 1);
    }

    #[test]
    fn test_sync_runs_before_refresh() {
        let (bridge, host, _) = setup(BridgeConfig::default().with_publish_on_activate(false));
        bridge.activate().unwrap();
        host.clear();

        bridge.report_position(1_000).unwrap();

        let calls = host.calls();
        let last_session = calls.iter().rposition(|c| matches!(c, HostCall::SetPlaybackState(_)));
        let first_post = calls.iter().position(|c| matches!(c, HostCall::Post(..)));
        assert!(last_session.unwrap() < first_post.unwrap());
    }

    #[test]
    fn test_metadata_round_trip() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        bridge.report_metadata("T", "A", "Al", 1000).unwrap();

        let metadata = host.last_metadata().unwrap();
        assert_eq!(metadata.title, "T");
        assert_eq!(metadata.artist, "A");
        assert_eq!(metadata.album, "Al");
        assert_eq!(metadata.duration_ms, 1000);

        let post = host.last_post().unwrap();
        assert_eq!(post.title, "T");
        assert_eq!(post.subtext, "A");
    }

    #[test]
    fn test_speed_and_duration_reach_session() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();

        bridge.report_speed(1.5).unwrap();
        bridge.report_duration(90_000).unwrap();

        assert_eq!(host.last_playback_state().unwrap().speed, 1.5);
        assert_eq!(host.last_metadata().unwrap().duration_ms, 90_000);
    }

    #[test]
    fn test_report_before_activate_is_dropped() {
        let (bridge, host, _) = setup(BridgeConfig::default());

        let err = bridge.report_state(Transport::Playing).unwrap_err();
        assert!(matches!(err, BridgeError::PreconditionViolation(_)));
        assert_eq!(bridge.state().transport, Transport::Stopped);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_deactivate_releases_once_and_drops_reports() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        bridge.report_state(Transport::Playing).unwrap();

        bridge.deactivate();
        bridge.deactivate();

        assert_eq!(bridge.lifecycle(), Lifecycle::Deactivated);
        assert_eq!(host.count(|c| matches!(c, HostCall::ReleaseSession(_))), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::Cancel(_))), 1);
        assert_eq!(host.calls().last(), Some(&HostCall::ReleaseSession(SessionHandle::new(1))));

        let calls_before = host.calls().len();
        let err = bridge.report_position(5_000).unwrap_err();
        assert!(matches!(err, BridgeError::PreconditionViolation(_)));
        assert!(bridge.handle_action(RoutingKey::Play.into()).is_err());
        assert!(bridge.activate().is_err());
        assert_eq!(host.calls().len(), calls_before);
        assert_eq!(host.count(|c| matches!(c, HostCall::CreateSession(_))), 1);
    }

    #[test]
    fn test_deactivate_marks_session_inactive_before_release() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        bridge.report_state(Transport::Playing).unwrap();
        host.clear();

        bridge.deactivate();

        let calls = host.calls();
        let inactive = calls.iter().position(|c| *c == HostCall::SetActive(false)).unwrap();
        let release = calls
            .iter()
            .position(|c| matches!(c, HostCall::ReleaseSession(_)))
            .unwrap();
        assert!(inactive < release);
    }

    #[test]
    fn test_deactivate_waits_for_pass_in_flight() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        let bridge = Arc::new(bridge);
        bridge.activate().unwrap();

        let gate = Gate::new();
        host.arm_gate(gate.clone());
        let reporter = {
            let bridge = bridge.clone();
            thread::spawn(move || bridge.report_state(Transport::Playing).unwrap())
        };
        gate.wait_entered();

        let closer = {
            let bridge = bridge.clone();
            let host = host.clone();
            thread::spawn(move || {
                bridge.deactivate();
                host.count(|c| matches!(c, HostCall::ReleaseSession(_)))
            })
        };
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!closer.is_finished());
        assert_eq!(host.count(|c| matches!(c, HostCall::ReleaseSession(_))), 0);

        gate.release();
        reporter.join().unwrap();
        assert_eq!(closer.join().unwrap(), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::ReleaseSession(_))), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::Cancel(_))), 1);
    }

    #[test]
    fn test_host_panic_does_not_wedge_bridge() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        let passes = bridge.pass_count();

        host.panic_once_on_metadata();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bridge.report_state(Transport::Playing)
        }));
        assert!(outcome.is_err());

        bridge.report_position(1_234).unwrap();
        assert_eq!(bridge.pass_count(), passes + 1);
        assert_eq!(host.last_playback_state().unwrap().position_ms, 1_234);

        bridge.deactivate();
        assert_eq!(host.count(|c| matches!(c, HostCall::ReleaseSession(_))), 1);
    }

    #[test]
    fn test_drop_tears_down() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        drop(bridge);
        assert_eq!(host.count(|c| matches!(c, HostCall::ReleaseSession(_))), 1);
    }

    #[test]
    fn test_host_unavailable_then_recovers() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        host.fail_session(true);
        bridge.activate().unwrap();
        assert!(!bridge.has_session());
        assert!(host.posts().is_empty());

        bridge.report_state(Transport::Playing).unwrap();
        assert_eq!(bridge.state().transport, Transport::Playing);
        assert!(host.posts().is_empty());

        host.fail_session(false);
        bridge.report_position(2_000).unwrap();
        assert!(bridge.has_session());
        assert_eq!(action_keys(&host), vec![RoutingKey::Pause, RoutingKey::Next]);
        let playback = host.last_playback_state().unwrap();
        assert_eq!(playback.mode, HostPlaybackMode::Playing);
        assert_eq!(playback.position_ms, 2_000);
    }

    #[test]
    fn test_invalid_report_dropped() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        let passes = bridge.pass_count();
        let calls = host.calls().len();

        let err = bridge.report_speed(0.0).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidReport(_)));
        assert_eq!(bridge.pass_count(), passes);
        assert_eq!(host.calls().len(), calls);
    }

    #[test]
    fn test_unknown_raw_action() {
        let (bridge, _, engine) = setup(BridgeConfig::default());
        bridge.activate().unwrap();

        let err = bridge.handle_raw_action("ACTION_SHUFFLE", 0).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownAction(_)));
        assert!(engine.commands().is_empty());

        bridge.handle_raw_action("ACTION_SEEK_BY", 30_000).unwrap();
        assert_eq!(engine.commands(), vec![EngineCommand::Seek(30_000)]);
    }

    #[test]
    fn test_media_button_forwarded() {
        let (bridge, host, engine) = setup(BridgeConfig::default());
        bridge.activate().unwrap();
        let event = MediaButtonEvent {
            action: 0,
            key_code: 126,
        };

        bridge.handle_action(HostAction::MediaButton(event)).unwrap();

        assert!(host.calls().contains(&HostCall::DispatchMediaButton(event)));
        assert!(engine.commands().is_empty());
    }

    #[test]
    fn test_reports_during_pass_are_coalesced() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        let bridge = Arc::new(bridge);
        bridge.activate().unwrap();
        let passes_before = bridge.pass_count();
        host.clear();

        let gate = Gate::new();
        host.arm_gate(gate.clone());

        let reporter = {
            let bridge = bridge.clone();
            thread::spawn(move || bridge.report_state(Transport::Playing).unwrap())
        };

        gate.wait_entered();
        for position in 1..=50u64 {
            bridge.report_position(position * 100).unwrap();
        }
        bridge.report_metadata("Late", "Author", "Album", 0).unwrap();
        gate.release();
        reporter.join().unwrap();

        assert_eq!(bridge.pass_count(), passes_before + 2);
        let states = host.playback_states();
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].mode, HostPlaybackMode::Playing);
        assert_eq!(states[1].position_ms, 5_000);
        assert_eq!(host.last_metadata().unwrap().title, "Late");
        assert_eq!(host.last_post().unwrap().title, "Late");
    }

    #[test]
    fn test_concurrent_reports_end_on_latest_values() {
        let (bridge, host, _) = setup(BridgeConfig::default());
        let bridge = Arc::new(bridge);
        bridge.activate().unwrap();

        let positions = {
            let bridge = bridge.clone();
            thread::spawn(move || {
                for position in 1..=200u64 {
                    bridge.report_position(position * 10).unwrap();
                }
            })
        };
        let transports = {
            let bridge = bridge.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let transport = if i % 2 == 0 {
                        Transport::Playing
                    } else {
                        Transport::Paused
                    };
                    bridge.report_state(transport).unwrap();
                }
                bridge.report_state(Transport::Playing).unwrap();
            })
        };
        positions.join().unwrap();
        transports.join().unwrap();

        let state = bridge.state();
        assert_eq!(state.transport, Transport::Playing);
        assert_eq!(state.position_ms, 2_000);

        let states = host.playback_states();
        let last = states.last().unwrap();
        assert_eq!(last.mode, HostPlaybackMode::Playing);
        assert_eq!(last.position_ms, 2_000);

        // Positions come from one thread in increasing order, so no pass can
        // publish an older position than a previous pass did.
        for pair in states.windows(2) {
            assert!(pair[0].position_ms <= pair[1].position_ms);
        }

        // Every post agrees with the transport of the snapshot it came from
        for (_, post) in host.posts() {
            let primary = post.actions[0].routing_key;
            assert_eq!(post.ongoing, primary == RoutingKey::Pause);
        }
    }
}
