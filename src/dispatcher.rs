//! Hotkey dispatch and listener lifecycle.
//!
//! [`HotkeyDispatcher`] owns the immutable binding table (key combination
//! to [`Action`]) and supervises the background thread that the hotkey
//! backend runs on.  Triggered bindings are resolved by index lookup and
//! executed on the listener thread itself, never on the thread that called
//! [`start`](HotkeyDispatcher::start).
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Starting --registration ok--> Running
//! Starting --registration fails--> Stopped          (error note)
//! Running --listener dies--> Stopped                (error note)
//! Running --stop(), joined in time--> Stopped
//! Running --stop(), join deadline missed--> StoppingFailed (warning note)
//! ```
//!
//! `start` while Starting/Running and `stop` while Stopped are no-ops that
//! emit a single informational note.  Stopping waits a bounded interval
//! for the listener thread to exit and then proceeds regardless: a thread
//! stuck in a platform call is abandoned (leaked) rather than blocking the
//! caller forever.

use crate::action::{Action, KeyCombo};
use crate::traits::{ActionExecutor, HotkeyBackend, Severity, StatusNote};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long `start` waits for the listener thread to report its
/// registration outcome.
const START_HANDSHAKE: Duration = Duration::from_secs(5);

/// Lifecycle state of the hotkey listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    /// A stop request timed out; the listener thread may still be alive.
    StoppingFailed = 3,
}

/// Lock-free shared state cell, written by both the dispatcher and the
/// listener thread.
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ListenerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> ListenerState {
        match self.0.load(Ordering::SeqCst) {
            0 => ListenerState::Stopped,
            1 => ListenerState::Starting,
            2 => ListenerState::Running,
            _ => ListenerState::StoppingFailed,
        }
    }

    fn set(&self, state: ListenerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Result of a [`start`](HotkeyDispatcher::start) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The listener was already Running or Starting; nothing changed.
    AlreadyRunning,
}

/// Result of a [`stop`](HotkeyDispatcher::stop) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The listener was not running; nothing changed.
    NotRunning,
    /// The listener did not exit within the deadline and was abandoned.
    TimedOut,
}

/// Errors from dispatcher configuration and startup.
#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    /// Two bindings name the same key combination.
    #[error("duplicate hotkey binding: {0}")]
    DuplicateBinding(KeyCombo),

    /// Bindings cannot change after the listener has started.
    #[error("hotkey bindings are immutable while the listener is active")]
    BindingsLocked,

    /// The platform refused to register the hotkeys, or the listener
    /// thread could not be brought up.
    #[error("{0}")]
    StartFailure(String),
}

/// The running listener thread plus the channel it returns its backend on.
struct Worker<B> {
    handle: JoinHandle<()>,
    done_rx: mpsc::Receiver<B>,
}

/// Owns hotkey bindings and the listener's run/stop lifecycle.
///
/// Generic over the hotkey backend and the action executor so tests can
/// substitute scripted doubles for both.
pub struct HotkeyDispatcher<B, E> {
    bindings: Arc<Vec<(KeyCombo, Action)>>,
    executor: Arc<E>,
    /// Present while no listener owns it; taken by `start`, handed back
    /// when the listener thread exits cleanly.
    backend: Option<B>,
    state: Arc<StateCell>,
    status_tx: Option<mpsc::Sender<StatusNote>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<Worker<B>>,
    stop_deadline: Duration,
}

impl<B, E> HotkeyDispatcher<B, E>
where
    B: HotkeyBackend,
    E: ActionExecutor + 'static,
{
    /// Create a dispatcher with an empty binding table.
    ///
    /// `stop_deadline` bounds how long [`stop`](Self::stop) waits for the
    /// listener thread to exit before abandoning it.
    pub fn new(backend: B, executor: Arc<E>, stop_deadline: Duration) -> Self {
        Self {
            bindings: Arc::new(Vec::new()),
            executor,
            backend: Some(backend),
            state: Arc::new(StateCell::new(ListenerState::Stopped)),
            status_tx: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            stop_deadline,
        }
    }

    /// Attach a status notification channel.
    ///
    /// Every state transition sends one [`StatusNote`]; the receiver is
    /// free to display or ignore them.
    pub fn set_status_sink(&mut self, tx: mpsc::Sender<StatusNote>) {
        self.status_tx = Some(tx);
    }

    /// Current listener state.
    pub fn state(&self) -> ListenerState {
        self.state.get()
    }

    /// Replace the binding table.
    ///
    /// Rejects duplicate key combinations (two entries that normalize to
    /// the same combo) and refuses to change bindings unless the listener
    /// is fully stopped.
    pub fn register_bindings(
        &mut self,
        bindings: Vec<(KeyCombo, Action)>,
    ) -> Result<(), DispatcherError> {
        if self.state.get() != ListenerState::Stopped {
            return Err(DispatcherError::BindingsLocked);
        }
        let mut seen = HashSet::new();
        for (combo, _) in &bindings {
            if !seen.insert(combo.clone()) {
                return Err(DispatcherError::DuplicateBinding(combo.clone()));
            }
        }
        debug!("registered {} hotkey bindings", bindings.len());
        self.bindings = Arc::new(bindings);
        Ok(())
    }

    /// Start the listener.
    ///
    /// Spawns the backend on a dedicated thread and waits for it to report
    /// the registration outcome.  Calling `start` while the listener is
    /// already up is a no-op that emits one "already running" note.
    pub fn start(&mut self) -> Result<StartOutcome, DispatcherError> {
        self.reap_finished_worker();

        match self.state.get() {
            ListenerState::Running | ListenerState::Starting => {
                self.notify(Severity::Info, "hotkey listener already running".into());
                return Ok(StartOutcome::AlreadyRunning);
            }
            ListenerState::Stopped | ListenerState::StoppingFailed => {}
        }

        let mut backend = match self.backend.take() {
            Some(b) => b,
            None => {
                let msg =
                    "hotkey listener unavailable: a previous listener has not shut down".to_string();
                self.notify(Severity::Error, msg.clone());
                return Err(DispatcherError::StartFailure(msg));
            }
        };

        self.state.set(ListenerState::Starting);
        self.notify(Severity::Info, "starting hotkey listener".into());

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = stop_flag.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<B>();

        let bindings = self.bindings.clone();
        let executor = self.executor.clone();
        let state = self.state.clone();
        let status_tx = self.status_tx.clone();
        let thread_stop = stop_flag.clone();

        let spawned = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let stop_flag = thread_stop;
                let combos: Vec<KeyCombo> = bindings.iter().map(|(c, _)| c.clone()).collect();
                if let Err(e) = backend.register(&combos) {
                    let _ = ready_tx.send(Err(e.to_string()));
                    let _ = done_tx.send(backend);
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                // Wait until start() has committed the Running state, so a
                // listener that dies instantly cannot have its Stopped
                // write overtaken by the Running one.
                let _ = go_rx.recv();

                let result = backend.run(&stop_flag, &mut |index| match bindings.get(index) {
                    Some((combo, action)) => {
                        debug!("hotkey {} triggered: {}", combo, action);
                        executor.execute(action);
                    }
                    None => warn!("trigger for unregistered binding index {}", index),
                });

                if stop_flag.load(Ordering::SeqCst) {
                    // Normal shutdown; stop() reports the transition.
                    if let Err(e) = result {
                        warn!("hotkey listener reported an error while stopping: {}", e);
                    }
                } else {
                    state.set(ListenerState::Stopped);
                    match result {
                        Ok(()) => send_note(
                            &status_tx,
                            Severity::Warning,
                            "hotkey listener ended unexpectedly".into(),
                        ),
                        Err(e) => send_note(
                            &status_tx,
                            Severity::Error,
                            format!("hotkey listener failed: {}", e),
                        ),
                    }
                }
                let _ = done_tx.send(backend);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.state.set(ListenerState::Stopped);
                let msg = format!("could not spawn hotkey listener thread: {}", e);
                self.notify(Severity::Error, msg.clone());
                return Err(DispatcherError::StartFailure(msg));
            }
        };

        match ready_rx.recv_timeout(START_HANDSHAKE) {
            Ok(Ok(())) => {
                self.state.set(ListenerState::Running);
                let _ = go_tx.send(());
                self.notify(
                    Severity::Info,
                    format!("hotkey listener running ({} bindings)", self.bindings.len()),
                );
                self.worker = Some(Worker { handle, done_rx });
                Ok(StartOutcome::Started)
            }
            Ok(Err(reason)) => {
                // Registration failed; the thread is already on its way
                // out, so the backend can be reclaimed for a later start.
                if let Ok(b) = done_rx.recv_timeout(Duration::from_secs(1)) {
                    self.backend = Some(b);
                }
                if handle.join().is_err() {
                    warn!("hotkey listener thread panicked during startup");
                }
                self.state.set(ListenerState::Stopped);
                let msg = format!("failed to register global hotkeys: {}", reason);
                self.notify(Severity::Error, msg.clone());
                Err(DispatcherError::StartFailure(msg))
            }
            Err(_) => {
                stop_flag.store(true, Ordering::SeqCst);
                self.state.set(ListenerState::Stopped);
                self.worker = Some(Worker { handle, done_rx });
                let msg = "hotkey listener thread did not report readiness".to_string();
                self.notify(Severity::Error, msg.clone());
                Err(DispatcherError::StartFailure(msg))
            }
        }
    }

    /// Stop the listener.
    ///
    /// Signals the backend to end, then waits up to the configured
    /// deadline for the listener thread to exit.  On timeout the thread is
    /// abandoned with a warning; the leak is accepted rather than blocking
    /// the caller indefinitely.
    pub fn stop(&mut self) -> StopOutcome {
        match self.state.get() {
            ListenerState::Running | ListenerState::Starting => {}
            ListenerState::Stopped | ListenerState::StoppingFailed => {
                self.reap_finished_worker();
                self.notify(Severity::Info, "hotkey listener not running".into());
                return StopOutcome::NotRunning;
            }
        }

        self.stop_flag.store(true, Ordering::SeqCst);

        let Some(worker) = self.worker.take() else {
            self.state.set(ListenerState::Stopped);
            self.notify(Severity::Info, "hotkey listener stopped".into());
            return StopOutcome::Stopped;
        };

        match worker.done_rx.recv_timeout(self.stop_deadline) {
            Ok(backend) => {
                if worker.handle.join().is_err() {
                    warn!("hotkey listener thread panicked");
                }
                self.backend = Some(backend);
                self.state.set(ListenerState::Stopped);
                self.notify(Severity::Info, "hotkey listener stopped".into());
                StopOutcome::Stopped
            }
            Err(_) => {
                self.state.set(ListenerState::StoppingFailed);
                self.notify(
                    Severity::Warning,
                    format!(
                        "hotkey listener did not stop within {:?}; abandoning its thread",
                        self.stop_deadline
                    ),
                );
                StopOutcome::TimedOut
            }
        }
    }

    /// Reclaim the backend from a listener thread that has already exited
    /// (after an unexpected death or an abandoned stop that since
    /// completed), so a later `start` can reuse it.
    fn reap_finished_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            match worker.done_rx.try_recv() {
                Ok(backend) => {
                    if worker.handle.join().is_err() {
                        warn!("hotkey listener thread panicked");
                    }
                    self.backend = Some(backend);
                    if self.state.get() == ListenerState::StoppingFailed {
                        self.state.set(ListenerState::Stopped);
                    }
                }
                Err(_) => self.worker = Some(worker),
            }
        }
    }

    fn notify(&self, severity: Severity, message: String) {
        send_note(&self.status_tx, severity, message);
    }
}

/// Log a status message and forward it to the sink, if one is attached.
fn send_note(tx: &Option<mpsc::Sender<StatusNote>>, severity: Severity, message: String) {
    match severity {
        Severity::Info => info!("{}", message),
        Severity::Warning => warn!("{}", message),
        Severity::Error => error!("{}", message),
    }
    if let Some(tx) = tx {
        let _ = tx.send(StatusNote::new(severity, message));
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Point;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct ScriptError(String);

    /// Backend that fires a scripted trigger sequence, then idles until
    /// stopped.
    struct ScriptedBackend {
        triggers: Vec<usize>,
        fail_register: bool,
    }

    impl ScriptedBackend {
        fn new(triggers: Vec<usize>) -> Self {
            Self {
                triggers,
                fail_register: false,
            }
        }
    }

    impl HotkeyBackend for ScriptedBackend {
        type Error = ScriptError;

        fn register(&mut self, _: &[KeyCombo]) -> Result<(), ScriptError> {
            if self.fail_register {
                Err(ScriptError("combination already grabbed".into()))
            } else {
                Ok(())
            }
        }

        fn run(
            &mut self,
            stop: &AtomicBool,
            on_trigger: &mut dyn FnMut(usize),
        ) -> Result<(), ScriptError> {
            for index in self.triggers.drain(..) {
                if stop.load(Ordering::SeqCst) {
                    return Ok(());
                }
                on_trigger(index);
            }
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        }
    }

    /// Backend that ignores the stop flag for a while.
    struct StubbornBackend {
        linger: Duration,
    }

    impl HotkeyBackend for StubbornBackend {
        type Error = ScriptError;

        fn register(&mut self, _: &[KeyCombo]) -> Result<(), ScriptError> {
            Ok(())
        }

        fn run(
            &mut self,
            _stop: &AtomicBool,
            _on_trigger: &mut dyn FnMut(usize),
        ) -> Result<(), ScriptError> {
            std::thread::sleep(self.linger);
            Ok(())
        }
    }

    /// Backend whose run loop dies immediately after registering.
    struct DyingBackend;

    impl HotkeyBackend for DyingBackend {
        type Error = ScriptError;

        fn register(&mut self, _: &[KeyCombo]) -> Result<(), ScriptError> {
            Ok(())
        }

        fn run(
            &mut self,
            _stop: &AtomicBool,
            _on_trigger: &mut dyn FnMut(usize),
        ) -> Result<(), ScriptError> {
            Err(ScriptError("display connection lost".into()))
        }
    }

    /// Executor double that records every action it is handed.
    #[derive(Default)]
    struct RecorderExecutor {
        actions: Mutex<Vec<Action>>,
    }

    impl ActionExecutor for RecorderExecutor {
        fn execute(&self, action: &Action) {
            self.actions.lock().unwrap().push(action.clone());
        }
    }

    fn bindings() -> Vec<(KeyCombo, Action)> {
        vec![
            (
                KeyCombo::parse("ctrl+alt+l").unwrap(),
                Action::ApplyLayout("halves".into()),
            ),
            (
                KeyCombo::parse("ctrl+alt+1").unwrap(),
                Action::MoveCursorTo(Point { x: 100, y: 100 }),
            ),
        ]
    }

    fn wait_until(deadline: Duration, mut ready: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if ready() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        ready()
    }

    #[test]
    fn triggers_execute_bound_actions_in_order() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![0, 1, 0]),
            executor.clone(),
            Duration::from_secs(2),
        );
        d.register_bindings(bindings()).unwrap();
        assert_eq!(d.start().unwrap(), StartOutcome::Started);

        assert!(wait_until(Duration::from_secs(2), || {
            executor.actions.lock().unwrap().len() == 3
        }));
        assert_eq!(d.stop(), StopOutcome::Stopped);

        let actions = executor.actions.lock().unwrap();
        assert_eq!(actions[0], Action::ApplyLayout("halves".into()));
        assert_eq!(actions[1], Action::MoveCursorTo(Point { x: 100, y: 100 }));
        assert_eq!(actions[2], Action::ApplyLayout("halves".into()));
    }

    #[test]
    fn out_of_range_trigger_index_is_ignored() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![7, 0]),
            executor.clone(),
            Duration::from_secs(2),
        );
        d.register_bindings(bindings()).unwrap();
        d.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            executor.actions.lock().unwrap().len() == 1
        }));
        d.stop();
        assert_eq!(executor.actions.lock().unwrap().len(), 1);
    }

    #[test]
    fn second_start_is_a_noop_with_one_notification() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![]),
            executor,
            Duration::from_secs(2),
        );
        let (tx, rx) = mpsc::channel();
        d.set_status_sink(tx);
        d.register_bindings(bindings()).unwrap();

        assert_eq!(d.start().unwrap(), StartOutcome::Started);
        assert_eq!(d.start().unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(d.state(), ListenerState::Running);

        let notes: Vec<StatusNote> = rx.try_iter().collect();
        let already: Vec<&StatusNote> = notes
            .iter()
            .filter(|n| n.message.contains("already running"))
            .collect();
        assert_eq!(already.len(), 1);
        assert_eq!(already[0].severity, Severity::Info);

        d.stop();
    }

    #[test]
    fn stop_when_stopped_is_a_noop() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![]),
            executor,
            Duration::from_secs(2),
        );
        let (tx, rx) = mpsc::channel();
        d.set_status_sink(tx);

        assert_eq!(d.stop(), StopOutcome::NotRunning);
        assert_eq!(d.state(), ListenerState::Stopped);
        let notes: Vec<StatusNote> = rx.try_iter().collect();
        assert!(notes.iter().any(|n| n.message.contains("not running")));
    }

    #[test]
    fn registration_failure_reports_error_and_stays_stopped() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut backend = ScriptedBackend::new(vec![]);
        backend.fail_register = true;
        let mut d = HotkeyDispatcher::new(backend, executor, Duration::from_secs(2));
        let (tx, rx) = mpsc::channel();
        d.set_status_sink(tx);
        d.register_bindings(bindings()).unwrap();

        let err = d.start().unwrap_err();
        assert!(matches!(err, DispatcherError::StartFailure(_)));
        assert_eq!(d.state(), ListenerState::Stopped);
        let notes: Vec<StatusNote> = rx.try_iter().collect();
        assert!(notes
            .iter()
            .any(|n| n.severity == Severity::Error && n.message.contains("register")));
    }

    #[test]
    fn duplicate_binding_is_rejected_before_start() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![]),
            executor,
            Duration::from_secs(2),
        );
        // Same combination in two spellings.
        let dup = vec![
            (
                KeyCombo::parse("ctrl+alt+l").unwrap(),
                Action::ApplyLayout("halves".into()),
            ),
            (
                KeyCombo::parse("Alt+Ctrl+L").unwrap(),
                Action::ApplyLayout("thirds".into()),
            ),
        ];
        let err = d.register_bindings(dup).unwrap_err();
        assert!(matches!(err, DispatcherError::DuplicateBinding(_)));
        assert_eq!(d.state(), ListenerState::Stopped);
    }

    #[test]
    fn bindings_are_locked_while_running() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![]),
            executor,
            Duration::from_secs(2),
        );
        d.register_bindings(bindings()).unwrap();
        d.start().unwrap();
        assert!(matches!(
            d.register_bindings(bindings()),
            Err(DispatcherError::BindingsLocked)
        ));
        d.stop();
        d.register_bindings(bindings()).unwrap();
    }

    #[test]
    fn stopped_listener_can_be_started_again() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            ScriptedBackend::new(vec![]),
            executor,
            Duration::from_secs(2),
        );
        d.register_bindings(bindings()).unwrap();
        assert_eq!(d.start().unwrap(), StartOutcome::Started);
        assert_eq!(d.stop(), StopOutcome::Stopped);
        assert_eq!(d.state(), ListenerState::Stopped);
        assert_eq!(d.start().unwrap(), StartOutcome::Started);
        d.stop();
    }

    #[test]
    fn stop_deadline_miss_abandons_the_thread() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(
            StubbornBackend {
                linger: Duration::from_millis(300),
            },
            executor,
            Duration::from_millis(30),
        );
        let (tx, rx) = mpsc::channel();
        d.set_status_sink(tx);
        d.register_bindings(bindings()).unwrap();
        d.start().unwrap();

        assert_eq!(d.stop(), StopOutcome::TimedOut);
        assert_eq!(d.state(), ListenerState::StoppingFailed);
        let notes: Vec<StatusNote> = rx.try_iter().collect();
        assert!(notes.iter().any(|n| n.severity == Severity::Warning));

        // Once the stubborn thread does exit, the backend is reclaimable.
        assert!(wait_until(Duration::from_secs(2), || {
            d.reap_finished_worker();
            d.backend.is_some()
        }));
        assert_eq!(d.state(), ListenerState::Stopped);
    }

    #[test]
    fn listener_death_is_reported_and_allows_restart() {
        let executor = Arc::new(RecorderExecutor::default());
        let mut d = HotkeyDispatcher::new(DyingBackend, executor, Duration::from_secs(2));
        let (tx, rx) = mpsc::channel();
        d.set_status_sink(tx);
        d.register_bindings(bindings()).unwrap();
        d.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            d.state() == ListenerState::Stopped
        }));
        let notes: Vec<StatusNote> = rx.try_iter().collect();
        assert!(notes
            .iter()
            .any(|n| n.severity == Severity::Error && n.message.contains("failed")));

        // The dead listener's backend comes back for the next start.
        assert_eq!(d.start().unwrap(), StartOutcome::Started);
        assert!(wait_until(Duration::from_secs(2), || {
            d.state() == ListenerState::Stopped
        }));
    }
}
