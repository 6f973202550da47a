//! ProtocolWorker: the background poll loop.
//!
//! One session = one thread = one open serial connection. The controller
//! talks to the worker through three non-blocking calls (`start`, `stop`,
//! `submit_request`) and hears back through a channel of `WorkerEvent`s.
//!
//! Shared state (termination flag, pending request, session state) lives in
//! one mutex. The worker thread parks on a condvar between cycles, and
//! `submit_request` / `stop` wake it with `notify_one` (there is only ever
//! one waiter).
//!
//! Per session: open → { build frame → exchange → emit Response → park }* →
//! close. The first error ends the session and is emitted exactly once,
//! after the port has been released. A clean stop emits nothing.
//!
//! Every `start` numbers its session and every event carries that number,
//! so a controller can drop what a session it already left still sends.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::domain::{
    BaudRate, ConnectionParameters, InputMask, OutputMask, PanelError, PanelResult, SessionState,
};
use crate::ports::SerialFactory;
use crate::protocol::PollSession;

/// Number of a session, increasing with every `start` that spawns one.
pub type SessionId = u64;

/// Outcome of a poll cycle, delivered in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The device answered; carries its input mask.
    Response(InputMask),
    /// The session ended on this error. Always the last event of a session.
    Error(PanelError),
}

/// A `WorkerEvent` tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: WorkerEvent,
}

struct Shared {
    state: SessionState,
    /// Number of the most recently started session
    session: SessionId,
    quit: bool,
    request: OutputMask,
    /// Set by `submit_request`, cleared when a frame is built from `request`.
    request_pending: bool,
    params: Option<ConnectionParameters>,
}

struct Control {
    shared: Mutex<Shared>,
    wake: Condvar,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the poll thread of the current session, if any.
pub struct ProtocolWorker {
    control: Arc<Control>,
    factory: Arc<dyn SerialFactory>,
    events: Sender<SessionEvent>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ProtocolWorker {
    /// Create an idle worker and the receiving end of its event channel.
    pub fn new(factory: Arc<dyn SerialFactory>) -> (Self, Receiver<SessionEvent>) {
        let (events, receiver) = unbounded();
        let worker = Self {
            control: Arc::new(Control {
                shared: Mutex::new(Shared {
                    state: SessionState::Idle,
                    session: 0,
                    quit: false,
                    request: 0,
                    request_pending: false,
                    params: None,
                }),
                wake: Condvar::new(),
            }),
            factory,
            events,
            thread: Mutex::new(None),
        };
        (worker, receiver)
    }

    /// Begin a session on `port` and return its number. No-op returning
    /// `None` while a session is active.
    ///
    /// Returns immediately; success shows up as `Response` events, failure
    /// as a single `Error` event.
    pub fn start(&self, port: &str, baud_rate: BaudRate) -> Option<SessionId> {
        let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);

        let (session, params) = {
            let mut shared = self.control.lock();
            if shared.state.is_active() {
                log::debug!("start({port}): session already active, ignoring");
                return None;
            }
            let params = ConnectionParameters::new(port, baud_rate);
            shared.session += 1;
            shared.params = Some(params.clone());
            shared.quit = false;
            shared.state = SessionState::Opening;
            (shared.session, params)
        };

        // The previous session already went Idle; its thread is at most
        // finishing its last send.
        if let Some(previous) = thread_slot.take() {
            if previous.join().is_err() {
                log::error!("Previous poll thread panicked");
            }
        }

        let control = Arc::clone(&self.control);
        let factory = Arc::clone(&self.factory);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("iopanel-poll".into())
            .spawn(move || run_session(control, factory, session, params, events));

        match spawned {
            Ok(handle) => *thread_slot = Some(handle),
            Err(e) => {
                self.control.lock().state = SessionState::Idle;
                let err = PanelError::ConnectionOpen {
                    port: port.to_string(),
                    reason: format!("failed to spawn poll thread: {e}"),
                };
                log::error!("{err}");
                emit(&self.events, session, WorkerEvent::Error(err));
            }
        }
        Some(session)
    }

    /// Ask the active session to end. No-op while idle.
    ///
    /// In-flight I/O is not interrupted; the loop notices the request before
    /// building its next frame.
    pub fn stop(&self) {
        let mut shared = self.control.lock();
        if shared.state.is_active() {
            shared.quit = true;
            self.control.wake.notify_one();
        }
    }

    /// Replace the pending output mask. Never queues: only the latest value
    /// is sent. While idle the value is kept for the next session.
    pub fn submit_request(&self, output: OutputMask) {
        let mut shared = self.control.lock();
        shared.request = output;
        shared.request_pending = true;
        if shared.state.is_active() {
            self.control.wake.notify_one();
        }
    }

    pub fn state(&self) -> SessionState {
        self.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// Parameters of the active session, `None` while idle.
    pub fn connection(&self) -> Option<ConnectionParameters> {
        let shared = self.control.lock();
        if shared.state.is_active() {
            shared.params.clone()
        } else {
            None
        }
    }

    /// The output mask the next frame will carry.
    pub fn pending_request(&self) -> OutputMask {
        self.control.lock().request
    }
}

impl Drop for ProtocolWorker {
    fn drop(&mut self) {
        self.stop();
        let handle = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Poll thread panicked");
            }
        }
    }
}

/// Send one tagged event. Returns `false` if nobody is listening any more.
fn emit(events: &Sender<SessionEvent>, session: SessionId, event: WorkerEvent) -> bool {
    match events.send(SessionEvent { session, event }) {
        Ok(()) => true,
        Err(lost) => {
            log::warn!("Event {:?} of session {session} dropped, no receiver", lost.0.event);
            false
        }
    }
}

/// Body of the session thread.
fn run_session(
    control: Arc<Control>,
    factory: Arc<dyn SerialFactory>,
    session_id: SessionId,
    params: ConnectionParameters,
    events: Sender<SessionEvent>,
) {
    let result = match open_session(factory.as_ref(), &params) {
        Ok(mut session) => {
            control.lock().state = SessionState::Running;
            log::info!("Polling {} at {} baud", params.port, params.baud_rate);

            let result = poll_loop(&control, &mut session, session_id, &events);
            control.lock().state = if result.is_ok() {
                SessionState::Stopping
            } else {
                SessionState::Terminating
            };
            drop(session);
            log::info!("Closed {}", params.port);
            result
        }
        Err(e) => Err(e),
    };

    control.lock().state = SessionState::Idle;

    if let Err(e) = result {
        log::error!("Session on {} ended: {e}", params.port);
        emit(&events, session_id, WorkerEvent::Error(e));
    }
}

fn open_session(factory: &dyn SerialFactory, params: &ConnectionParameters) -> PanelResult<PollSession> {
    let connection = factory
        .open(&params.port, params.baud_rate)
        .map_err(|e| match e {
            PanelError::ConnectionOpen { .. } => e,
            other => PanelError::ConnectionOpen {
                port: params.port.clone(),
                reason: other.to_string(),
            },
        })?;
    Ok(PollSession::new(connection))
}

/// Poll until stopped (`Ok`) or until the first I/O or protocol error (`Err`).
fn poll_loop(
    control: &Control,
    session: &mut PollSession,
    session_id: SessionId,
    events: &Sender<SessionEvent>,
) -> PanelResult<()> {
    loop {
        let output = {
            let mut shared = control.lock();
            if shared.quit {
                return Ok(());
            }
            shared.request_pending = false;
            shared.request
        };

        let input = session.exchange(output)?;
        if !emit(events, session_id, WorkerEvent::Response(input)) {
            log::warn!("Event receiver dropped, ending session");
            return Ok(());
        }

        let mut shared = control.lock();
        while !shared.quit && !shared.request_pending {
            shared = control
                .wake
                .wait(shared)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
