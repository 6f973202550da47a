//! Integration tests: ProtocolWorker against a scripted serial device
//!
//! These drive the worker through its public start / stop / submit_request
//! surface and watch the event channel and the device's records. No real
//! hardware is involved.
//!
//! Run with: cargo test --test worker_integration

mod common;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use common::{wait_idle, Reply, ScriptedFactory};
use iopanel_lib::domain::{BaudRate, ConnectionParameters, PanelError, SessionState};
use iopanel_lib::protocol::encode;
use iopanel_lib::worker::{ProtocolWorker, SessionEvent, WorkerEvent};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
/// Long enough for a stray cycle (write + read timeouts) to show up.
const QUIET_PERIOD: Duration = Duration::from_millis(300);

fn worker_for(factory: &ScriptedFactory) -> (ProtocolWorker, Receiver<SessionEvent>) {
    ProtocolWorker::new(Arc::new(factory.clone()))
}

fn next_event(events: &Receiver<SessionEvent>) -> WorkerEvent {
    events
        .recv_timeout(EVENT_TIMEOUT)
        .expect("worker produced no event")
        .event
}

fn assert_quiet(events: &Receiver<SessionEvent>) {
    if let Ok(event) = events.recv_timeout(QUIET_PERIOD) {
        panic!("unexpected event {event:?}");
    }
}

// ---------------------------------------------------------------------------
// Normal cycle
// ---------------------------------------------------------------------------

/// Start → submit → little-endian reply → Response → stop, port released.
#[test]
fn poll_cycle_round_trip_and_clean_stop() {
    let factory = ScriptedFactory::new();
    factory.push_reply(Reply::Raw(vec![0x00, 0x02]));
    let (worker, events) = worker_for(&factory);

    worker.start("COM7", BaudRate::B9600);
    worker.submit_request(0x0001);

    // The first frame may carry 0 or 1 depending on who wins the lock
    let first = next_event(&events);
    assert_eq!(first, WorkerEvent::Response(0x0200));
    assert_eq!(factory.opens(), [("COM7".to_string(), BaudRate::B9600)]);

    worker.stop();
    wait_idle(&worker);
    assert_eq!(factory.open_connections(), 0);
    assert_eq!(factory.closes(), 1);
    // A second cycle for the late submit may have completed before the stop
    for tagged in events.try_iter() {
        assert!(matches!(tagged.event, WorkerEvent::Response(_)), "got {tagged:?}");
    }

    // A submit while idle goes nowhere
    let frames_before = factory.frames().len();
    worker.submit_request(0x0003);
    assert_quiet(&events);
    assert_eq!(factory.frames().len(), frames_before);
}

/// The request buffered before start goes out as the first frame.
#[test]
fn first_frame_carries_buffered_request() {
    let factory = ScriptedFactory::new();
    factory.push_reply(Reply::Raw(vec![0x00, 0x02]));
    let (worker, events) = worker_for(&factory);

    worker.submit_request(0x0001);
    worker.start("COM7", BaudRate::B9600);

    assert_eq!(next_event(&events), WorkerEvent::Response(0x0200));
    assert_eq!(factory.frames(), [vec![0xBA, 0x01, 0x00, 0xB9]]);
}

#[test]
fn start_while_running_is_ignored() {
    let factory = ScriptedFactory::new();
    let (worker, events) = worker_for(&factory);

    assert!(worker.start("COM7", BaudRate::B9600).is_some());
    next_event(&events);
    assert_eq!(worker.start("COM8", BaudRate::B115200), None);

    assert_eq!(factory.opens().len(), 1);
    assert_eq!(
        worker.connection(),
        Some(ConnectionParameters::new("COM7", BaudRate::B9600))
    );
    assert_eq!(worker.state(), SessionState::Running);
}

/// Only the most recent request is sent; submits never queue frames.
#[test]
fn requests_submitted_during_io_coalesce() {
    let (factory, gate) = ScriptedFactory::gated();
    let (worker, events) = worker_for(&factory);

    worker.start("COM7", BaudRate::B9600);
    gate.entered.recv_timeout(EVENT_TIMEOUT).unwrap();

    // The worker is inside the first exchange
    worker.submit_request(0x0001);
    worker.submit_request(0x0002);
    gate.release.send(()).unwrap();
    assert_eq!(next_event(&events), WorkerEvent::Response(0x0000));

    gate.entered.recv_timeout(EVENT_TIMEOUT).unwrap();
    gate.release.send(()).unwrap();
    assert_eq!(next_event(&events), WorkerEvent::Response(0x0002));

    assert_quiet(&events);
    assert_eq!(factory.frames(), [encode(0x0000).to_vec(), encode(0x0002).to_vec()]);
}

/// Stop does not cut an exchange short; the loop ends before the next frame.
#[test]
fn stop_during_io_finishes_exchange_then_exits() {
    let (factory, gate) = ScriptedFactory::gated();
    let (worker, events) = worker_for(&factory);

    worker.start("COM7", BaudRate::B9600);
    gate.entered.recv_timeout(EVENT_TIMEOUT).unwrap();
    worker.stop();
    worker.submit_request(0x00FF);
    gate.release.send(()).unwrap();

    wait_idle(&worker);
    assert_eq!(factory.frames().len(), 1);
    assert_eq!(factory.open_connections(), 0);
    for tagged in events.try_iter() {
        assert!(matches!(tagged.event, WorkerEvent::Response(_)), "got {tagged:?}");
    }
}

/// A stop that lands while the port is still opening ends the session
/// before any frame goes out, and without an event.
#[test]
fn stop_while_opening_sends_nothing() {
    let (factory, gate) = ScriptedFactory::gated_open();
    let (worker, events) = worker_for(&factory);

    worker.start("COM7", BaudRate::B9600);
    gate.entered.recv_timeout(EVENT_TIMEOUT).unwrap();
    assert_eq!(worker.state(), SessionState::Opening);
    worker.stop();
    gate.release.send(()).unwrap();

    wait_idle(&worker);
    assert_eq!(factory.opens().len(), 1);
    assert!(factory.frames().is_empty());
    assert_eq!(factory.open_connections(), 0);
    assert_quiet(&events);
}

/// Every event names the session that produced it.
#[test]
fn events_carry_their_session() {
    let factory = ScriptedFactory::new();
    factory.push_reply(Reply::Silent);
    let (worker, events) = worker_for(&factory);

    let first = worker.start("COM7", BaudRate::B9600).unwrap();
    assert_eq!(
        events.recv_timeout(EVENT_TIMEOUT).unwrap(),
        SessionEvent {
            session: first,
            event: WorkerEvent::Error(PanelError::ReadTimeout),
        }
    );

    let second = worker.start("COM7", BaudRate::B9600).unwrap();
    assert_ne!(first, second);
    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap().session, second);
}

// ---------------------------------------------------------------------------
// Failures: exactly one Error per session, port always released
// ---------------------------------------------------------------------------

fn expect_single_error(factory: &ScriptedFactory, reply: Reply) -> PanelError {
    factory.push_reply(reply);
    let (worker, events) = worker_for(factory);
    worker.start("COM7", BaudRate::B9600);

    let error = match next_event(&events) {
        WorkerEvent::Error(e) => e,
        other => panic!("expected an error, got {other:?}"),
    };
    // Emitted only once the session is already over
    assert_eq!(worker.state(), SessionState::Idle);
    assert_eq!(factory.open_connections(), 0);
    assert_quiet(&events);
    error
}

#[test]
fn stalled_write_reports_write_timeout_once() {
    let factory = ScriptedFactory::new();
    let error = expect_single_error(&factory, Reply::StallWrite);
    assert_eq!(error, PanelError::WriteTimeout);
    assert_eq!(error.to_string(), "Wait write request timeout");
}

#[test]
fn silent_device_reports_read_timeout_once() {
    let factory = ScriptedFactory::new();
    let error = expect_single_error(&factory, Reply::Silent);
    assert_eq!(error, PanelError::ReadTimeout);
}

#[test]
fn three_byte_reply_reports_size_mismatch_once() {
    let factory = ScriptedFactory::new();
    let error = expect_single_error(&factory, Reply::Raw(vec![0x01, 0x02, 0x03]));
    assert_eq!(error, PanelError::SizeMismatch { len: 3 });
    assert_eq!(
        error.to_string(),
        "Unexpected response size: received 3 bytes, expected 2"
    );
}

#[test]
fn short_reply_reports_size_mismatch() {
    let factory = ScriptedFactory::new();
    let error = expect_single_error(&factory, Reply::Raw(vec![0x01]));
    assert_eq!(error, PanelError::SizeMismatch { len: 1 });
}

#[test]
fn driver_failure_ends_session_with_serial_error() {
    let factory = ScriptedFactory::new();
    let error = expect_single_error(&factory, Reply::Fail("cable unplugged".into()));
    assert!(matches!(error, PanelError::Serial(ref msg) if msg.contains("cable unplugged")));
}

#[test]
fn open_failure_reports_connection_error_once() {
    let factory = ScriptedFactory::new();
    factory.fail_open("permission denied");
    let (worker, events) = worker_for(&factory);

    worker.start("COM9", BaudRate::B9600);
    match next_event(&events) {
        WorkerEvent::Error(PanelError::ConnectionOpen { port, reason }) => {
            assert_eq!(port, "COM9");
            assert!(reason.contains("permission denied"));
        }
        other => panic!("expected ConnectionOpen, got {other:?}"),
    }
    assert_eq!(worker.state(), SessionState::Idle);
    assert!(factory.frames().is_empty());
    assert_quiet(&events);
}

/// After an error the same worker can be started again.
#[test]
fn worker_restarts_after_error() {
    let factory = ScriptedFactory::new();
    factory.push_reply(Reply::Silent);
    let (worker, events) = worker_for(&factory);

    worker.start("COM7", BaudRate::B9600);
    assert_eq!(next_event(&events), WorkerEvent::Error(PanelError::ReadTimeout));
    // Stop after an error is harmless
    worker.stop();

    worker.submit_request(0x0010);
    worker.start("COM7", BaudRate::B9600);
    assert_eq!(next_event(&events), WorkerEvent::Response(0x0010));
    assert_eq!(factory.opens().len(), 2);
    assert_eq!(factory.open_connections(), 1);
}
