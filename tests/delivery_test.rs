//! Live transport tests driving real subprocesses through the delivery pipe.
//!
//! Tests cover:
//! - Exact wire bytes handed to the transport
//! - Worker-level delivery end to end
//! - Exit-status, spawn, and broken-pipe failure mapping

#![cfg(unix)]

use std::fs;
use std::path::PathBuf;

use piecework::core::{
    QueueEntry, QueueState, WorkType, WorkerFunction, WorkerOutcome, TRACK_NORMAL,
};
use piecework::infra::{InMemorySource, OutboundMessage};
use piecework::workers::{DeliveryError, DeliveryWorker, MailTransport};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn sample_message() -> OutboundMessage {
    OutboundMessage {
        from: "list@groups.example".into(),
        to: "member@example.net".into(),
        bcc: Some("archive@groups.example".into()),
        reply_to: "list@groups.example".into(),
        errors_to: "owner@groups.example".into(),
        mailer: "piecework test".into(),
        content: "Subject: greetings\r\n\r\nhello from the pipe\r\n".into(),
    }
}

fn capture_path(tag: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("piecework-delivery-{}-{}", tag, std::process::id()));
    path
}

/// Transport that copies stdin into `path`, standing in for sendmail.
fn capture_transport(path: &PathBuf) -> MailTransport {
    MailTransport::custom(
        "sh",
        vec!["-c".into(), format!("cat > '{}'", path.display())],
    )
}

fn delivery_entry(work_item_id: i64) -> QueueEntry {
    QueueEntry {
        id: 1,
        work_item_id,
        work_type: WorkType::OutboundDelivery,
        state: QueueState::Processing,
        owner_id: 1,
        group_id: 1,
        track: TRACK_NORMAL,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_transport_receives_exact_wire_bytes() {
    println!("\n=== test_transport_receives_exact_wire_bytes ===");

    let out = capture_path("wire");
    let transport = capture_transport(&out);

    let message = sample_message();
    let wire = message.to_wire().unwrap();
    transport.deliver(wire.as_bytes()).unwrap();

    let captured = fs::read(&out).unwrap();
    fs::remove_file(&out).ok();
    assert_eq!(captured, wire.as_bytes());

    println!("captured {} bytes", captured.len());
    println!("=== test_transport_receives_exact_wire_bytes PASSED ===\n");
}

#[test]
fn test_delivery_worker_end_to_end() {
    println!("\n=== test_delivery_worker_end_to_end ===");

    let out = capture_path("worker");
    let source = InMemorySource::new();
    let message = sample_message();
    source.put_outbound(42, message.clone());

    let worker = DeliveryWorker::new(source, capture_transport(&out));
    let outcome = worker.execute(&delivery_entry(42));
    assert_eq!(outcome, WorkerOutcome::Success);

    let captured = fs::read(&out).unwrap();
    fs::remove_file(&out).ok();
    assert_eq!(captured, message.to_wire().unwrap().as_bytes());

    println!("=== test_delivery_worker_end_to_end PASSED ===\n");
}

#[test]
fn test_transport_exit_status_is_a_delivery_failure() {
    println!("\n=== test_transport_exit_status_is_a_delivery_failure ===");

    // Drain stdin first so the failure is the exit status, nothing else.
    let transport = MailTransport::custom(
        "sh",
        vec!["-c".into(), "cat > /dev/null; exit 3".into()],
    );
    let err = transport.deliver(b"rejected payload").unwrap_err();
    assert!(matches!(err, DeliveryError::TransportStatus(3)));
    assert_eq!(err.worker_outcome(), WorkerOutcome::TransportExec);

    println!("=== test_transport_exit_status_is_a_delivery_failure PASSED ===\n");
}

#[test]
fn test_missing_transport_binary_is_a_spawn_failure() {
    println!("\n=== test_missing_transport_binary_is_a_spawn_failure ===");

    let transport = MailTransport::custom("/nonexistent/piecework-mailer", vec![]);
    let err = transport.deliver(b"never sent").unwrap_err();
    assert!(matches!(err, DeliveryError::Spawn(_)));
    assert_eq!(err.worker_outcome(), WorkerOutcome::SpawnFailed);

    println!("=== test_missing_transport_binary_is_a_spawn_failure PASSED ===\n");
}

#[test]
fn test_closed_stdin_surfaces_as_pipe_write() {
    println!("\n=== test_closed_stdin_surfaces_as_pipe_write ===");

    // `true` exits without reading, so a payload larger than the pipe
    // buffer cannot be written in full.
    let transport = MailTransport::custom("true", vec![]);
    let payload = vec![b'x'; 1 << 20];
    let err = transport.deliver(&payload).unwrap_err();
    assert!(matches!(err, DeliveryError::PipeWrite(_)));
    assert_eq!(err.worker_outcome(), WorkerOutcome::PipeWrite);

    println!("=== test_closed_stdin_surfaces_as_pipe_write PASSED ===\n");
}
