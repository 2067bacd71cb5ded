//! Integration tests for the acquisition loop.
//!
//! These tests feed lines into the loop and receive the resulting OSC
//! packets on a real localhost UDP socket.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use serial2osc_bridge::{AcquisitionLoop, BridgeError, MessageSink, OscSender, SendError};
use serial2osc_core::{Coercion, Mode, OutboundMessage, RuntimeConfig, Schema, Value};
use serial2osc_protocol::decode_message;

const SCHEMA: &str = r#"{ "a": ["/pot", "F", 3], "t": ["/temp", "I", 1] }"#;

fn acquisition(mode: Mode) -> AcquisitionLoop {
    let schema = Schema::from_json_str(SCHEMA).unwrap();
    let config = RuntimeConfig::new(0, mode).with_coercion(Coercion::Strict);
    AcquisitionLoop::new(Arc::new(schema), Arc::new(config))
}

/// Bind a receiver and a sender addressed to it.
async fn udp_pair() -> (UdpSocket, OscSender) {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let sender = OscSender::bind(receiver.local_addr().unwrap())
        .await
        .unwrap();
    (receiver, sender)
}

fn lines(input: &[&str]) -> Vec<io::Result<String>> {
    input.iter().map(|l| Ok(l.to_string())).collect()
}

/// Wait for one OSC packet with timeout.
async fn recv_message(receiver: &UdpSocket) -> Result<OutboundMessage, &'static str> {
    let mut buf = [0u8; 1024];
    match timeout(Duration::from_secs(5), receiver.recv(&mut buf)).await {
        Ok(Ok(n)) => decode_message(&buf[..n]).map_err(|_| "Malformed packet"),
        Ok(Err(_)) => Err("Socket error"),
        Err(_) => Err("Timeout"),
    }
}

/// Assert nothing else arrives shortly.
async fn assert_no_message(receiver: &UdpSocket) {
    let mut buf = [0u8; 1024];
    let result = timeout(Duration::from_millis(100), receiver.recv(&mut buf)).await;
    assert!(result.is_err(), "Unexpected packet received");
}

#[tokio::test]
async fn test_direct_mode_end_to_end() {
    let (receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::DirectAddress);

    let input = stream::iter(lines(&["a1.5,2.5,3.5\r", "t37"]));
    let result = acq.run(input, &sender, CancellationToken::new()).await;
    assert!(matches!(result, Err(BridgeError::EndOfStream)));

    let pot = recv_message(&receiver).await.expect("Should receive /pot");
    assert_eq!(pot.address, "/pot");
    assert_eq!(
        pot.args,
        vec![Value::Int(0), Value::Float(1.5), Value::Float(2.5), Value::Float(3.5)]
    );

    let temp = recv_message(&receiver).await.expect("Should receive /temp");
    assert_eq!(temp.address, "/temp");
    assert_eq!(temp.args, vec![Value::Int(0), Value::Int(37)]);
}

#[tokio::test]
async fn test_indexed_mode_end_to_end() {
    let (receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::IndexedBuffer);

    let input = stream::iter(lines(&["a1.5,2.5,3.5,9.9", "t37"]));
    let result = acq.run(input, &sender, CancellationToken::new()).await;
    assert!(matches!(result, Err(BridgeError::EndOfStream)));

    let pot = recv_message(&receiver).await.unwrap();
    assert_eq!(pot.address, "/c_setn");
    assert_eq!(
        pot.args,
        vec![
            Value::Int(0),
            Value::Int(3),
            Value::Float(1.5),
            Value::Float(2.5),
            Value::Float(3.5)
        ]
    );

    let temp = recv_message(&receiver).await.unwrap();
    assert_eq!(temp.args, vec![Value::Int(3), Value::Int(1), Value::Int(37)]);
}

#[tokio::test]
async fn test_bad_lines_are_dropped_and_loop_continues() {
    let (receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::IndexedBuffer);
    let stats = acq.stats();

    let input = stream::iter(lines(&[
        "",
        "x1,2,3",
        "a1.0",
        "tabc",
        "\u{fffd}garbage",
        "t42",
    ]));
    let result = acq.run(input, &sender, CancellationToken::new()).await;
    assert!(matches!(result, Err(BridgeError::EndOfStream)));

    let msg = recv_message(&receiver).await.unwrap();
    assert_eq!(msg.args, vec![Value::Int(3), Value::Int(1), Value::Int(42)]);
    assert_no_message(&receiver).await;

    let snap = stats.snapshot();
    assert_eq!(snap.lines_read, 6);
    assert_eq!(snap.messages_sent, 1);
    assert_eq!(snap.dropped_unknown, 3);
    assert_eq!(snap.dropped_invalid, 2);
    assert_eq!(snap.send_failures, 0);
}

#[tokio::test]
async fn test_read_error_is_fatal() {
    let (_receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::DirectAddress);

    let input = stream::iter(vec![
        Ok("t1".to_string()),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone")),
        Ok("t2".to_string()),
    ]);
    let result = acq.run(input, &sender, CancellationToken::new()).await;

    match result {
        Err(BridgeError::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("Expected Read error, got {:?}", other),
    }
    assert_eq!(acq.stats().snapshot().lines_read, 1);
}

#[tokio::test]
async fn test_cancellation_stops_blocked_read() {
    let (receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::DirectAddress);
    let cancel = CancellationToken::new();

    // one line, then a read that never completes
    let input = stream::iter(lines(&["t5"])).chain(stream::pending());

    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move { acq.run(input, &sender, task_cancel).await });

    let msg = recv_message(&receiver).await.unwrap();
    assert_eq!(msg.args, vec![Value::Int(0), Value::Int(5)]);

    cancel.cancel();
    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("Loop should stop after cancel")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (_receiver, sender) = udp_pair().await;
    let acq = acquisition(Mode::DirectAddress);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let input = stream::iter(lines(&["t5"]));
    assert!(acq.run(input, &sender, cancel).await.is_ok());
    assert_eq!(acq.stats().snapshot().lines_read, 0);
}

/// Sink that fails or succeeds according to a fixed script.
struct ScriptedSink {
    outcomes: Mutex<VecDeque<bool>>,
    delivered: Mutex<Vec<OutboundMessage>>,
}

impl ScriptedSink {
    fn new(outcomes: &[bool]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

impl MessageSink for ScriptedSink {
    fn target(&self) -> SocketAddr {
        "127.0.0.1:57120".parse().unwrap()
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), SendError> {
        let ok = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            self.delivered.lock().unwrap().push(msg.clone());
            Ok(())
        } else {
            Err(SendError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "send refused",
            )))
        }
    }
}

fn numbered_lines(count: usize) -> Vec<io::Result<String>> {
    (0..count).map(|i| Ok(format!("t{}", i))).collect()
}

#[tokio::test]
async fn test_consecutive_send_failures_are_fatal() {
    let acq = acquisition(Mode::DirectAddress).with_max_send_failures(3);
    let stats = acq.stats();
    // two failures, a success that resets the count, then three in a row
    let sink = ScriptedSink::new(&[false, false, true, false, false, false, true]);

    let input = stream::iter(numbered_lines(10));
    let result = acq.run(input, &sink, CancellationToken::new()).await;

    match result {
        Err(BridgeError::SendFailed { failures, source }) => {
            assert_eq!(failures, 3);
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("Expected SendFailed, got {:?}", other),
    }

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].args, vec![Value::Int(0), Value::Int(2)]);

    let snap = stats.snapshot();
    assert_eq!(snap.lines_read, 6);
    assert_eq!(snap.messages_sent, 1);
    assert_eq!(snap.send_failures, 5);
}

#[tokio::test]
async fn test_interleaved_send_failures_stay_below_limit() {
    let acq = acquisition(Mode::DirectAddress).with_max_send_failures(2);
    let sink = ScriptedSink::new(&[false, true, false, true, false, true]);

    let input = stream::iter(numbered_lines(6));
    let result = acq.run(input, &sink, CancellationToken::new()).await;
    assert!(matches!(result, Err(BridgeError::EndOfStream)));

    let snap = acq.stats().snapshot();
    assert_eq!(snap.messages_sent, 3);
    assert_eq!(snap.send_failures, 3);
}

#[tokio::test]
async fn test_closed_receiver_port_does_not_fail_sends() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = receiver.local_addr().unwrap();
    drop(receiver);

    let sender = OscSender::bind(target).await.unwrap();
    let acq = acquisition(Mode::DirectAddress).with_max_send_failures(3);

    // pace the lines so ICMP replies arrive between sends
    let input = stream::iter(numbered_lines(40)).then(|line| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        line
    });
    let result = acq.run(Box::pin(input), &sender, CancellationToken::new()).await;
    assert!(matches!(result, Err(BridgeError::EndOfStream)));

    let snap = acq.stats().snapshot();
    assert_eq!(snap.messages_sent, 40);
    assert_eq!(snap.send_failures, 0);
}
