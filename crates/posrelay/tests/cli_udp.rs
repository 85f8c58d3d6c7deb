#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader};
use std::net::UdpSocket;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn free_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("ephemeral bind should succeed");
    socket
        .local_addr()
        .expect("bound socket should have an address")
        .port()
}

#[test]
fn send_reaches_listen() {
    let addr = format!("127.0.0.1:{}", free_udp_port());

    let mut listener = Command::new(env!("CARGO_BIN_EXE_posrelay"))
        .args(["--log-level", "error", "--format", "json", "listen"])
        .args(["--bind", &addr, "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let stdout = listener.stdout.take().expect("stdout should be piped");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        if BufReader::new(stdout).read_line(&mut line).is_ok() {
            let _ = tx.send(line);
        }
    });

    // The listener may not be bound yet; keep sending until it prints.
    let deadline = Instant::now() + Duration::from_secs(5);
    let line = loop {
        let status = Command::new(env!("CARGO_BIN_EXE_posrelay"))
            .args(["--log-level", "error", "send", "--endpoint", &addr])
            .args(["--sysid", "2", "--lat", "40.0", "--lon", "-74.0"])
            .status()
            .expect("send should run");
        assert!(status.success());

        if let Ok(line) = rx.recv_timeout(Duration::from_millis(200)) {
            break line;
        }
        if Instant::now() >= deadline {
            let _ = listener.kill();
            panic!("listen printed nothing within 5s");
        }
    };

    let payload: serde_json::Value =
        serde_json::from_str(line.trim()).expect("listen should emit json");
    assert_eq!(payload["sysid"], 2);
    assert_eq!(payload["lat"].as_f64(), Some(40.0));
    assert_eq!(payload["lon"].as_f64(), Some(-74.0));
    assert!(payload["timestamp_ms"].as_u64().unwrap_or(0) > 0);

    let status = listener.wait().expect("listen should exit after --count");
    assert!(status.success());
}

#[test]
fn send_to_unresolvable_endpoint_is_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_posrelay"))
        .args(["send", "--endpoint", "not an endpoint", "--lat", "1", "--lon", "2"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}
