//! Common test utilities for ssc integration tests
//!
//! This module provides reusable test helpers for:
//! - A fake guiding service that records dither commands
//! - Parsing exposure log lines back into their fields
//! - Building controllers around the mock shutter line

#![allow(dead_code)] // Not every test binary uses every helper

use chrono::{DateTime, TimeZone, Utc};
use ssc::config::{ExposureConfig, GuiderAddress};
use ssc::controller::SequenceController;
use ssc::exposure_log::ExposureLogger;
use ssc::hardware::{MockLineProbe, MockShutterLine};
use ssc::progress::RecordingProgress;
use ssc::timing::SequenceClock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Mutex, Notify};

/// Fixed wall-clock anchor at midday UTC, so a test run never straddles two log files.
pub fn noon_clock() -> SequenceClock {
    SequenceClock::anchored_at(
        Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0)
            .single()
            .expect("valid date"),
    )
}

/// Dither command received by the fake guider, with the wall time of its ack.
#[derive(Debug, Clone, Copy)]
pub struct DitherRequest {
    pub command: u8,
    pub acked_at: DateTime<Utc>,
}

/// Guiding service stand-in: acknowledges every command after `ack_delay`.
pub struct FakeGuider {
    pub address: GuiderAddress,
    pub requests: Arc<Mutex<Vec<DitherRequest>>>,
    /// Notified as soon as a command byte arrives, before it is acknowledged.
    pub received: Arc<Notify>,
}

impl FakeGuider {
    pub async fn start(clock: SequenceClock, ack_delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        let received = Arc::new(Notify::new());
        let on_command = received.clone();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut cmd = [0u8; 1];
            while socket.read_exact(&mut cmd).await.is_ok() {
                on_command.notify_one();
                tokio::time::sleep(ack_delay).await;
                if socket.write_all(&[0]).await.is_err() {
                    break;
                }
                log.lock().await.push(DitherRequest {
                    command: cmd[0],
                    acked_at: clock.now(),
                });
            }
        });

        Self {
            address: GuiderAddress {
                host: "127.0.0.1".to_string(),
                port,
            },
            requests,
            received,
        }
    }
}

/// Guiding service whose accept queue is full: new connections never complete.
pub struct StalledGuider {
    pub address: GuiderAddress,
    _listener: TcpListener,
    _queued: Vec<TcpStream>,
}

impl StalledGuider {
    /// Needs real time: the queue is filled by connects that are given up on.
    pub async fn start() -> Self {
        let socket = TcpSocket::new_v4().expect("socket");
        socket
            .bind("127.0.0.1:0".parse().expect("loopback"))
            .expect("bind");
        let listener = socket.listen(0).expect("listen");
        let addr = listener.local_addr().expect("local addr");

        let mut queued = Vec::new();
        for _ in 0..4 {
            let attempt =
                tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await;
            if let Ok(Ok(stream)) = attempt {
                queued.push(stream);
            }
        }

        Self {
            address: GuiderAddress {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
            },
            _listener: listener,
            _queued: queued,
        }
    }
}

/// Fields of one exposure log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub label: String,
    pub clock: String,
    pub rounded_seconds: u64,
    pub start: String,
    pub end: String,
}

impl LogLine {
    pub fn parse(line: &str) -> Self {
        let fields: Vec<&str> = line.split(", ").collect();
        assert_eq!(fields.len(), 5, "malformed log line: {:?}", line);
        Self {
            label: fields[0].to_string(),
            clock: fields[1].to_string(),
            rounded_seconds: fields[2]
                .trim_end_matches(" seconds")
                .parse()
                .expect("seconds"),
            start: fields[3].to_string(),
            end: fields[4].to_string(),
        }
    }

    /// Start as fractional seconds since the epoch.
    pub fn start_secs(&self) -> f64 {
        self.start.parse().expect("start timestamp")
    }

    /// End as fractional seconds since the epoch.
    pub fn end_secs(&self) -> f64 {
        self.end.parse().expect("end timestamp")
    }
}

/// All log lines in every file of `dir`.
pub fn read_log_lines(dir: &Path) -> Vec<LogLine> {
    let mut lines = Vec::new();
    for entry in std::fs::read_dir(dir).expect("log dir") {
        let contents = std::fs::read_to_string(entry.expect("entry").path()).expect("log file");
        lines.extend(contents.lines().map(LogLine::parse));
    }
    lines
}

/// Controller on a mock line with a recording progress sink.
pub fn mock_controller(
    config: ExposureConfig,
    logger: ExposureLogger,
    clock: SequenceClock,
) -> (SequenceController, MockLineProbe) {
    let (line, probe) = MockShutterLine::new();
    let controller = SequenceController::new(
        config,
        Box::new(line),
        logger,
        Box::new(RecordingProgress::new()),
    )
    .with_clock(clock);
    (controller, probe)
}
