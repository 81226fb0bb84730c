//! Event Loop
//!
//! Polls the open connection for newline-delimited records, decodes numeric
//! event codes, and dispatches one OSC message per code. The loop is
//! cooperative: with no data pending it sleeps briefly instead of blocking
//! in a read, and operator cancellation is observed at the top of every
//! iteration. Connection loss ends the loop; reconnection is the caller's
//! decision, never made here.

use std::io::Read;
use std::time::Duration;

use serialport::SerialPort;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::osc::OscDispatch;
use crate::Result;

/// Pause between polls when no serial data is pending
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the event loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Operator-requested cancellation
    Interrupted,
    /// The connection reported itself closed or failed a read
    Closed,
}

/// A live, pollable line-oriented connection
pub trait Connection {
    fn is_open(&self) -> bool;
    /// One complete line if available, `None` if no data is pending
    fn poll_line(&mut self) -> Result<Option<String>>;
}

/// Real serial connection with line reassembly
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialConnection {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialConnection {
            port,
            pending: Vec::new(),
        }
    }
}

impl Connection for SerialConnection {
    fn is_open(&self) -> bool {
        // The host gives no direct liveness signal; a dead port surfaces as
        // a poll_line error instead
        true
    }

    fn poll_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = extract_line(&mut self.pending) {
            return Ok(Some(line));
        }

        let waiting = self.port.bytes_to_read()?;
        if waiting == 0 {
            return Ok(None);
        }

        let mut chunk = vec![0u8; waiting as usize];
        let n = self.port.read(&mut chunk)?;
        self.pending.extend_from_slice(&chunk[..n]);
        Ok(extract_line(&mut self.pending))
    }
}

/// Split one newline-terminated record off the front of `pending`,
/// whitespace-trimmed and lossily decoded
fn extract_line(pending: &mut Vec<u8>) -> Option<String> {
    let newline = pending.iter().position(|&b| b == b'\n')?;
    let record: Vec<u8> = pending.drain(..=newline).collect();
    Some(String::from_utf8_lossy(&record).trim().to_string())
}

/// Forward events from `conn` until cancelled or the connection is lost
///
/// The connection is consumed and dropped on every exit path, so the
/// underlying port is released exactly once.
pub async fn run<C: Connection, S: OscDispatch>(
    mut conn: C,
    addresses: &[String],
    osc: &S,
    cancel: &CancellationToken,
    poll_interval: Duration,
) -> Result<LoopExit> {
    let exit = loop {
        if cancel.is_cancelled() {
            info!("Cancellation requested, leaving read loop");
            break LoopExit::Interrupted;
        }
        if !conn.is_open() {
            info!("Serial connection no longer open, leaving read loop");
            break LoopExit::Closed;
        }

        match conn.poll_line() {
            Ok(Some(line)) => handle_line(&line, addresses, osc),
            Ok(None) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Cancellation requested, leaving read loop");
                        break LoopExit::Interrupted;
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(err) => {
                warn!("Serial read failed, treating connection as lost: {err}");
                break LoopExit::Closed;
            }
        }
    };

    drop(conn);
    Ok(exit)
}

/// Decode one record and dispatch it if it is an in-range event code
fn handle_line<S: OscDispatch>(line: &str, addresses: &[String], osc: &S) {
    info!("Received: {line}");

    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        // Non-numeric chatter from the device is expected and ignored
        debug!("Ignoring non-numeric line");
        return;
    }

    let code: usize = match line.parse() {
        Ok(code) => code,
        Err(_) => {
            warn!("Event code {line} does not fit in an index, skipping");
            return;
        }
    };

    match addresses.get(code) {
        Some(address) => match osc.send(address, 1) {
            Ok(()) => info!("Sent OSC message to {address}"),
            Err(err) => warn!("Failed to send OSC message to {address}: {err}"),
        },
        None => warn!(
            "Event code {code} out of range ({} addresses configured), skipping",
            addresses.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Event {
        Line(&'static str),
        NoData,
        Fail,
    }

    /// Connection driven by a script; reports closed once exhausted
    struct ScriptedConnection {
        events: VecDeque<Event>,
    }

    impl ScriptedConnection {
        fn new(events: Vec<Event>) -> Self {
            ScriptedConnection {
                events: events.into(),
            }
        }
    }

    impl Connection for ScriptedConnection {
        fn is_open(&self) -> bool {
            !self.events.is_empty()
        }

        fn poll_line(&mut self) -> Result<Option<String>> {
            match self.events.pop_front() {
                Some(Event::Line(line)) => Ok(Some(line.to_string())),
                Some(Event::NoData) | None => Ok(None),
                Some(Event::Fail) => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "device went away",
                ))),
            }
        }
    }

    #[derive(Default)]
    struct RecordingDispatch {
        sent: Mutex<Vec<(String, i32)>>,
    }

    impl RecordingDispatch {
        fn sent(&self) -> Vec<(String, i32)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl OscDispatch for RecordingDispatch {
        fn send(&self, address: &str, value: i32) -> Result<()> {
            self.sent.lock().unwrap().push((address.to_string(), value));
            Ok(())
        }
    }

    fn addresses() -> Vec<String> {
        vec![
            "/restart".to_string(),
            "/stop".to_string(),
            "/light".to_string(),
        ]
    }

    fn fast_poll() -> Duration {
        Duration::from_millis(1)
    }

    /// Scenario: line "2" with the 3 default addresses → one message to
    /// /light with value 1.
    #[tokio::test]
    async fn in_range_code_dispatches_to_indexed_address() {
        let conn = ScriptedConnection::new(vec![Event::Line("2")]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();

        let exit = run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Closed);
        assert_eq!(osc.sent(), vec![("/light".to_string(), 1)]);
    }

    /// Scenario: line "9" with 3 addresses → nothing sent, loop keeps going.
    #[tokio::test]
    async fn out_of_range_code_is_skipped_without_terminating() {
        let conn = ScriptedConnection::new(vec![
            Event::Line("9"),
            Event::Line("0"),
        ]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();

        let exit = run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Closed);
        assert_eq!(osc.sent(), vec![("/restart".to_string(), 1)]);
    }

    #[tokio::test]
    async fn non_numeric_lines_never_dispatch() {
        let conn = ScriptedConnection::new(vec![
            Event::Line("ready"),
            Event::Line("-1"),
            Event::Line("1.5"),
            Event::Line("1 2"),
            Event::Line(""),
        ]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();

        run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert!(osc.sent().is_empty());
    }

    #[tokio::test]
    async fn repeated_codes_each_dispatch_once() {
        let conn = ScriptedConnection::new(vec![
            Event::Line("1"),
            Event::NoData,
            Event::Line("1"),
            Event::Line("1"),
        ]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();

        run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert_eq!(osc.sent().len(), 3);
        assert!(osc.sent().iter().all(|(a, v)| a == "/stop" && *v == 1));
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_data() {
        let conn = ScriptedConnection::new(vec![Event::Line("0")]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Interrupted);
        assert!(osc.sent().is_empty());
    }

    #[tokio::test]
    async fn read_failure_exits_as_closed_not_error() {
        let conn = ScriptedConnection::new(vec![Event::Line("0"), Event::Fail]);
        let osc = RecordingDispatch::default();
        let cancel = CancellationToken::new();

        let exit = run(conn, &addresses(), &osc, &cancel, fast_poll())
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::Closed);
        assert_eq!(osc.sent(), vec![("/restart".to_string(), 1)]);
    }

    #[test]
    fn extract_line_trims_and_keeps_remainder() {
        let mut pending = b" 2\r\n17\nrest".to_vec();
        assert_eq!(extract_line(&mut pending), Some("2".to_string()));
        assert_eq!(extract_line(&mut pending), Some("17".to_string()));
        assert_eq!(extract_line(&mut pending), None);
        assert_eq!(pending, b"rest");
    }

    #[test]
    fn extract_line_needs_a_newline() {
        let mut pending = b"12".to_vec();
        assert_eq!(extract_line(&mut pending), None);
        assert_eq!(pending, b"12");
    }
}
