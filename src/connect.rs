//! Connection Manager
//!
//! Turns a resolved endpoint into an open connection, retrying through the
//! failure modes a flaky USB-serial device produces:
//!
//! - permission-class open failures (the OS still holds the device for a
//!   wedged driver) trigger a driver bounce and an immediate retry;
//! - not-found/transient failures wait a fixed interval and retry the same
//!   endpoint, without re-resolving;
//! - anything else is fatal and goes back to the operator.
//!
//! The retry policy is injectable; the shipped default matches the
//! reference behavior of a 5 second wait with no attempt cap.

use std::time::Duration;

use serialport::ErrorKind;
use tracing::{info, warn};

use crate::bridge::SerialConnection;
use crate::driver::{self, DriverControl};
use crate::{Error, Result};

/// Serial open timeout; also bounds individual reads on the open port
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Classification of a failed open attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Device present but claimed/blocked at the OS level
    Permission,
    /// Device absent, busy, or otherwise expected to come back
    Transient,
    /// Retrying cannot help (e.g. the endpoint itself is invalid)
    Fatal,
}

/// Classify a serial open error into a recovery action
pub fn classify(err: &serialport::Error) -> FailureKind {
    match err.kind() {
        ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => FailureKind::Permission,
        // Windows surfaces a claimed port as an unknown/IO error whose text
        // mentions access denial
        ErrorKind::Unknown | ErrorKind::Io(_)
            if err.to_string().contains("PermissionError")
                || err.to_string().contains("Access is denied")
                || err.to_string().contains("Permission denied") =>
        {
            FailureKind::Permission
        }
        ErrorKind::NoDevice | ErrorKind::Unknown | ErrorKind::Io(_) => FailureKind::Transient,
        ErrorKind::InvalidInput => FailureKind::Fatal,
    }
}

/// Retry behavior for the open loop
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait between attempts after a transient failure
    pub retry_delay: Duration,
    /// `None` retries indefinitely (reference behavior)
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retry_delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Opens an endpoint into some connection type
///
/// Abstracted so the retry machine can be exercised without hardware.
pub trait PortOpener {
    type Conn;
    fn open(&mut self, endpoint: &str, baud_rate: u32)
        -> std::result::Result<Self::Conn, serialport::Error>;
}

/// Opener backed by the host serial stack
pub struct SystemOpener;

impl PortOpener for SystemOpener {
    type Conn = SerialConnection;

    fn open(
        &mut self,
        endpoint: &str,
        baud_rate: u32,
    ) -> std::result::Result<SerialConnection, serialport::Error> {
        let port = serialport::new(endpoint, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(SerialConnection::new(port))
    }
}

/// Owns the open/retry state machine
pub struct ConnectionManager<O, D> {
    opener: O,
    driver: D,
    driver_id: String,
    policy: RetryPolicy,
}

impl<O: PortOpener, D: DriverControl> ConnectionManager<O, D> {
    pub fn new(opener: O, driver: D, driver_id: String, policy: RetryPolicy) -> Self {
        ConnectionManager {
            opener,
            driver,
            driver_id,
            policy,
        }
    }

    /// Open `endpoint`, retrying through recoverable failures
    ///
    /// Returns the live connection on success. Permission failures bounce
    /// the driver and retry immediately; transient failures wait
    /// `retry_delay` and retry the same endpoint. Fatal classifications and
    /// an exhausted attempt bound surface as [`Error::Fatal`].
    pub async fn connect(&mut self, endpoint: &str, baud_rate: u32) -> Result<O::Conn> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.opener.open(endpoint, baud_rate) {
                Ok(conn) => {
                    info!("Serial port {endpoint} opened at {baud_rate} baud");
                    return Ok(conn);
                }
                Err(err) => {
                    warn!("Error opening serial port {endpoint}: {err}");
                    match classify(&err) {
                        FailureKind::Permission => {
                            warn!("Permission error, restarting the serial driver");
                            driver::recover(&self.driver, &self.driver_id)?;
                        }
                        FailureKind::Transient => {
                            warn!(
                                "Serial port not available, retrying in {:?}",
                                self.policy.retry_delay
                            );
                            tokio::time::sleep(self.policy.retry_delay).await;
                        }
                        FailureKind::Fatal => {
                            return Err(Error::fatal(
                                format!("Unexpected error opening serial port {endpoint}: {err}"),
                                "Check the serialPort and baudRate values in the config file",
                            ));
                        }
                    }
                }
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(Error::fatal(
                        format!("Could not open serial port {endpoint} after {attempts} attempts"),
                        "Check the device connection, then restart ser2osc",
                    ));
                }
            }
        }
    }
}
