//! Port Resolver
//!
//! Maps the configured symbolic port to a concrete endpoint identifier.
//! An explicit `serialPort` is returned verbatim without checking that the
//! device exists; that is deferred to the open attempt. `"auto"` scans the
//! host's serial endpoints and takes the first whose description contains
//! `serialName`.

use serialport::SerialPortType;
use tracing::{debug, info};

use crate::config::{Config, AUTO_PORT};
use crate::{Error, Result};

/// One connectable endpoint as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Endpoint identifier usable for opening (e.g. `COM3`, `/dev/ttyUSB0`)
    pub device: String,
    /// Human-readable description used for substring matching
    pub description: String,
}

/// Source of serial endpoint candidates
pub trait PortScanner {
    fn scan(&self) -> Result<Vec<PortCandidate>>;
}

/// Scanner backed by the host's real serial enumeration
pub struct SystemScanner;

impl PortScanner for SystemScanner {
    fn scan(&self) -> Result<Vec<PortCandidate>> {
        let ports = serialport::available_ports()?;
        Ok(ports
            .into_iter()
            .map(|info| {
                let description = describe(&info.port_type);
                debug!("Found serial port {} ({description})", info.port_name);
                PortCandidate {
                    device: info.port_name,
                    description,
                }
            })
            .collect())
    }
}

/// Best human-readable description the host offers for a port
fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| "USB serial device".to_string()),
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "Unknown serial port".to_string(),
    }
}

/// Resolve the configured port to a concrete endpoint identifier
pub fn resolve_port<S: PortScanner>(config: &Config, scanner: &S) -> Result<String> {
    if config.serial_port != AUTO_PORT {
        return Ok(config.serial_port.clone());
    }

    let candidates = scanner.scan()?;
    match find_port(&candidates, &config.serial_name) {
        Some(candidate) => {
            info!(
                "Auto-discovered serial port {} ({})",
                candidate.device, candidate.description
            );
            Ok(candidate.device.clone())
        }
        None => Err(Error::fatal(
            format!(
                "Could not find a serial port whose description contains \"{}\" ({} port(s) scanned)",
                config.serial_name,
                candidates.len()
            ),
            "Check that the device is plugged in and its driver is installed, \
             or set serialPort to an explicit endpoint in the config file",
        )),
    }
}

/// First candidate whose description contains `serial_name` (case-sensitive)
fn find_port<'a>(candidates: &'a [PortCandidate], serial_name: &str) -> Option<&'a PortCandidate> {
    candidates
        .iter()
        .find(|c| c.description.contains(serial_name))
}
