//! # ser2osc
//!
//! Serial-to-OSC bridge: reads numeric event codes from a serial device,
//! line by line, and forwards each as an OSC message over UDP.
//!
//! **Architecture:** Config Provider → Port Resolver → Connection Manager
//! (with Driver Recovery on permission failures) → Event Loop → OSC sender.
//! Resolution, opening, and the read loop run sequentially on a single
//! logical task; the only suspension points are the retry wait while
//! opening and the poll wait while reading.

pub mod bridge;
pub mod config;
pub mod connect;
pub mod driver;
pub mod error;
pub mod osc;
pub mod ports;
pub mod startup;

pub use error::{Error, Result};
