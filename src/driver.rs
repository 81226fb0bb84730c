//! Driver Recovery Controller
//!
//! When the OS refuses to hand over the serial device (typically because a
//! wedged driver instance still claims it), the device driver is bounced:
//! disabled then re-enabled through an external helper (`devcon` on
//! Windows). The helper's exit codes are logged but not acted on; success
//! is judged by whether the next open attempt goes through.

use std::path::PathBuf;
use std::process::Command;

use tracing::{info, warn};

use crate::{Error, Result};

/// Capability to disable/enable a device driver by hardware id
pub trait DriverControl {
    fn disable(&self, driver_id: &str) -> Result<()>;
    fn enable(&self, driver_id: &str) -> Result<()>;
}

/// Real driver control via the devcon helper executable
pub struct DevconControl {
    helper: PathBuf,
}

impl DevconControl {
    pub fn new(helper: PathBuf) -> Self {
        DevconControl { helper }
    }

    fn run(&self, verb: &str, driver_id: &str) -> Result<()> {
        if !self.helper.exists() {
            return Err(Error::fatal(
                format!(
                    "Driver helper not found at {} — cannot recover the serial driver",
                    self.helper.display()
                ),
                "Place the devcon executable next to ser2osc and restart",
            ));
        }

        let status = Command::new(&self.helper).arg(verb).arg(driver_id).status()?;
        if status.success() {
            info!("{} {} {driver_id}: ok", self.helper.display(), verb);
        } else {
            // Best effort: a failed disable/enable is only visible here
            warn!("{} {} {driver_id}: exited with {status}", self.helper.display(), verb);
        }
        Ok(())
    }
}

impl DriverControl for DevconControl {
    fn disable(&self, driver_id: &str) -> Result<()> {
        self.run("disable", driver_id)
    }

    fn enable(&self, driver_id: &str) -> Result<()> {
        self.run("enable", driver_id)
    }
}

impl<D: DriverControl + ?Sized> DriverControl for &D {
    fn disable(&self, driver_id: &str) -> Result<()> {
        (**self).disable(driver_id)
    }

    fn enable(&self, driver_id: &str) -> Result<()> {
        (**self).enable(driver_id)
    }
}

/// Bounce the driver: disable, then re-enable
///
/// This briefly removes the device from the host, so the caller should
/// expect the following open attempt to take noticeably longer.
pub fn recover<D: DriverControl>(driver: &D, driver_id: &str) -> Result<()> {
    info!("Restarting device driver {driver_id}");
    driver.disable(driver_id)?;
    driver.enable(driver_id)?;
    Ok(())
}
