//! Startup context resolution
//!
//! The config file and the driver helper both live next to the executable,
//! named after it. That location is resolved once here and passed down
//! explicitly instead of being re-derived from process globals.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name of the driver-control helper expected next to the executable
#[cfg(windows)]
pub const DRIVER_HELPER: &str = "devcon.exe";
#[cfg(not(windows))]
pub const DRIVER_HELPER: &str = "devcon";

/// Where this process lives: directory and file stem of the executable
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub exe_dir: PathBuf,
    pub exe_stem: String,
}

impl StartupContext {
    /// Resolve the context from the running executable's path
    pub fn detect() -> Result<Self> {
        let exe = std::env::current_exe()?;
        Self::from_exe_path(&exe)
    }

    /// Resolve the context from an explicit executable path
    pub fn from_exe_path(exe: &Path) -> Result<Self> {
        let exe_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Config(format!("executable path has no parent: {exe:?}")))?;
        let exe_stem = exe
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config(format!("executable path has no file stem: {exe:?}")))?
            .to_string();
        Ok(StartupContext { exe_dir, exe_stem })
    }

    /// Config file path: `<exe_dir>/<exe_stem>.json`
    pub fn config_path(&self) -> PathBuf {
        self.exe_dir.join(format!("{}.json", self.exe_stem))
    }

    /// Driver helper path: `<exe_dir>/devcon(.exe)`
    pub fn helper_path(&self) -> PathBuf {
        self.exe_dir.join(DRIVER_HELPER)
    }
}
