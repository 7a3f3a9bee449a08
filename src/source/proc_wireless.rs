//! Linux link-quality source backed by `/proc/net/wireless`.
//!
//! The file has two header lines followed by one row per wireless interface:
//!
//! ```text
//!  wlan0: 0000   54.  -56.  -256        0      0      0      0     12        0
//! ```
//!
//! The third column is the link quality on the driver's 0..=70 scale.

use crate::source::types::{SignalSource, SourceError};
use std::path::PathBuf;

/// Full-scale link quality reported by most drivers.
const LINK_QUALITY_MAX: f64 = 70.0;

/// Reads link quality from the kernel's wireless statistics.
#[derive(Debug, Clone)]
pub struct ProcWirelessSource {
    interface: Option<String>,
    path: PathBuf,
}

impl ProcWirelessSource {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            interface,
            path: PathBuf::from("/proc/net/wireless"),
        }
    }

    /// Read from a different file (used for testing).
    pub fn with_path(interface: Option<String>, path: PathBuf) -> Self {
        Self { interface, path }
    }
}

impl SignalSource for ProcWirelessSource {
    fn read(&mut self) -> Result<u8, SourceError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Command(format!("{}: {e}", self.path.display())))?;
        parse_wireless(&content, self.interface.as_deref())
    }

    fn describe(&self) -> String {
        match &self.interface {
            Some(name) => format!("{} ({name})", self.path.display()),
            None => format!("{} (first interface)", self.path.display()),
        }
    }
}

/// Extract a percentage from `/proc/net/wireless` content.
pub fn parse_wireless(content: &str, interface: Option<&str>) -> Result<u8, SourceError> {
    let mut rows = content.lines().skip(2).filter_map(|line| {
        let (name, rest) = line.split_once(':')?;
        Some((name.trim(), rest))
    });

    let row = match interface {
        Some(wanted) => rows
            .find(|(name, _)| *name == wanted)
            .ok_or_else(|| SourceError::InterfaceNotFound(wanted.to_string()))?,
        None => rows.next().ok_or(SourceError::NotConnected)?,
    };

    let quality = row
        .1
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| SourceError::Parse(format!("short row for {}", row.0)))?;
    let quality: f64 = quality
        .trim_end_matches('.')
        .parse()
        .map_err(|_| SourceError::Parse(format!("bad link quality {quality:?}")))?;

    let percent = (quality / LINK_QUALITY_MAX * 100.0).round().clamp(0.0, 100.0);
    Ok(percent as u8)
}
