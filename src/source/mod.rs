//! Link-quality acquisition.
//!
//! The detection core only ever sees a [`SignalSource`]: something that
//! produces a percentage or fails. Platform sources shell out to (or read)
//! whatever the operating system exposes; [`ReplaySource`] feeds recordings.

pub mod netsh;
pub mod proc_wireless;
pub mod replay;
pub mod types;

pub use netsh::NetshSource;
pub use proc_wireless::ProcWirelessSource;
pub use replay::ReplaySource;
pub use types::{RawSample, SignalSource, SourceError};

/// Platform-default source type alias
#[cfg(target_os = "windows")]
pub type DefaultSource = NetshSource;

/// Platform-default source type alias
#[cfg(target_os = "linux")]
pub type DefaultSource = ProcWirelessSource;

/// Platform-default source type alias
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub type DefaultSource = UnsupportedSource;

/// Create the platform-default source for an optional interface name.
pub fn default_source(interface: Option<String>) -> DefaultSource {
    DefaultSource::new(interface)
}

/// Placeholder for platforms without a link-quality query.
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
#[derive(Debug, Clone, Default)]
pub struct UnsupportedSource {
    _interface: Option<String>,
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
impl UnsupportedSource {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            _interface: interface,
        }
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
impl SignalSource for UnsupportedSource {
    fn read(&mut self) -> Result<u8, SourceError> {
        Err(SourceError::Command(
            "link quality is not available on this platform".to_string(),
        ))
    }

    fn describe(&self) -> String {
        "unsupported platform".to_string()
    }
}
