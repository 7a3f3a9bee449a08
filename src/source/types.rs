//! Sample and error types shared by every signal source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One link-quality reading as captured from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Link quality percentage in [0, 100]
    pub value: u8,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

impl RawSample {
    pub fn new(value: u8, timestamp: DateTime<Utc>) -> Self {
        Self {
            value: value.min(100),
            timestamp,
        }
    }
}

/// A source of link-quality readings.
///
/// Implementations never retry internally: a failed read is reported and the
/// sampling loop simply tries again on its next tick.
pub trait SignalSource: Send {
    /// Read the current link quality as a percentage.
    fn read(&mut self) -> Result<u8, SourceError>;

    /// Human-readable description for logs and status output.
    fn describe(&self) -> String;

    /// When the reading just taken (or just failed) happened.
    fn sample_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Whether [`SignalSource::sample_time`] comes from a recording rather
    /// than the system clock. Durations are then measured on recorded time.
    fn is_recorded(&self) -> bool {
        false
    }
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn read(&mut self) -> Result<u8, SourceError> {
        (**self).read()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn sample_time(&self) -> DateTime<Utc> {
        (**self).sample_time()
    }

    fn is_recorded(&self) -> bool {
        (**self).is_recorded()
    }
}

/// Errors that can occur while acquiring a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The wireless adapter is not associated with a network
    NotConnected,
    /// The requested interface does not exist
    InterfaceNotFound(String),
    /// The platform output did not contain a usable reading
    Parse(String),
    /// Running the platform command or reading its file failed
    Command(String),
    /// A replayed recording has no more samples
    Exhausted,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotConnected => {
                write!(f, "WiFi is disconnected. Please connect to a network.")
            }
            SourceError::InterfaceNotFound(name) => write!(f, "interface not found: {name}"),
            SourceError::Parse(e) => write!(f, "could not parse signal: {e}"),
            SourceError::Command(e) => write!(f, "signal query failed: {e}"),
            SourceError::Exhausted => write!(f, "no more recorded samples"),
        }
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sample_clamps_value() {
        let sample = RawSample::new(140, Utc::now());
        assert_eq!(sample.value, 100);
    }

    #[test]
    fn test_error_messages() {
        assert!(SourceError::NotConnected.to_string().contains("disconnected"));
        assert_eq!(
            SourceError::InterfaceNotFound("wlan1".into()).to_string(),
            "interface not found: wlan1"
        );
    }

    #[test]
    fn test_boxed_source_delegates() {
        struct Fixed;
        impl SignalSource for Fixed {
            fn read(&mut self) -> Result<u8, SourceError> {
                Ok(42)
            }
            fn describe(&self) -> String {
                "fixed".into()
            }
        }

        let mut source: Box<dyn SignalSource> = Box::new(Fixed);
        assert_eq!(source.read(), Ok(42));
        assert_eq!(source.describe(), "fixed");
        assert!(!source.is_recorded());
    }
}
