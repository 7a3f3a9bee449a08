//! Pipeline consumers: delimited-text logs and the live display feed.

pub mod console;
pub mod event_log;
pub mod live;
pub mod sample_log;

pub use console::ConsolePrinter;
pub use event_log::EventLog;
pub use live::{LiveHistory, LiveSnapshot, LiveView};
pub use sample_log::SampleLog;

use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Timestamp format used in every log row.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Open a log for appending; the flag says whether it is new (needs a header).
fn open_append(path: &Path) -> io::Result<(File, bool)> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;
    Ok((file, is_empty))
}
