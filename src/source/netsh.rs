//! Windows link-quality source backed by `netsh wlan show interfaces`.
//!
//! The command output is a sequence of blank-line separated blocks, one per
//! adapter, each a list of `Key : Value` lines. Parsing is kept separate from
//! running the command so it can be exercised on any platform.

use crate::source::types::{SignalSource, SourceError};
use std::process::Command;

/// Reads the `Signal` field reported by `netsh`.
#[derive(Debug, Clone, Default)]
pub struct NetshSource {
    interface: Option<String>,
}

impl NetshSource {
    /// Create a source for the named interface, or the first one listed.
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }

    fn query(&self) -> Result<String, SourceError> {
        let output = Command::new("netsh")
            .args(["wlan", "show", "interfaces"])
            .output()
            .map_err(|e| SourceError::Command(e.to_string()))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SignalSource for NetshSource {
    fn read(&mut self) -> Result<u8, SourceError> {
        let output = self.query()?;
        parse_interfaces(&output, self.interface.as_deref())
    }

    fn describe(&self) -> String {
        match &self.interface {
            Some(name) => format!("netsh ({name})"),
            None => "netsh (first interface)".to_string(),
        }
    }
}

/// Extract the signal percentage from `netsh wlan show interfaces` output.
pub fn parse_interfaces(output: &str, interface: Option<&str>) -> Result<u8, SourceError> {
    let output = output.replace("\r\n", "\n");

    let signal = match interface {
        Some(name) => {
            let block = blocks(&output)
                .find(|block| field(block, "Name") == Some(name))
                .ok_or_else(|| SourceError::InterfaceNotFound(name.to_string()))?;
            field(&block, "Signal")
        }
        None => blocks(&output).find_map(|block| field(&block, "Signal")),
    };

    match signal {
        Some(value) => parse_percent(value),
        None if output.contains("State") && output.contains("disconnected") => {
            Err(SourceError::NotConnected)
        }
        None => Err(SourceError::Parse(
            "signal not found in netsh output".to_string(),
        )),
    }
}

/// Group lines into blocks; any whitespace-only line separates two blocks.
fn blocks(output: &str) -> impl Iterator<Item = Vec<&str>> {
    let mut groups = vec![Vec::new()];
    for line in output.lines() {
        if line.trim().is_empty() {
            groups.push(Vec::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(line);
        }
    }
    groups.into_iter().filter(|group| !group.is_empty())
}

/// Value of the first `key : value` line in a block.
fn field<'a>(block: &[&'a str], key: &str) -> Option<&'a str> {
    block.iter().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}

fn parse_percent(value: &str) -> Result<u8, SourceError> {
    let digits = value
        .strip_suffix('%')
        .ok_or_else(|| SourceError::Parse(format!("expected a percentage, got {value:?}")))?;
    let percent: u32 = digits
        .trim()
        .parse()
        .map_err(|_| SourceError::Parse(format!("bad signal value {value:?}")))?;
    Ok(percent.min(100) as u8)
}
