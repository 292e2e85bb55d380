//! Device catalog: controller families, their command tables, and operator
//! selection.
//!
//! The two supported controller families differ only in data — command
//! strings, serial line parameters, channel lists — never in control flow,
//! so the catalog models them as a static lookup table keyed by a family tag
//! rather than a trait object per model.
//!
//! Discovery enumerates the serial bus. GPIB resources cannot be enumerated
//! without a VISA resource manager, so GPIB-addressed controllers are
//! supplied explicitly (`--device` on the command line); the address is
//! treated as an opaque identifier either way.

use crate::error::{AppResult, LoggerError};
#[cfg(feature = "instrument_serial")]
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Controller family tag.
///
/// Determines the query command per channel, the reply parsing rule, and the
/// serial line parameters. Fixed at selection time; never changes during a
/// session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceFamily {
    /// Dual-channel controller (330-style): one setpoint and one sensor
    /// temperature per unit.
    Model330,
    /// Multi-channel controller (336-style): setpoint and temperature for
    /// inputs A and B.
    Model336,
}

/// Serial line parameters a family requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Terminator appended to every outgoing command.
    pub terminator: &'static str,
    /// How long to wait for one reply line.
    pub timeout: Duration,
}

/// Parity modes for serial communication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// One pollable channel of a family: label, query command, unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    pub label: &'static str,
    pub command: &'static str,
    pub unit: &'static str,
}

/// Everything the logger needs to know about a family, as data.
pub struct FamilySpec {
    pub name: &'static str,
    /// Identification query used to probe the device at open time.
    pub idn_query: &'static str,
    pub line: LineSettings,
    /// Channels polled each tick, in this order.
    pub channels: &'static [ChannelSpec],
}

static MODEL330: FamilySpec = FamilySpec {
    name: "LS330",
    idn_query: "*IDN?",
    line: LineSettings {
        baud_rate: 1200,
        data_bits: 7,
        stop_bits: 1,
        parity: Parity::Odd,
        terminator: "\r\n",
        timeout: Duration::from_millis(1000),
    },
    channels: &[
        ChannelSpec {
            label: "setpoint",
            command: "SETP?",
            unit: "K",
        },
        ChannelSpec {
            label: "temperature",
            command: "TEMP?",
            unit: "K",
        },
    ],
};

static MODEL336: FamilySpec = FamilySpec {
    name: "LS336",
    idn_query: "*IDN?",
    line: LineSettings {
        baud_rate: 57600,
        data_bits: 7,
        stop_bits: 1,
        parity: Parity::Odd,
        terminator: "\r\n",
        timeout: Duration::from_millis(1000),
    },
    channels: &[
        ChannelSpec {
            label: "A.setpoint",
            command: "SETP? 1",
            unit: "K",
        },
        ChannelSpec {
            label: "A.temperature",
            command: "TEMP? 1",
            unit: "K",
        },
        ChannelSpec {
            label: "B.setpoint",
            command: "SETP? 2",
            unit: "K",
        },
        ChannelSpec {
            label: "B.temperature",
            command: "TEMP? 2",
            unit: "K",
        },
    ],
};

impl DeviceFamily {
    /// The family's lookup-table entry.
    pub fn spec(&self) -> &'static FamilySpec {
        match self {
            DeviceFamily::Model330 => &MODEL330,
            DeviceFamily::Model336 => &MODEL336,
        }
    }

    /// Infer the family from the address pattern.
    ///
    /// GPIB resources are the 330-style controllers in the deployed racks;
    /// serial resources are 336-style. Returns `None` for addresses that
    /// match neither pattern, in which case the operator chooses explicitly.
    pub fn infer(address: &str) -> Option<DeviceFamily> {
        let upper = address.to_ascii_uppercase();
        if upper.starts_with("GPIB") {
            Some(DeviceFamily::Model330)
        } else if upper.starts_with("ASRL")
            || upper.starts_with("COM")
            || address.starts_with("/dev/")
        {
            Some(DeviceFamily::Model336)
        } else {
            None
        }
    }

    /// Parse an operator-supplied family name ("330", "ls336", ...).
    pub fn parse(name: &str) -> Option<DeviceFamily> {
        match name.trim().to_ascii_lowercase().as_str() {
            "330" | "ls330" | "model330" => Some(DeviceFamily::Model330),
            "336" | "ls336" | "model336" => Some(DeviceFamily::Model336),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// A device the operator chose to poll.
#[derive(Clone, Debug)]
pub struct Selection {
    pub address: String,
    pub family: DeviceFamily,
    /// Label under which the device's samples are recorded.
    pub label: String,
}

/// Source of the operator's device selection.
///
/// Abstracted so tests and non-interactive runs can supply a programmatic
/// list instead of a console prompt.
pub trait SelectionSource {
    /// Choose the devices to poll from the currently visible addresses.
    fn select(&mut self, visible: &[String]) -> AppResult<Vec<Selection>>;
}

/// Programmatic selection for non-interactive use.
pub struct Preselected(pub Vec<Selection>);

impl SelectionSource for Preselected {
    fn select(&mut self, _visible: &[String]) -> AppResult<Vec<Selection>> {
        if self.0.is_empty() {
            return Err(LoggerError::NoDevicesFound);
        }
        Ok(self.0.clone())
    }
}

/// Interactive selection: numbered list on stdout, comma-separated picks on
/// stdin, blank for all. Ambiguous addresses get a follow-up family prompt.
pub struct ConsolePrompt;

impl SelectionSource for ConsolePrompt {
    fn select(&mut self, visible: &[String]) -> AppResult<Vec<Selection>> {
        if visible.is_empty() {
            return Err(LoggerError::NoDevicesFound);
        }

        println!("Select instruments to monitor (comma-separated, blank for all):");
        for (i, address) in visible.iter().enumerate() {
            match DeviceFamily::infer(address) {
                Some(family) => println!("  {}) {}  [{}]", i + 1, address, family),
                None => println!("  {}) {}", i + 1, address),
            }
        }
        print!("Choice: ");
        io::stdout().flush()?;

        let mut raw = String::new();
        io::stdin().lock().read_line(&mut raw)?;
        let raw = raw.trim();

        let picks: Vec<usize> = if raw.is_empty() {
            (1..=visible.len()).collect()
        } else {
            let mut picks = Vec::new();
            for part in raw.split(',') {
                let part = part.trim();
                match part.parse::<usize>() {
                    Ok(n) if (1..=visible.len()).contains(&n) => picks.push(n),
                    _ => {
                        return Err(LoggerError::Selection(format!(
                            "'{}' is not an entry number",
                            part
                        )))
                    }
                }
            }
            picks
        };

        let mut selections = Vec::new();
        for n in picks {
            let address = visible[n - 1].clone();
            let family = match DeviceFamily::infer(&address) {
                Some(family) => family,
                None => prompt_family(&address)?,
            };
            selections.push(Selection {
                label: address.clone(),
                address,
                family,
            });
        }
        Ok(selections)
    }
}

fn prompt_family(address: &str) -> AppResult<DeviceFamily> {
    print!("Controller family for {} (330/336): ", address);
    io::stdout().flush()?;
    let mut raw = String::new();
    io::stdin().lock().read_line(&mut raw)?;
    DeviceFamily::parse(&raw)
        .ok_or_else(|| LoggerError::Selection(format!("unknown controller family '{}'", raw.trim())))
}

/// The set of bus addresses visible right now.
pub struct Catalog {
    addresses: Vec<String>,
}

impl Catalog {
    /// Enumerate currently visible addresses on the serial bus.
    ///
    /// An enumeration failure is logged and treated as an empty bus; the
    /// caller turns an empty catalog into [`LoggerError::NoDevicesFound`]
    /// where that is fatal.
    pub fn discover() -> Self {
        Self {
            addresses: enumerate_serial(),
        }
    }

    /// A catalog over a fixed address list (tests, pre-supplied selections).
    pub fn with_addresses(addresses: Vec<String>) -> Self {
        Self { addresses }
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Run a selection source against the visible addresses.
    pub fn select_with(&self, source: &mut dyn SelectionSource) -> AppResult<Vec<Selection>> {
        if self.addresses.is_empty() {
            return Err(LoggerError::NoDevicesFound);
        }
        let selections = source.select(&self.addresses)?;
        if selections.is_empty() {
            return Err(LoggerError::NoDevicesFound);
        }
        Ok(selections)
    }
}

#[cfg(feature = "instrument_serial")]
fn enumerate_serial() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!("serial enumeration failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(not(feature = "instrument_serial"))]
fn enumerate_serial() -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_inference_from_address_pattern() {
        assert_eq!(
            DeviceFamily::infer("GPIB0::12::INSTR"),
            Some(DeviceFamily::Model330)
        );
        assert_eq!(
            DeviceFamily::infer("ASRL4::INSTR"),
            Some(DeviceFamily::Model336)
        );
        assert_eq!(
            DeviceFamily::infer("/dev/ttyUSB0"),
            Some(DeviceFamily::Model336)
        );
        assert_eq!(DeviceFamily::infer("COM3"), Some(DeviceFamily::Model336));
        assert_eq!(DeviceFamily::infer("mock://bench"), None);
    }

    #[test]
    fn test_family_name_parsing() {
        assert_eq!(DeviceFamily::parse("330"), Some(DeviceFamily::Model330));
        assert_eq!(DeviceFamily::parse("LS336"), Some(DeviceFamily::Model336));
        assert_eq!(DeviceFamily::parse("x440"), None);
    }

    #[test]
    fn test_family_tables() {
        let spec330 = DeviceFamily::Model330.spec();
        assert_eq!(spec330.channels.len(), 2);
        assert_eq!(spec330.channels[1].command, "TEMP?");
        assert_eq!(spec330.line.baud_rate, 1200);

        let spec336 = DeviceFamily::Model336.spec();
        assert_eq!(spec336.channels.len(), 4);
        assert_eq!(spec336.channels[0].label, "A.setpoint");
        assert_eq!(spec336.channels[3].command, "TEMP? 2");
        assert_eq!(spec336.line.baud_rate, 57600);
        assert_eq!(spec336.line.parity, Parity::Odd);
    }

    #[test]
    fn test_empty_catalog_is_no_devices() {
        let catalog = Catalog::with_addresses(Vec::new());
        let result = catalog.select_with(&mut Preselected(Vec::new()));
        assert!(matches!(result, Err(LoggerError::NoDevicesFound)));
    }

    #[test]
    fn test_preselected_passes_through() {
        let catalog = Catalog::with_addresses(vec!["GPIB0::12::INSTR".to_string()]);
        let mut source = Preselected(vec![Selection {
            address: "GPIB0::12::INSTR".to_string(),
            family: DeviceFamily::Model330,
            label: "LS330BB".to_string(),
        }]);
        let selections = catalog.select_with(&mut source).unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].label, "LS330BB");
    }
}
