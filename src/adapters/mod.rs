//! Bus transport implementations.
//!
//! A [`Transport`] is the low-level I/O seam of an instrument session: it
//! knows how to open one bus address, exchange a single command line for a
//! single reply line, and close again. Everything above it (command strings,
//! parsing, channel lists) lives in the catalog's family tables.
//!
//! Implementations:
//!
//! - [`SerialTransport`]: RS-232 over the `serialport` crate
//!   (feature `instrument_serial`, on by default)
//! - [`VisaTransport`]: GPIB and other VISA resources via `visa-rs`
//!   (feature `instrument_visa`)
//! - [`MockTransport`]: scripted replies for the test suite

pub mod mock;
#[cfg(feature = "instrument_serial")]
pub mod serial;
#[cfg(feature = "instrument_visa")]
pub mod visa;

pub use mock::MockTransport;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialTransport;
#[cfg(feature = "instrument_visa")]
pub use visa::VisaTransport;

use crate::catalog::LineSettings;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised at the transport layer.
///
/// The instrument session maps these onto the application taxonomy:
/// `Timeout` becomes a per-channel `QueryTimeout`, everything else a
/// connection-level failure.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("failed to open {0}")]
    ConnectionFailed(String),

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no transport available for '{0}' with the enabled features")]
    UnsupportedAddress(String),
}

/// Low-level request/response access to one bus address.
#[async_trait]
pub trait Transport: Send {
    /// Establish the connection with the family's line parameters.
    async fn connect(&mut self) -> Result<(), AdapterError>;

    /// Send one command line and read one reply line, trimmed.
    async fn query(&mut self, command: &str) -> Result<String, AdapterError>;

    /// Release the connection. Safe to call when already closed.
    async fn disconnect(&mut self);
}

/// Pick a transport for a bus address.
///
/// VISA resource names (anything containing `::`) go to the VISA transport;
/// plain device paths go to the serial transport. An address whose transport
/// was compiled out yields [`AdapterError::UnsupportedAddress`].
pub fn transport_for(
    address: &str,
    line: &LineSettings,
) -> Result<Box<dyn Transport>, AdapterError> {
    if address.contains("::") {
        visa_transport(address, line)
    } else {
        serial_transport(address, line)
    }
}

#[cfg(feature = "instrument_visa")]
fn visa_transport(
    address: &str,
    line: &LineSettings,
) -> Result<Box<dyn Transport>, AdapterError> {
    Ok(Box::new(VisaTransport::new(address, line)))
}

#[cfg(not(feature = "instrument_visa"))]
fn visa_transport(
    address: &str,
    _line: &LineSettings,
) -> Result<Box<dyn Transport>, AdapterError> {
    Err(AdapterError::UnsupportedAddress(address.to_string()))
}

#[cfg(feature = "instrument_serial")]
fn serial_transport(
    address: &str,
    line: &LineSettings,
) -> Result<Box<dyn Transport>, AdapterError> {
    Ok(Box::new(SerialTransport::new(address, line)))
}

#[cfg(not(feature = "instrument_serial"))]
fn serial_transport(
    address: &str,
    _line: &LineSettings,
) -> Result<Box<dyn Transport>, AdapterError> {
    Err(AdapterError::UnsupportedAddress(address.to_string()))
}
