//! VISA bus transport.
//!
//! Covers GPIB-addressed controllers (and any other VISA resource name)
//! through the `visa-rs` crate. The VISA library owns the line parameters
//! for serial resources opened this way; this transport only appends the
//! family's command terminator and trims one reply line.

use super::{AdapterError, Transport};
use crate::catalog::LineSettings;
use async_trait::async_trait;
use log::debug;
use std::ffi::CString;
use std::io::{Read, Write};
use visa_rs::prelude::*;

pub struct VisaTransport {
    address: String,
    line: LineSettings,
    // Declared before the resource manager so the session closes first.
    session: Option<visa_rs::Instrument>,
    rm: Option<DefaultRM>,
}

impl VisaTransport {
    pub fn new(address: impl Into<String>, line: &LineSettings) -> Self {
        Self {
            address: address.into(),
            line: line.clone(),
            session: None,
            rm: None,
        }
    }
}

#[async_trait]
impl Transport for VisaTransport {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        let rm = DefaultRM::new()
            .map_err(|e| AdapterError::ConnectionFailed(format!("{}: {}", self.address, e)))?;
        let name = CString::new(self.address.clone())
            .map_err(|e| AdapterError::ConnectionFailed(format!("{}: {}", self.address, e)))?;
        let name = visa_rs::VisaString::from(name);
        let session = rm
            .open(&name, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
            .map_err(|e| AdapterError::ConnectionFailed(format!("{}: {}", self.address, e)))?;

        self.session = Some(session);
        self.rm = Some(rm);
        debug!("VISA resource '{}' open", self.address);
        Ok(())
    }

    async fn query(&mut self, command: &str) -> Result<String, AdapterError> {
        let command_str = format!("{}{}", command, self.line.terminator);
        let timeout = self.line.timeout;
        let session = self.session.as_mut().ok_or(AdapterError::NotConnected)?;

        session.write_all(command_str.as_bytes())?;
        debug!("sent VISA command: {}", command);

        let mut buffer = [0u8; 256];
        let bytes_read = session.read(&mut buffer).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                AdapterError::Timeout(timeout)
            } else {
                AdapterError::Io(e)
            }
        })?;
        if bytes_read == 0 {
            return Err(AdapterError::UnexpectedEof);
        }

        let reply = String::from_utf8_lossy(&buffer[..bytes_read])
            .trim()
            .to_string();
        debug!("received VISA reply: {}", reply);
        Ok(reply)
    }

    async fn disconnect(&mut self) {
        if self.session.take().is_some() {
            self.rm = None;
            debug!("VISA resource '{}' closed", self.address);
        }
    }
}
