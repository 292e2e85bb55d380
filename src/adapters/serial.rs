//! Serial bus transport.
//!
//! Wraps the `serialport` crate and provides async I/O by running the
//! blocking reads and writes on Tokio's blocking task executor. Replies are
//! read one byte at a time until the newline delimiter, under an overall
//! deadline taken from the family's line settings; the port's own short read
//! timeout only paces the loop.

use super::{AdapterError, Transport};
use crate::catalog::{LineSettings, Parity};
use async_trait::async_trait;
use log::debug;
use serialport::SerialPort;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct SerialTransport {
    path: String,
    line: LineSettings,
    port: Option<Arc<Mutex<Box<dyn SerialPort>>>>,
}

impl SerialTransport {
    /// Create a transport for `path` with a family's line parameters. The
    /// port is not opened until [`Transport::connect`].
    pub fn new(path: impl Into<String>, line: &LineSettings) -> Self {
        Self {
            path: path.into(),
            line: line.clone(),
            port: None,
        }
    }

    fn data_bits(&self) -> serialport::DataBits {
        match self.line.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        }
    }

    fn stop_bits(&self) -> serialport::StopBits {
        match self.line.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        }
    }

    fn parity(&self) -> serialport::Parity {
        match self.line.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        let port = serialport::new(&self.path, self.line.baud_rate)
            .data_bits(self.data_bits())
            .stop_bits(self.stop_bits())
            .parity(self.parity())
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(100)) // per-read; overall deadline enforced in query
            .open()
            .map_err(|e| AdapterError::ConnectionFailed(format!("{}: {}", self.path, e)))?;

        self.port = Some(Arc::new(Mutex::new(port)));
        debug!(
            "serial port '{}' open at {} baud",
            self.path, self.line.baud_rate
        );
        Ok(())
    }

    async fn query(&mut self, command: &str) -> Result<String, AdapterError> {
        let port = self.port.as_ref().ok_or(AdapterError::NotConnected)?.clone();
        let command_str = format!("{}{}", command, self.line.terminator);
        let command_for_log = command.to_string();
        let deadline = self.line.timeout;

        // Execute blocking serial I/O on a dedicated thread
        tokio::task::spawn_blocking(move || -> Result<String, AdapterError> {
            use std::io::{Read, Write};

            let mut port_guard = port.blocking_lock();

            port_guard.write_all(command_str.as_bytes())?;
            port_guard.flush()?;
            debug!("sent serial command: {}", command_for_log);

            let mut reply = String::new();
            let mut buffer = [0u8; 1];
            let start = Instant::now();

            loop {
                if start.elapsed() > deadline {
                    return Err(AdapterError::Timeout(deadline));
                }

                match port_guard.read(&mut buffer) {
                    Ok(1) => {
                        let ch = buffer[0] as char;
                        if ch == '\n' {
                            break;
                        }
                        reply.push(ch);
                    }
                    Ok(0) => return Err(AdapterError::UnexpectedEof),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Port timeout is shorter than the overall deadline
                        continue;
                    }
                    Err(e) => return Err(AdapterError::Io(e)),
                    Ok(_) => unreachable!("read into single-byte buffer returned >1"),
                }
            }

            let reply = reply.trim().to_string();
            debug!("received serial reply: {}", reply);
            Ok(reply)
        })
        .await
        .map_err(|e| {
            AdapterError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?
    }

    async fn disconnect(&mut self) {
        if self.port.take().is_some() {
            debug!("serial port '{}' closed", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DeviceFamily;

    #[test]
    fn test_line_settings_map_to_serialport_types() {
        let transport = SerialTransport::new("/dev/ttyUSB0", &DeviceFamily::Model336.spec().line);
        assert_eq!(transport.data_bits(), serialport::DataBits::Seven);
        assert_eq!(transport.stop_bits(), serialport::StopBits::One);
        assert_eq!(transport.parity(), serialport::Parity::Odd);
    }

    #[tokio::test]
    async fn test_query_before_connect_is_not_connected() {
        let mut transport =
            SerialTransport::new("/dev/ttyUSB0", &DeviceFamily::Model336.spec().line);
        let result = transport.query("TEMP? 1").await;
        assert!(matches!(result, Err(AdapterError::NotConnected)));
    }
}
