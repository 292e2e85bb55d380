//! Instrument sessions: one opened bus connection per selected device.

use crate::adapters::{AdapterError, Transport};
use crate::catalog::{ChannelSpec, DeviceFamily, Selection};
use crate::error::{AppResult, LoggerError};
use log::{debug, info};

/// An exclusively owned connection to one controller.
///
/// Created when the operator selects a device; destroyed at process shutdown
/// or when the caller drops the device after a fatal open error. The family
/// tag decides which commands [`InstrumentSession::query_reading`] sends and
/// is fixed for the session's lifetime.
pub struct InstrumentSession {
    label: String,
    address: String,
    family: DeviceFamily,
    transport: Box<dyn Transport>,
    open: bool,
}

impl InstrumentSession {
    /// Open a session over an explicit transport (tests inject a mock here).
    ///
    /// Probes the device with the family's identification query. A device
    /// that does not answer within the family timeout fails with
    /// [`LoggerError::Connection`]; the caller decides whether to drop it
    /// and continue with the remaining devices.
    pub async fn open(selection: &Selection, mut transport: Box<dyn Transport>) -> AppResult<Self> {
        let connection_err = |reason: String| LoggerError::Connection {
            address: selection.address.clone(),
            reason,
        };

        transport
            .connect()
            .await
            .map_err(|e| connection_err(e.to_string()))?;

        let spec = selection.family.spec();
        let idn = transport
            .query(spec.idn_query)
            .await
            .map_err(|e| connection_err(format!("no answer to {}: {}", spec.idn_query, e)))?;
        info!("{} at {}: {}", selection.label, selection.address, idn);

        Ok(Self {
            label: selection.label.clone(),
            address: selection.address.clone(),
            family: selection.family,
            transport,
            open: true,
        })
    }

    /// Open a session over the transport implied by the address.
    pub async fn connect(selection: &Selection) -> AppResult<Self> {
        let spec = selection.family.spec();
        let transport = crate::adapters::transport_for(&selection.address, &spec.line).map_err(
            |e| LoggerError::Connection {
                address: selection.address.clone(),
                reason: e.to_string(),
            },
        )?;
        Self::open(selection, transport).await
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// The channels this session polls each tick, in polling order.
    pub fn channels(&self) -> &'static [ChannelSpec] {
        self.family.spec().channels
    }

    /// Send the channel's query and parse the one-line reply as a float.
    ///
    /// A timeout becomes [`LoggerError::QueryTimeout`], a malformed reply
    /// [`LoggerError::Parse`]; neither disturbs the session, which stays
    /// usable for the next query.
    pub async fn query_reading(&mut self, channel: &ChannelSpec) -> AppResult<f64> {
        let raw = self
            .transport
            .query(channel.command)
            .await
            .map_err(|e| match e {
                AdapterError::Timeout(_) => LoggerError::QueryTimeout {
                    device: self.label.clone(),
                    channel: channel.label.to_string(),
                },
                other => LoggerError::Connection {
                    address: self.address.clone(),
                    reason: other.to_string(),
                },
            })?;

        raw.trim().parse::<f64>().map_err(|_| LoggerError::Parse {
            device: self.label.clone(),
            channel: channel.label.to_string(),
            raw,
        })
    }

    /// Release the bus connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.open {
            self.transport.disconnect().await;
            self.open = false;
            debug!("closed session for {}", self.label);
        }
    }
}
