//! Core library for the cryolog data logger.
//!
//! cryolog polls laboratory temperature controllers over a serial or VISA
//! instrument bus on a fixed cadence, prints each reading, and appends it to
//! a SQLite sample store. This library contains the device catalog, the
//! transport adapters, the instrument session and polling loop, the sample
//! store, and the CSV exporter used by the companion binaries.

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod instrument;
pub mod logger;
pub mod store;
