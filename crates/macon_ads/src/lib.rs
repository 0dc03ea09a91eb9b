//! # MACON ADS
//!
//! Beckhoff ADS device interface for MACON Sync.
//!
//! This crate provides:
//! - AMS/TCP framing (`frame`)
//! - Value encoding for STRING, BOOL, INT and REAL variables (`codec`)
//! - [`AdsClient`], a blocking client implementing
//!   [`DeviceInterface`](macon_sync_engine::DeviceInterface)
//!
//! Variables are accessed by name through symbol handles
//! (`SYM_HNDBYNAME`, then `SYM_VALBYHND`), so the client needs no knowledge
//! of the controller's memory layout.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
pub mod codec;
mod config;
mod error;
pub mod frame;
mod net_id;

pub use client::AdsClient;
pub use config::{AdsConfig, DEFAULT_AMS_PORT, DEFAULT_TCP_PORT};
pub use error::{describe, AdsError, AdsResult, ADSERR_SYMBOL_NOT_FOUND};
pub use net_id::AmsNetId;
