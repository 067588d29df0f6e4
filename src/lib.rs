//! # Vario Telemetry Library
//!
//! Broadcast flight telemetry from a vario to a companion app.
//!
//! This library renders barometric and GPS readings as LK8EX1 and XCTRC
//! sentences and sends them over a BLE GATT notify channel or a
//! serial-profile link, only while a peer is connected.

pub mod config;
pub mod error;
pub mod feed;
pub mod link;
pub mod sentence;
pub mod transport;
