//! # Sentence Module
//!
//! NMEA-style telemetry sentences for flight instruments.
//!
//! This module handles:
//! - LK8EX1 barometric/vario sentence encoding
//! - XCTRC navigation trace sentence encoding
//! - XOR checksum calculation and `*XX\r\n` trailers
//! - Fixed-capacity rendering that truncates instead of overflowing

pub mod protocol;
pub mod buffer;
pub mod checksum;
pub mod field;
pub mod reading;
pub mod encoder;
