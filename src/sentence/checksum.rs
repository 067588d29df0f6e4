//! # NMEA Checksum and Framing
//!
//! XOR checksum used by NMEA-style sentences.
//!
//! The checksum covers every byte strictly between the leading `$` and the
//! `*` separator (or the end of the frame when there is no separator yet).
//! It is rendered as two uppercase hex digits after the `*`, followed by
//! `\r\n`.

use std::fmt::Write;

use super::buffer::SentenceBuffer;
use super::protocol::{CHECKSUM_SEPARATOR, SENTENCE_TERMINATOR};

/// Calculate the XOR checksum of a frame
///
/// # Arguments
///
/// * `frame` - Frame bytes starting with the start marker
///
/// # Returns
///
/// * `u8` - XOR of the bytes between the start marker and `*` or end of frame
///
/// # Examples
///
/// ```
/// use vario_telemetry::sentence::checksum::nmea_checksum;
///
/// assert_eq!(nmea_checksum(b"$*"), 0x00);
/// assert_eq!(nmea_checksum(b"$AB*"), b'A' ^ b'B');
/// ```
pub fn nmea_checksum(frame: &[u8]) -> u8 {
    frame
        .iter()
        .skip(1)
        .take_while(|&&byte| byte != CHECKSUM_SEPARATOR)
        .fold(0u8, |cksum, &byte| cksum ^ byte)
}

/// Close a frame: append `*` if missing, the checksum, and `\r\n`
///
/// The checksum is computed over whatever the buffer holds, so a truncated
/// body yields a checksum of the truncated content.
pub fn seal(buf: &mut SentenceBuffer) {
    let cksum = nmea_checksum(buf.as_bytes());

    if !buf.as_bytes().contains(&CHECKSUM_SEPARATOR) {
        buf.push_trailer("*");
    }

    let mut trailer = String::with_capacity(4);
    // Writing to a String cannot fail
    let _ = write!(trailer, "{:02X}{}", cksum, SENTENCE_TERMINATOR);
    buf.push_trailer(&trailer);
}
