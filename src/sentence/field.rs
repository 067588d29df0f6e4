//! # Field-List Renderer
//!
//! A sentence is a tag followed by an ordered list of typed fields. Each
//! field carries its own formatting rule, and [`render`] joins them with
//! commas, then seals the frame with the checksum trailer.

use std::fmt::{self, Write};

use tracing::warn;

use super::buffer::SentenceBuffer;
use super::checksum::seal;
use super::protocol::{FIELD_SEPARATOR, SENTENCE_START};

/// One sentence field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// Decimal integer, sign included when negative
    Int(i64),

    /// Float with a fixed number of decimals (`%.Nf`)
    Fixed { value: f64, precision: usize },

    /// Verbatim text, used for "not available" sentinels
    Literal(&'a str),

    /// Reserved field, rendered as nothing between separators
    Empty,
}

impl<'a> Field<'a> {
    /// Integer field from any integer type that widens to `i64`
    pub fn int(value: impl Into<i64>) -> Self {
        Field::Int(value.into())
    }

    /// Fixed-point field with `precision` decimals
    pub fn fixed(value: f64, precision: usize) -> Self {
        Field::Fixed { value, precision }
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Field::Int(value) => write!(f, "{}", value),
            Field::Fixed { value, precision } => write!(f, "{:.*}", precision, value),
            Field::Literal(text) => f.write_str(text),
            Field::Empty => Ok(()),
        }
    }
}

/// Render `$<tag>,<field>,...*<CK>\r\n` into `buf`
///
/// The buffer is cleared first. Content that does not fit is truncated and
/// the checksum covers the truncated body.
pub fn render(buf: &mut SentenceBuffer, tag: &str, fields: &[Field<'_>]) {
    buf.clear();

    // SentenceBuffer never reports write errors
    let _ = write!(buf, "{}{}", SENTENCE_START as char, tag);
    for field in fields {
        let _ = write!(buf, "{}{}", FIELD_SEPARATOR, field);
    }

    if buf.is_truncated() {
        warn!(
            "{} sentence truncated to {} bytes before checksum",
            tag,
            buf.len()
        );
    }

    seal(buf);
}
