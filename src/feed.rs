//! # Reading Feed
//!
//! Reads snapshots as JSON lines, one [`Reading`] per line:
//!
//! ```text
//! {"altitude_m": 1203, "climb_cps": 85, "supply_voltage": 4.9}
//! ```
//!
//! Blank lines are ignored.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::Result;
use crate::sentence::reading::Reading;

/// Line-delimited JSON reading source
pub struct ReadingFeed<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> ReadingFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next snapshot, or `None` once the input is exhausted
    ///
    /// Cancel safe.
    ///
    /// # Errors
    ///
    /// Returns error on a read failure or a line that is not a valid
    /// snapshot. The feed stays usable after a parse error.
    pub async fn next_reading(&mut self) -> Result<Option<Reading>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Ok(Some(serde_json::from_str(line)?));
        }
    }
}
