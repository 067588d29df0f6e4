//! # Sentence Protocol Constants
//!
//! Wire-level constants shared by the LK8EX1 and XCTRC sentences.

/// Start marker of every sentence
pub const SENTENCE_START: u8 = b'$';

/// Separator between the sentence body and its checksum
pub const CHECKSUM_SEPARATOR: u8 = b'*';

/// Separator between fields
pub const FIELD_SEPARATOR: char = ',';

/// Line terminator appended after the checksum
pub const SENTENCE_TERMINATOR: &str = "\r\n";

/// Maximum length of a rendered sentence in bytes, terminator included.
/// Both sentence kinds share this capacity.
pub const SENTENCE_CAPACITY: usize = 128;

/// Bytes reserved at the end of the buffer for `*XX\r\n`
pub const TRAILER_LEN: usize = 1 + 2 + SENTENCE_TERMINATOR.len();

/// LK8000 external instrument series 1 sentence tag
pub const LK8EX1_TAG: &str = "LK8EX1";

/// XCSoar native trace sentence tag
pub const XCTRC_TAG: &str = "XCTRC";

/// Raw pressure not available (6 nines). Makes the altitude field authoritative.
pub const PRESSURE_UNAVAILABLE: &str = "999999";

/// Temperature not available (2 nines)
pub const TEMPERATURE_UNAVAILABLE: &str = "99";

/// Number of reserved (always empty) XCTRC fields between climb rate and pressure
pub const XCTRC_RESERVED_FIELDS: usize = 3;

/// Nominal supply rail used to derive the XCTRC battery percentage
pub const NOMINAL_SUPPLY_VOLTAGE: f64 = 5.0;

/// Fixed-decimal precision of XCTRC latitude and longitude
pub const COORDINATE_PRECISION: usize = 6;

/// Fixed-decimal precision of XCTRC altitude, speed, climb rate and pressure
pub const MEASUREMENT_PRECISION: usize = 2;

/// Fixed-decimal precision of XCTRC heading
pub const HEADING_PRECISION: usize = 1;

/// Fixed-decimal precision of LK8EX1 battery voltage
pub const BATTERY_VOLTAGE_PRECISION: usize = 1;
