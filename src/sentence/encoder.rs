//! # Sentence Encoder
//!
//! Renders readings into LK8EX1 and XCTRC sentences.

use serde::Deserialize;

use super::buffer::SentenceBuffer;
use super::field::{render, Field};
use super::protocol::*;
use super::reading::{battery_percent, NavTrace, Reading};

/// Sentence kinds the broadcaster can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentenceKind {
    /// `$LK8EX1` barometric/vario sentence
    Lk8ex1,
    /// `$XCTRC` navigation trace sentence
    Xctrc,
}

/// Encode an LK8EX1 barometric/vario sentence
///
/// ```text
/// $LK8EX1,pressure,altitude,vario,temperature,battery*CK
/// ```
///
/// Pressure is always sent as `999999` so the receiver uses the altitude
/// field, and temperature as `99` since no temperature source is wired in.
///
/// # Arguments
///
/// * `buf` - Output buffer, cleared first
/// * `altitude_m` - Barometric altitude in meters
/// * `climb_cps` - Climb rate in cm/s
/// * `battery_voltage` - Battery voltage, sent with one decimal
///
/// # Examples
///
/// ```
/// use vario_telemetry::sentence::buffer::SentenceBuffer;
/// use vario_telemetry::sentence::encoder::encode_lk8ex1;
///
/// let mut buf = SentenceBuffer::new();
/// encode_lk8ex1(&mut buf, 120, -50, 3.7);
/// assert_eq!(buf.as_str(), "$LK8EX1,999999,120,-50,99,3.7*0E\r\n");
/// ```
pub fn encode_lk8ex1(
    buf: &mut SentenceBuffer,
    altitude_m: i32,
    climb_cps: i32,
    battery_voltage: f32,
) {
    // TODO: send the raw pressure and temperature once the receivers are
    // confirmed to prefer them over the computed altitude
    let fields = [
        Field::Literal(PRESSURE_UNAVAILABLE),
        Field::int(altitude_m),
        Field::int(climb_cps),
        Field::Literal(TEMPERATURE_UNAVAILABLE),
        Field::fixed(f64::from(battery_voltage), BATTERY_VOLTAGE_PRECISION),
    ];

    render(buf, LK8EX1_TAG, &fields);
}

/// Encode an XCTRC navigation trace sentence
///
/// ```text
/// $XCTRC,year,month,day,hour,minute,second,centisecond,latitude,longitude,
///     altitude,speedoverground,course,climbrate,res,res,res,rawpressure,
///     batteryindication*CK
/// ```
///
/// Ground speed goes out in km/h, climb rate in m/s, pressure in hPa
/// (0.00 without a pressure sample) and battery as a percentage of the
/// nominal 5 V supply.
pub fn encode_xctrc(buf: &mut SentenceBuffer, trace: &NavTrace) {
    let time = &trace.time;
    let pressure_hpa = trace.pressure_pa.map_or(0.0, |pa| pa / 100.0);

    let fields = [
        Field::int(time.year),
        Field::int(time.month),
        Field::int(time.day),
        Field::int(time.hour),
        Field::int(time.minute),
        Field::int(time.second),
        Field::int(time.centisecond),
        Field::fixed(trace.latitude_deg, COORDINATE_PRECISION),
        Field::fixed(trace.longitude_deg, COORDINATE_PRECISION),
        Field::fixed(trace.altitude_m, MEASUREMENT_PRECISION),
        Field::fixed(trace.ground_speed_mps * 3.6, MEASUREMENT_PRECISION),
        Field::fixed(trace.heading_deg, HEADING_PRECISION),
        Field::fixed(f64::from(trace.climb_cps) / 100.0, MEASUREMENT_PRECISION),
        Field::Empty,
        Field::Empty,
        Field::Empty,
        Field::fixed(pressure_hpa, MEASUREMENT_PRECISION),
        Field::int(battery_percent(trace.supply_voltage)),
    ];

    render(buf, XCTRC_TAG, &fields);
}

/// Encode a reading as the requested sentence kind
pub fn encode_reading(kind: SentenceKind, reading: &Reading, buf: &mut SentenceBuffer) {
    match kind {
        SentenceKind::Lk8ex1 => encode_lk8ex1(
            buf,
            reading.altitude_m,
            reading.climb_cps,
            reading.supply_voltage,
        ),
        SentenceKind::Xctrc => encode_xctrc(buf, &reading.nav_trace()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::checksum::nmea_checksum;
    use crate::sentence::reading::Timestamp;

    fn reference_trace() -> NavTrace {
        NavTrace {
            time: Timestamp {
                year: 2024,
                month: 6,
                day: 15,
                hour: 12,
                minute: 30,
                second: 45,
                centisecond: 50,
            },
            latitude_deg: 46.947508,
            longitude_deg: 7.453117,
            altitude_m: 540.32,
            ground_speed_mps: 12.35,
            heading_deg: 270.4,
            climb_cps: -125,
            pressure_pa: Some(96493.0),
            supply_voltage: 3.7,
        }
    }

    fn fields(sentence: &str) -> Vec<&str> {
        let body = &sentence[1..sentence.find('*').unwrap()];
        body.split(',').collect()
    }

    #[test]
    fn test_lk8ex1_reference_sentence() {
        let mut buf = SentenceBuffer::new();
        encode_lk8ex1(&mut buf, 120, -50, 3.7);
        assert_eq!(buf.as_str(), "$LK8EX1,999999,120,-50,99,3.7*0E\r\n");
    }

    #[test]
    fn test_lk8ex1_negative_altitude() {
        let mut buf = SentenceBuffer::new();
        encode_lk8ex1(&mut buf, -12, 250, 12.6);
        assert_eq!(buf.as_str(), "$LK8EX1,999999,-12,250,99,12.6*3D\r\n");
    }

    #[test]
    fn test_lk8ex1_zero_values() {
        let mut buf = SentenceBuffer::new();
        encode_lk8ex1(&mut buf, 0, 0, 0.0);
        assert_eq!(buf.as_str(), "$LK8EX1,999999,0,0,99,0.0*11\r\n");
    }

    #[test]
    fn test_lk8ex1_sentinels_always_sent() {
        let mut buf = SentenceBuffer::new();
        encode_lk8ex1(&mut buf, 1500, 300, 4.2);

        let f = fields(buf.as_str());
        assert_eq!(f[0], "LK8EX1");
        assert_eq!(f[1], "999999");
        assert_eq!(f[4], "99");
    }

    #[test]
    fn test_xctrc_reference_sentence() {
        let mut buf = SentenceBuffer::new();
        encode_xctrc(&mut buf, &reference_trace());

        assert_eq!(
            buf.as_str(),
            "$XCTRC,2024,6,15,12,30,45,50,46.947508,7.453117,540.32,44.46,270.4,-1.25,,,,964.93,74*6F\r\n"
        );
    }

    #[test]
    fn test_xctrc_coordinates_six_decimals() {
        let mut buf = SentenceBuffer::new();
        encode_xctrc(&mut buf, &reference_trace());

        let f = fields(buf.as_str());
        assert_eq!(f[8], "46.947508");
        assert_eq!(f[9], "7.453117");
        assert_eq!(f[8].parse::<f64>().unwrap(), 46.947508);
    }

    #[test]
    fn test_xctrc_reserved_fields_empty() {
        let mut buf = SentenceBuffer::new();
        encode_xctrc(&mut buf, &reference_trace());

        let f = fields(buf.as_str());
        assert_eq!(f.len(), 19);
        assert_eq!(&f[14..17], &["", "", ""]);
        assert!(buf.as_str().contains(",-1.25,,,,964.93,"));
    }

    #[test]
    fn test_xctrc_without_pressure_sensor() {
        let mut buf = SentenceBuffer::new();
        let trace = NavTrace {
            pressure_pa: None,
            ..reference_trace()
        };
        encode_xctrc(&mut buf, &trace);

        assert_eq!(fields(buf.as_str())[17], "0.00");
    }

    #[test]
    fn test_xctrc_battery_clamped() {
        let mut buf = SentenceBuffer::new();

        let trace = NavTrace {
            supply_voltage: 6.0,
            ..reference_trace()
        };
        encode_xctrc(&mut buf, &trace);
        assert_eq!(fields(buf.as_str())[18], "100");

        let trace = NavTrace {
            supply_voltage: 0.0,
            ..reference_trace()
        };
        encode_xctrc(&mut buf, &trace);
        assert_eq!(fields(buf.as_str())[18], "0");
    }

    #[test]
    fn test_xctrc_checksum_is_valid() {
        let mut buf = SentenceBuffer::new();
        encode_xctrc(&mut buf, &reference_trace());

        let text = buf.as_str();
        let star = text.find('*').unwrap();
        let expected = format!("{:02X}", nmea_checksum(text.as_bytes()));
        assert_eq!(&text[star + 1..star + 3], expected);
    }

    #[test]
    fn test_xctrc_oversized_values_truncate() {
        let mut buf = SentenceBuffer::new();
        let trace = NavTrace {
            altitude_m: 1e60,
            ground_speed_mps: 1e60,
            ..reference_trace()
        };
        encode_xctrc(&mut buf, &trace);

        let text = buf.as_str();
        assert!(buf.is_truncated(), "oversized sentence should be flagged");
        assert_eq!(text.len(), buf.capacity());
        assert!(text.starts_with("$XCTRC,2024,"));
        assert_eq!(&text[text.len() - 5..text.len() - 4], "*");
        assert!(text.ends_with("\r\n"));

        let expected = format!("{:02X}", nmea_checksum(text.as_bytes()));
        assert_eq!(&text[text.len() - 4..text.len() - 2], expected);
    }

    #[test]
    fn test_encode_reading_dispatch() {
        let reading = Reading {
            altitude_m: 120,
            climb_cps: -50,
            supply_voltage: 3.7,
            time: Some(reference_trace().time),
            ..Reading::default()
        };
        let mut buf = SentenceBuffer::new();

        encode_reading(SentenceKind::Lk8ex1, &reading, &mut buf);
        assert_eq!(buf.as_str(), "$LK8EX1,999999,120,-50,99,3.7*0E\r\n");

        encode_reading(SentenceKind::Xctrc, &reading, &mut buf);
        assert!(buf.as_str().starts_with("$XCTRC,2024,6,15,12,30,45,50,0.000000,0.000000,"));
    }

    #[test]
    fn test_sentence_kind_from_config_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: SentenceKind,
        }

        let w: Wrapper = toml::from_str(r#"kind = "xctrc""#).unwrap();
        assert_eq!(w.kind, SentenceKind::Xctrc);
        let w: Wrapper = toml::from_str(r#"kind = "lk8ex1""#).unwrap();
        assert_eq!(w.kind, SentenceKind::Lk8ex1);
    }
}
