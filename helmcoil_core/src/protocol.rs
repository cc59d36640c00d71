//! Command strings and fixed-format reply parsing for the source and sensor.
//!
//! Replies look like `IOUT  0.012A\r\n`: a literal tag, padding, the value and
//! a unit letter. Parsing strips exactly those tokens.

use crate::units::{FINE_MAX, FINE_MIN};

pub const QUERY_IOUT: &str = "IOUT?";
pub const QUERY_VOUT: &str = "VOUT?";
pub const QUERY_ISET: &str = "ISET?";
pub const QUERY_IFINE: &str = "IFINE?";
pub const QUERY_OUTPUT: &str = "OUT?";
pub const QUERY_FIELD: &str = "FIELD?";
pub const QUERY_RANGE: &str = "RANGE?";
pub const QUERY_SOURCE_IDN: &str = "IDN?";
pub const QUERY_SENSOR_IDN: &str = "*IDN?";

/// `ISET` command for a setpoint in amps (three decimals, i.e. mA resolution).
pub fn set_current(amps: f64) -> String {
    format!("ISET {amps:.3}")
}

pub fn set_fine(fine: i8) -> String {
    format!("IFINE {fine}")
}

pub fn set_output(enable: bool) -> String {
    format!("OUT {}", u8::from(enable))
}

pub fn set_range(range: u8) -> String {
    format!("RANGE {range}")
}

/// Strip `tag` and an optional trailing `unit` and parse the number between.
pub fn parse_tagged(reply: &str, tag: &str, unit: &str) -> Option<f64> {
    let body = reply.trim().strip_prefix(tag)?.trim();
    let body = body.strip_suffix(unit).unwrap_or(body).trim();
    body.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `OUT 001` → enabled, `OUT 000` → disabled.
pub fn parse_output(reply: &str) -> Option<bool> {
    let body = reply.trim().strip_prefix("OUT")?.trim();
    body.parse::<u8>().ok().map(|v| v != 0)
}

/// `IFINE 3` → 3. Some firmware appends a stray unit letter; it is ignored.
pub fn parse_fine(reply: &str) -> Option<i8> {
    let body = reply.trim().strip_prefix("IFINE")?.trim();
    let digits = body.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let v = digits.trim().parse::<i32>().ok()?;
    (i32::from(FINE_MIN)..=i32::from(FINE_MAX))
        .contains(&v)
        .then_some(v as i8)
}

/// Gaussmeter field reply is a bare number (`102.3`).
pub fn parse_field(reply: &str) -> Option<f64> {
    reply.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_range(reply: &str) -> Option<u8> {
    reply.trim().parse::<u8>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_values() {
        assert_eq!(parse_tagged("IOUT  0.012A\r\n", "IOUT", "A"), Some(0.012));
        assert_eq!(parse_tagged("VOUT -1.500V\r\n", "VOUT", "V"), Some(-1.5));
        assert_eq!(parse_tagged("ISET 10.000A", "ISET", "A"), Some(10.0));
        assert_eq!(parse_tagged("ISET garbage", "ISET", "A"), None);
        assert_eq!(parse_tagged("VOUT 1.0V", "IOUT", "A"), None);
    }

    #[test]
    fn output_state() {
        assert_eq!(parse_output("OUT 001\r\n"), Some(true));
        assert_eq!(parse_output("OUT 000\r\n"), Some(false));
        assert_eq!(parse_output("ERR\r\n"), None);
    }

    #[test]
    fn fine_value() {
        assert_eq!(parse_fine("IFINE -25\r\n"), Some(-25));
        assert_eq!(parse_fine("IFINE 1V\r\n"), Some(1));
        assert_eq!(parse_fine("IFINE 200\r\n"), None);
    }

    #[test]
    fn commands() {
        assert_eq!(set_current(1.2344), "ISET 1.234");
        assert_eq!(set_current(-0.1), "ISET -0.100");
        assert_eq!(set_fine(-128), "IFINE -128");
        assert_eq!(set_output(true), "OUT 1");
        assert_eq!(set_range(2), "RANGE 2");
        assert_eq!(parse_field(" 102.3\r\n"), Some(102.3));
        assert_eq!(parse_range("2\r\n"), Some(2));
    }
}
