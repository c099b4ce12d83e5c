//! Line grammar for the temperature/humidity sensor.
//!
//! The device prints one reading per line:
//!
//! ```text
//! Temperatura: 23.5 C\tHumedad: 60.2 %
//! ```
//!
//! Accepted shapes:
//! - exactly two fields separated by a tab (spaces around the tab are fine)
//! - each field is `<label>: <number> [unit]`
//! - field order is either temperature first or humidity first
//! - temperature units: `C`, `°C`, `ºC`; humidity unit: `%`; the unit may be
//!   omitted, but a different unit makes the line malformed
//!
//! Lines that do not carry both labels are [`ParsedLine::Unrecognized`]
//! (boot banners, blank lines, sensor warnings). Lines that carry both labels
//! but break the grammar are [`ParsedLine::Malformed`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Label that introduces the temperature field.
pub const TEMPERATURE_MARKER: &str = "Temperatura:";
/// Label that introduces the humidity field.
pub const HUMIDITY_MARKER: &str = "Humedad:";

const TEMPERATURE_UNITS: &[&str] = &["C", "°C", "ºC"];
const HUMIDITY_UNITS: &[&str] = &["%"];

#[allow(clippy::expect_used)]
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<label>Temperatura|Humedad):\s*(?P<value>\S+)(?:\s+(?P<unit>\S+))?\s*$")
        .expect("field pattern is valid")
});

// Plain decimal notation only, so "inf" and "NaN" are rejected.
#[allow(clippy::expect_used)]
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$")
        .expect("number pattern is valid")
});

/// Outcome of parsing one device line.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedLine {
    /// Both values were read.
    Reading {
        /// °C
        temperature: f64,
        /// %
        humidity: f64,
    },
    /// Both markers are present but the line does not follow the grammar.
    Malformed(String),
    /// At least one marker is missing.
    Unrecognized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Temperatura" => Some(Quantity::Temperature),
            "Humedad" => Some(Quantity::Humidity),
            _ => None,
        }
    }

    fn accepts_unit(self, unit: &str) -> bool {
        match self {
            Quantity::Temperature => TEMPERATURE_UNITS.contains(&unit),
            Quantity::Humidity => HUMIDITY_UNITS.contains(&unit),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Temperature => write!(f, "temperature"),
            Quantity::Humidity => write!(f, "humidity"),
        }
    }
}

fn parse_field(field: &str) -> Result<(Quantity, f64), String> {
    let caps = FIELD_RE
        .captures(field)
        .ok_or_else(|| format!("field '{}' is not '<label>: <value> [unit]'", field.trim()))?;

    let quantity = Quantity::from_label(&caps["label"])
        .ok_or_else(|| format!("unknown label in '{}'", field.trim()))?;

    let raw = &caps["value"];
    if !NUMBER_RE.is_match(raw) {
        return Err(format!("{} value '{}' is not a number", quantity, raw));
    }
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("{} value '{}': {}", quantity, raw, e))?;

    if let Some(unit) = caps.name("unit") {
        if !quantity.accepts_unit(unit.as_str()) {
            return Err(format!(
                "unexpected {} unit '{}'",
                quantity,
                unit.as_str()
            ));
        }
    }

    Ok((quantity, value))
}

/// Parses one (already trimmed or untrimmed) line from the device.
pub fn parse_line(line: &str) -> ParsedLine {
    if !(line.contains(TEMPERATURE_MARKER) && line.contains(HUMIDITY_MARKER)) {
        return ParsedLine::Unrecognized;
    }

    let fields: Vec<&str> = line.trim().split('\t').collect();
    if fields.len() != 2 {
        return ParsedLine::Malformed(format!(
            "expected 2 tab-separated fields, found {}",
            fields.len()
        ));
    }

    let mut temperature = None;
    let mut humidity = None;
    for field in fields {
        match parse_field(field) {
            Ok((Quantity::Temperature, v)) if temperature.is_none() => temperature = Some(v),
            Ok((Quantity::Humidity, v)) if humidity.is_none() => humidity = Some(v),
            Ok((quantity, _)) => {
                return ParsedLine::Malformed(format!("{} field appears twice", quantity))
            }
            Err(reason) => return ParsedLine::Malformed(reason),
        }
    }

    match (temperature, humidity) {
        (Some(temperature), Some(humidity)) => ParsedLine::Reading {
            temperature,
            humidity,
        },
        _ => ParsedLine::Malformed("missing temperature or humidity field".to_string()),
    }
}
