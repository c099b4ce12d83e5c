//! Device line parsing.

pub mod parser;

pub use parser::{parse_line, ParsedLine, HUMIDITY_MARKER, TEMPERATURE_MARKER};
