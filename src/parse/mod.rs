//! Parsers for service-manager and journal text output
//!
//! The external tools are treated as black boxes whose text is the input
//! contract. Each parser is a pure function over that text.

mod journal;
mod status;
mod units;

pub use journal::parse_journal;
pub use status::{parse_status, StatusRecord, STATUS_GLYPHS};
pub use units::{parse_units, UnitRecord};
