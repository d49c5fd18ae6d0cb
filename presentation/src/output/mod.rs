//! Console and JSON output

pub mod console;
