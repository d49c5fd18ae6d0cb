//! Live step reporting

pub mod reporter;
