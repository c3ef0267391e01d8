//! Export helpers for bridge values.

pub mod io_value;
pub mod json;
