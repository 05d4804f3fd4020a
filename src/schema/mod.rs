//! Input table schema
//!
//! This module reads the two per-participant input logs into ordered,
//! header-indexed tables that the extractors consume.

mod table;

pub use table::*;
