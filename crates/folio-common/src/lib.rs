//! Common utilities for Folio.
//!
//! This crate provides shared infrastructure used by all Folio components:
//! - **Warning System** - colored, de-duplicated terminal warnings for
//!   unsupported style values and configuration problems
//! - **Timing** - pass timers and human-readable durations for summaries

pub mod timing;
pub mod warning;
