//! Core module
//!
//! Output event definitions and the process-wide static reference tables.

pub mod constants;
pub mod events;

pub use events::*;
