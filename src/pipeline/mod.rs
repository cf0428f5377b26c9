//! Pipeline entry points.
//!
//! - `run_monitor`: fetch the listing, report new announcements, remember them

pub mod monitor;

pub use monitor::{HttpPageSource, PageSource, RunReport, RunState, run_monitor};
