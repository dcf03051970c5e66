//! Report module - text report, JSON history and console summaries

pub mod history;
pub mod summary;
pub mod writer;

pub use history::*;
pub use summary::*;
pub use writer::*;
