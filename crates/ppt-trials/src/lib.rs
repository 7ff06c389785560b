//! PPT Training Trial Log
//!
//! Ordered, append-oriented log of trial records. The only mutations are
//! appending one entry and atomically replacing the whole sequence.

mod entry;
mod manager;

pub use entry::TrialLogEntry;
pub use manager::TrialLogManager;
