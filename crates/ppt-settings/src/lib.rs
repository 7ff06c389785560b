//! PPT Training Settings
//!
//! Key-value user settings. Values are opaque JSON; reads never fail and a
//! missing key reads as `None`.

mod manager;

pub use manager::SettingsManager;
