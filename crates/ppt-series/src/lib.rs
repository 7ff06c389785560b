//! PPT Training Series
//!
//! Named series records keyed by `id`. A series without an `id` is never
//! stored anywhere.

mod manager;
mod series;

pub use manager::SeriesManager;
pub use series::Series;
