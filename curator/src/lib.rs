pub mod consolidate;
pub mod schedule;

pub use consolidate::{run_once, CuratorLimits, CuratorReport};
