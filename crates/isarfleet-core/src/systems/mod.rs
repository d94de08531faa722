//! Systems - per-tick logic that turns a snapshot into a batch of updates

mod navigation;

pub use navigation::*;
