//! Component definitions for the robot world.
//!
//! Each robot record is stored as one `hecs` entity with one component per
//! field. Components are pure data; the store and engine hold the logic.

mod common;
mod robot;

pub use common::*;
pub use robot::*;
