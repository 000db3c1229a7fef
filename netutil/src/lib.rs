//! Odds and ends shared by the road network crates: logging setup, timing of long passes, and a
//! way to carry warnings alongside a result.

#[macro_use]
extern crate log;

pub mod logger;
mod time;
mod warn;

pub use crate::time::{elapsed_seconds, prettyprint_time, Timer};
pub use crate::warn::Warn;
