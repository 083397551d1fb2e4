//! rf-core: Shared types for the playback crates
//!
//! Validated volume/rate parameters and the millisecond/second window math
//! sprites are built on.

mod params;
mod time;

pub use params::*;
pub use time::*;
