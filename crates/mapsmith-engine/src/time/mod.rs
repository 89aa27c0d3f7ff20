//! Time utilities.
//!
//! Everything here takes `now: Instant` from the caller instead of reading
//! the clock itself, so state machines built on top stay deterministic in
//! tests.

mod timer;

pub use timer::Timer;
