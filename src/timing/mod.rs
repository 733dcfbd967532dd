//! Randomized timing module
//!
//! One injectable random-duration source shared by every component, so
//! behavior routines stay deterministic and testable under a fixed seed.

mod random;

pub use random::{Randomizer, backoff_with_jitter, pause};
