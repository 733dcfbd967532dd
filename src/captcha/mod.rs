//! CAPTCHA resolution module
//!
//! Challenge detection, external token solving and the bounded
//! detect-solve-resubmit state machine invoked at every network-dependent
//! checkpoint of a journey.

mod resolver;
mod solver;
mod types;

pub use resolver::{is_challenge_page, CaptchaConfig, CaptchaResolver, CaptchaState, CaptchaVerdict};
pub use solver::{solve, TokenSolver, TwoCaptchaClient};
pub use types::*;
