//! Target scoring module
//!
//! Scores result-page candidates against a target business/domain and
//! selects the first candidate that clears the match threshold.

mod engine;

pub use engine::{
    CandidateSource, MatchCandidate, TargetSpec, MATCH_THRESHOLD, host_of, is_match, score,
    select_match,
};
