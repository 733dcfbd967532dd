//! Browser engine boundary
//!
//! The journey core never renders pages or walks the DOM itself; an
//! external automation engine implements `SearchPage` and hands the core
//! pre-classified page snapshots and low-level input dispatch.

mod errors;
mod page;

pub use errors::PageError;
pub use page::{
    ChallengeWidget, Cookie, InputEvent, Listing, ListingKind, PageRect, PageSnapshot, SearchPage,
};
