//! Human behavior simulation module
//!
//! Pure timing/geometry generators for typing, pointer motion, scrolling,
//! idle fidgeting and on-page dwell. Every routine takes a `Randomizer`
//! and produces a replayable plan; nothing here touches the engine except
//! the `play` executor that dispatches a finished plan.

mod dwell;
mod idle;
mod plan;
mod pointer;
mod scroll;
mod typing;

pub use dwell::{dwell_plan, DwellContext};
pub use idle::idle_plan;
pub use plan::{plan_duration, play, TimedInput};
pub use pointer::{click_plan, pointer_path};
pub use scroll::{desktop_scroll_plan, mobile_scroll_plan};
pub use typing::typing_plan;
