//! Behavior plan primitives.

use std::time::Duration;

use crate::engine::{InputEvent, PageError, SearchPage};
use crate::timing;

/// One step of a behavior plan: wait `delay`, then dispatch `input`.
#[derive(Debug, Clone)]
pub struct TimedInput {
    pub delay: Duration,
    pub input: InputEvent,
}

impl TimedInput {
    pub fn new(delay: Duration, input: InputEvent) -> Self {
        Self { delay, input }
    }

    /// A pure pause with nothing dispatched.
    pub fn wait(delay: Duration) -> Self {
        Self { delay, input: InputEvent::Wait }
    }
}

/// Total wall-clock a plan will take to replay.
pub fn plan_duration(plan: &[TimedInput]) -> Duration {
    plan.iter().map(|s| s.delay).sum()
}

/// Replay a plan against a live page. Each step is a suspension point.
pub async fn play(page: &dyn SearchPage, plan: &[TimedInput]) -> Result<(), PageError> {
    for step in plan {
        timing::pause(step.delay).await;
        if !matches!(step.input, InputEvent::Wait) {
            page.dispatch(step.input).await?;
        }
    }
    Ok(())
}
