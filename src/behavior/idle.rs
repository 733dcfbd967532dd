//! Idle "thinking" behavior.
//!
//! While a journey pauses to think, the pointer wiggles, the page
//! micro-scrolls, or nothing happens at all - interleaved randomly for a
//! bounded total duration.

use std::time::Duration;

use crate::engine::InputEvent;
use crate::timing::Randomizer;

use super::plan::{plan_duration, TimedInput};

/// Generate idle behavior around pointer position `around`, not exceeding
/// `budget`.
pub fn idle_plan(budget: Duration, around: (f64, f64), rng: &mut Randomizer) -> Vec<TimedInput> {
    let mut plan: Vec<TimedInput> = Vec::new();

    while plan_duration(&plan) < budget {
        let mut step: Vec<TimedInput> = Vec::new();
        match rng.weighted_pick(&[2, 1, 2]) {
            0 => {
                // Small pointer wiggles near the current position.
                for _ in 0..rng.range_usize(2, 5) {
                    let x = around.0 + rng.range_f64(-30.0, 30.0);
                    let y = around.1 + rng.range_f64(-20.0, 20.0);
                    step.push(TimedInput::new(
                        rng.delay_ms(80, 250),
                        InputEvent::PointerMove { x, y },
                    ));
                }
            }
            1 => {
                // Micro-scroll up or down.
                let delta = rng.range_f64(20.0, 45.0) * if rng.chance(0.5) { 1.0 } else { -1.0 };
                step.push(TimedInput::new(
                    rng.delay_ms(150, 400),
                    InputEvent::Wheel { delta_x: 0.0, delta_y: delta },
                ));
            }
            _ => {
                step.push(TimedInput::wait(rng.delay_ms(300, 1200)));
            }
        }

        // Stay within budget: drop the step that would overshoot.
        if plan_duration(&plan) + plan_duration(&step) > budget && !plan.is_empty() {
            break;
        }
        plan.extend(step);
    }

    plan
}
