//! On-page dwell behavior.
//!
//! After a target click, the journey must look like real reading: a quick
//! initial scan, then a weighted-random mix of read-scrolls, scroll-backs,
//! hovers, idling and fast scrolls until the dwell budget is nearly spent,
//! closing with a scroll-to-end and settle.

use std::time::Duration;

use crate::engine::InputEvent;
use crate::timing::Randomizer;
use crate::DeviceClass;

use super::idle::idle_plan;
use super::plan::{plan_duration, TimedInput};
use super::pointer::pointer_path;
use super::scroll::{desktop_scroll_plan, mobile_scroll_plan};

/// Page geometry the dwell planner works within.
#[derive(Debug, Clone)]
pub struct DwellContext {
    pub device: DeviceClass,
    pub viewport: (f64, f64),
    pub page_height: f64,
}

impl DwellContext {
    fn scroll(&self, px: f64, rng: &mut Randomizer) -> Vec<TimedInput> {
        match self.device {
            DeviceClass::Desktop => desktop_scroll_plan(px, rng),
            DeviceClass::Mobile => mobile_scroll_plan(px, self.viewport, rng),
        }
    }
}

/// Generate a full dwell plan consuming roughly `budget`.
pub fn dwell_plan(budget: Duration, ctx: &DwellContext, rng: &mut Randomizer) -> Vec<TimedInput> {
    let mut plan: Vec<TimedInput> = Vec::new();
    let (vw, vh) = ctx.viewport;

    // Initial quick scan down the first screenful.
    plan.extend(ctx.scroll(rng.range_f64(vh * 0.3, vh * 0.6), rng));
    plan.push(TimedInput::wait(rng.delay_ms(600, 1400)));

    // Keep ~12% of the budget for the closing phase.
    let main_budget = budget.mul_f64(0.88);

    while plan_duration(&plan) < main_budget {
        let mut step: Vec<TimedInput> = Vec::new();
        match rng.weighted_pick(&[4, 1, 1, 2, 1]) {
            0 => {
                // Read and scroll on.
                step.extend(ctx.scroll(rng.range_f64(120.0, 420.0), rng));
                step.push(TimedInput::wait(rng.delay_ms(800, 2500)));
            }
            1 => {
                // Re-read something above.
                step.push(TimedInput::new(
                    rng.delay_ms(150, 400),
                    InputEvent::Wheel {
                        delta_x: 0.0,
                        delta_y: -rng.range_f64(60.0, 150.0),
                    },
                ));
                step.push(TimedInput::wait(rng.delay_ms(500, 1200)));
            }
            2 => {
                // Hover something without clicking.
                let from = (rng.range_f64(0.2, 0.8) * vw, rng.range_f64(0.2, 0.8) * vh);
                let to = (rng.range_f64(0.15, 0.85) * vw, rng.range_f64(0.25, 0.75) * vh);
                step.extend(pointer_path(from, to, rng));
                step.push(TimedInput::wait(rng.delay_ms(400, 1100)));
            }
            3 => {
                let idle_budget = rng.delay_ms(1000, 3000);
                step.extend(idle_plan(idle_budget, (vw / 2.0, vh / 2.0), rng));
            }
            _ => {
                // Skim quickly past uninteresting content.
                for _ in 0..rng.range_usize(3, 7) {
                    step.push(TimedInput::new(
                        rng.delay_ms(40, 90),
                        InputEvent::Wheel {
                            delta_x: 0.0,
                            delta_y: rng.range_f64(200.0, 250.0),
                        },
                    ));
                }
            }
        }

        if plan_duration(&plan) + plan_duration(&step) > main_budget && !plan.is_empty() {
            break;
        }
        plan.extend(step);
    }

    // Closing phase: run toward the end of the page and settle.
    let remaining = (ctx.page_height - vh).max(0.0);
    if remaining > 0.0 {
        plan.extend(ctx.scroll(rng.range_f64(400.0, 900.0).min(remaining), rng));
    }
    plan.push(TimedInput::wait(rng.delay_ms(1200, 2500)));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DwellContext {
        DwellContext {
            device: DeviceClass::Desktop,
            viewport: (1280.0, 720.0),
            page_height: 4200.0,
        }
    }

    #[test]
    fn test_dwell_fills_most_of_budget() {
        for seed in 0..20 {
            let mut rng = Randomizer::seeded(seed);
            let budget = Duration::from_secs(30);
            let plan = dwell_plan(budget, &ctx(), &mut rng);
            let total = plan_duration(&plan);
            assert!(total >= budget.mul_f64(0.3), "dwell too short: {total:?}");
            assert!(total <= budget + Duration::from_secs(15), "dwell too long: {total:?}");
        }
    }

    #[test]
    fn test_dwell_ends_with_settle_pause() {
        let mut rng = Randomizer::seeded(6);
        let plan = dwell_plan(Duration::from_secs(20), &ctx(), &mut rng);
        let last = plan.last().unwrap();
        assert!(matches!(last.input, InputEvent::Wait));
        assert!(last.delay >= Duration::from_millis(1200));
    }

    #[test]
    fn test_mobile_dwell_uses_touch() {
        let mut rng = Randomizer::seeded(17);
        let mobile = DwellContext {
            device: DeviceClass::Mobile,
            viewport: (390.0, 844.0),
            page_height: 6000.0,
        };
        let plan = dwell_plan(Duration::from_secs(25), &mobile, &mut rng);
        assert!(plan.iter().any(|s| matches!(s.input, InputEvent::TouchMove { .. })));
    }
}
