//! Scroll sequence synthesis.
//!
//! Desktop scrolling is incremental wheel deltas with occasional long
//! "reading" pauses. Mobile scrolling is a multi-point touch drag with a
//! decelerating vertical profile and slight horizontal wobble, followed
//! by a quick/medium/long pause.

use crate::engine::InputEvent;
use crate::timing::Randomizer;

use super::plan::TimedInput;

/// Wheel delta bounds per increment, in CSS pixels.
const WHEEL_MIN: u64 = 80;
const WHEEL_MAX: u64 = 250;

/// Chance of a long reading pause after a wheel increment.
const READING_PAUSE_CHANCE: f64 = 0.18;

/// Incremental wheel scrolling covering roughly `total_px`.
pub fn desktop_scroll_plan(total_px: f64, rng: &mut Randomizer) -> Vec<TimedInput> {
    let mut plan = Vec::new();
    let mut covered = 0.0;

    while covered < total_px {
        let delta = rng.range_u64(WHEEL_MIN, WHEEL_MAX + 1) as f64;
        plan.push(TimedInput::new(
            rng.delay_ms(120, 420),
            InputEvent::Wheel { delta_x: 0.0, delta_y: delta },
        ));
        covered += delta;

        if rng.chance(READING_PAUSE_CHANCE) {
            plan.push(TimedInput::wait(rng.delay_ms(1500, 4000)));
        }
    }

    plan
}

/// Simulated touch drags covering roughly `total_px` of content, on a
/// viewport of `(width, height)` CSS pixels.
pub fn mobile_scroll_plan(
    total_px: f64,
    viewport: (f64, f64),
    rng: &mut Randomizer,
) -> Vec<TimedInput> {
    let (vw, vh) = viewport;
    let mut plan = Vec::new();
    let mut covered = 0.0;

    while covered < total_px {
        // Finger travel on screen; content moves further with momentum.
        let screen_drag = rng.range_f64(vh * 0.25, vh * 0.45);
        let momentum = rng.range_f64(1.4, 2.2);

        let center_x = vw / 2.0 + rng.range_f64(-vw * 0.1, vw * 0.1);
        let start_y = vh * rng.range_f64(0.6, 0.75);
        let points = rng.range_usize(6, 11);

        plan.push(TimedInput::new(
            rng.delay_ms(60, 180),
            InputEvent::TouchStart { x: center_x, y: start_y },
        ));

        for i in 1..=points {
            let t = i as f64 / points as f64;
            // Deceleration curve: fast start, eased landing.
            let eased = 1.0 - (1.0 - t) * (1.0 - t);
            let y = start_y - screen_drag * eased;
            let x = center_x + rng.range_f64(-6.0, 6.0);
            plan.push(TimedInput::new(
                rng.delay_ms(12, 30),
                InputEvent::TouchMove { x, y },
            ));
        }

        plan.push(TimedInput::new(rng.delay_ms(10, 40), InputEvent::TouchEnd));
        covered += screen_drag * momentum;

        // Variable-length pause after the drag.
        let pause = match rng.weighted_pick(&[2, 3, 1]) {
            0 => rng.delay_ms(150, 400),   // quick
            1 => rng.delay_ms(600, 1500),  // medium
            _ => rng.delay_ms(2000, 4500), // long
        };
        plan.push(TimedInput::wait(pause));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_deltas_within_bounds() {
        let mut rng = Randomizer::seeded(4);
        let plan = desktop_scroll_plan(3000.0, &mut rng);
        let mut total = 0.0;
        for step in &plan {
            if let InputEvent::Wheel { delta_y, .. } = step.input {
                assert!((WHEEL_MIN as f64..=WHEEL_MAX as f64).contains(&delta_y));
                total += delta_y;
            }
        }
        assert!(total >= 3000.0);
    }

    #[test]
    fn test_mobile_drag_shape() {
        let mut rng = Randomizer::seeded(8);
        let plan = mobile_scroll_plan(1200.0, (390.0, 844.0), &mut rng);

        // Every drag is TouchStart .. TouchMove+ .. TouchEnd.
        let mut in_drag = false;
        let mut last_y = f64::MAX;
        for step in &plan {
            match step.input {
                InputEvent::TouchStart { y, .. } => {
                    assert!(!in_drag);
                    in_drag = true;
                    last_y = y;
                }
                InputEvent::TouchMove { y, .. } => {
                    assert!(in_drag);
                    // Finger only moves upward within a drag.
                    assert!(y < last_y);
                    last_y = y;
                }
                InputEvent::TouchEnd => {
                    assert!(in_drag);
                    in_drag = false;
                }
                _ => {}
            }
        }
        assert!(!in_drag);
    }

    #[test]
    fn test_mobile_profile_decelerates() {
        let mut rng = Randomizer::seeded(12);
        let plan = mobile_scroll_plan(400.0, (390.0, 844.0), &mut rng);

        // Per-step finger travel shrinks toward the end of each drag.
        let mut deltas: Vec<f64> = Vec::new();
        let mut prev: Option<f64> = None;
        for step in &plan {
            match step.input {
                InputEvent::TouchStart { y, .. } => {
                    deltas.clear();
                    prev = Some(y);
                }
                InputEvent::TouchMove { y, .. } => {
                    if let Some(p) = prev {
                        deltas.push(p - y);
                    }
                    prev = Some(y);
                }
                InputEvent::TouchEnd => {
                    assert!(deltas.len() >= 2);
                    assert!(deltas.first().unwrap() > deltas.last().unwrap());
                    prev = None;
                }
                _ => {}
            }
        }
    }
}
