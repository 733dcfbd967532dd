//! Pointer motion synthesis.
//!
//! Movement toward a target is decomposed into 3-6 intermediate waypoints
//! whose lateral wobble shrinks as the pointer approaches, so the path
//! curves in and settles instead of jumping straight to the destination.

use crate::engine::InputEvent;
use crate::timing::Randomizer;

use super::plan::TimedInput;

/// Generate a waypointed pointer move from `from` to `to`.
pub fn pointer_path(from: (f64, f64), to: (f64, f64), rng: &mut Randomizer) -> Vec<TimedInput> {
    let waypoints = rng.range_usize(3, 7);
    let distance = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
    // Wobble scales with distance but stays sane for short hops.
    let max_wobble = (distance / 6.0).clamp(4.0, 60.0);

    let mut plan = Vec::with_capacity(waypoints + 1);
    for i in 1..=waypoints {
        let t = i as f64 / (waypoints + 1) as f64;
        let wobble = max_wobble * (1.0 - t);
        let x = from.0 + (to.0 - from.0) * t + rng.range_f64(-wobble, wobble);
        let y = from.1 + (to.1 - from.1) * t + rng.range_f64(-wobble, wobble);
        plan.push(TimedInput::new(
            rng.delay_ms(15, 45),
            InputEvent::PointerMove { x, y },
        ));
    }

    // Exact landing on the target.
    plan.push(TimedInput::new(
        rng.delay_ms(20, 60),
        InputEvent::PointerMove { x: to.0, y: to.1 },
    ));
    plan
}

/// Press-and-release at `target` with a human hold time. Callers move the
/// pointer there first via `pointer_path`.
pub fn click_plan(target: (f64, f64), rng: &mut Randomizer) -> Vec<TimedInput> {
    vec![
        TimedInput::new(
            rng.delay_ms(50, 150),
            InputEvent::PointerDown { x: target.0, y: target.1 },
        ),
        TimedInput::new(
            rng.delay_ms(40, 120),
            InputEvent::PointerUp { x: target.0, y: target.1 },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(plan: &[TimedInput]) -> Vec<(f64, f64)> {
        plan.iter()
            .filter_map(|s| match s.input {
                InputEvent::PointerMove { x, y } => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_waypoint_count() {
        for seed in 0..30 {
            let mut rng = Randomizer::seeded(seed);
            let plan = pointer_path((100.0, 100.0), (700.0, 400.0), &mut rng);
            let count = moves(&plan).len();
            // 3-6 intermediate waypoints plus the landing step.
            assert!((4..=7).contains(&count), "got {count} moves");
        }
    }

    #[test]
    fn test_lands_exactly_on_target() {
        let mut rng = Randomizer::seeded(9);
        let plan = pointer_path((0.0, 0.0), (640.0, 360.0), &mut rng);
        let last = *moves(&plan).last().unwrap();
        assert_eq!(last, (640.0, 360.0));
    }

    #[test]
    fn test_wobble_diminishes_toward_target() {
        // Averaged over seeds, early waypoints stray further from the
        // straight line than late ones.
        let from = (0.0, 0.0);
        let to = (900.0, 0.0);
        let mut early = 0.0;
        let mut late = 0.0;
        let mut n = 0.0;

        for seed in 0..100 {
            let mut rng = Randomizer::seeded(seed);
            let pts = moves(&pointer_path(from, to, &mut rng));
            let intermediate = &pts[..pts.len() - 1];
            if intermediate.len() < 2 {
                continue;
            }
            // Straight line is y = 0, so |y| is the lateral deviation.
            early += intermediate.first().unwrap().1.abs();
            late += intermediate.last().unwrap().1.abs();
            n += 1.0;
        }

        assert!(early / n > late / n);
    }

    #[test]
    fn test_click_plan_press_then_release() {
        let mut rng = Randomizer::seeded(2);
        let plan = click_plan((10.0, 20.0), &mut rng);
        assert!(matches!(plan[0].input, InputEvent::PointerDown { .. }));
        assert!(matches!(plan[1].input, InputEvent::PointerUp { .. }));
        let hold = plan[1].delay.as_millis() as u64;
        assert!((40..=120).contains(&hold));
    }
}
