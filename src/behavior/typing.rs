//! Typing cadence synthesis.
//!
//! Keystrokes come out in bursts of 3-8 characters, each burst with its
//! own base speed. A small per-character probability injects an
//! adjacent-key typo followed by a pause and a backspace correction, and
//! the space character earns a longer pause - the rhythm real typists
//! leave in input-event timing.

use crate::engine::InputEvent;
use crate::timing::Randomizer;

use super::plan::TimedInput;

/// Probability of an adjacent-key typo per character.
const TYPO_CHANCE: f64 = 0.03;
/// Probability of a pause between bursts.
const BURST_PAUSE_CHANCE: f64 = 0.3;

/// Generate the keystroke plan for typing `text`.
pub fn typing_plan(text: &str, rng: &mut Randomizer) -> Vec<TimedInput> {
    let chars: Vec<char> = text.chars().collect();
    let mut plan = Vec::with_capacity(chars.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        // Each burst types at its own speed.
        let burst_len = rng.range_usize(3, 9);
        let burst_base_ms = rng.range_u64(45, 140);

        let mut typed_in_burst = 0;
        while typed_in_burst < burst_len && i < chars.len() {
            let c = chars[i];
            let delay = rng.jitter(burst_base_ms, 40);

            if i > 0 && c.is_ascii_alphanumeric() && rng.chance(TYPO_CHANCE) {
                if let Some(wrong) = adjacent_key(c, rng) {
                    plan.push(TimedInput::new(delay, InputEvent::KeyChar(wrong)));
                    // Noticing the mistake, then correcting it.
                    plan.push(TimedInput::wait(rng.delay_ms(200, 500)));
                    plan.push(TimedInput::new(rng.delay_ms(80, 200), InputEvent::KeyBackspace));
                    plan.push(TimedInput::new(rng.delay_ms(100, 250), InputEvent::KeyChar(c)));
                    i += 1;
                    typed_in_burst += 1;
                    continue;
                }
            }

            plan.push(TimedInput::new(delay, InputEvent::KeyChar(c)));
            if c == ' ' {
                plan.push(TimedInput::wait(rng.delay_ms(120, 380)));
            }
            i += 1;
            typed_in_burst += 1;
        }

        if i < chars.len() && rng.chance(BURST_PAUSE_CHANCE) {
            plan.push(TimedInput::wait(rng.delay_ms(300, 900)));
        }
    }

    plan
}

/// A neighboring key on a QWERTY layout, for realistic typos.
fn adjacent_key(c: char, rng: &mut Randomizer) -> Option<char> {
    const ROWS: [&str; 4] = ["1234567890", "qwertyuiop", "asdfghjkl", "zxcvbnm"];

    let lower = c.to_ascii_lowercase();
    for row in ROWS {
        if let Some(pos) = row.find(lower) {
            let keys: Vec<char> = row.chars().collect();
            let neighbor = if pos == 0 {
                keys[1]
            } else if pos == keys.len() - 1 {
                keys[pos - 1]
            } else if rng.chance(0.5) {
                keys[pos - 1]
            } else {
                keys[pos + 1]
            };
            return Some(if c.is_ascii_uppercase() {
                neighbor.to_ascii_uppercase()
            } else {
                neighbor
            });
        }
    }
    None
}
