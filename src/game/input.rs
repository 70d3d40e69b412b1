//! Input Action Translation
//!
//! Converts the per-tick input sample into fire/ultra intents and gates the
//! primary shot on its cooldown timestamp.
//!
//! Firing is level-triggered: true for every tick the aim stick is held away
//! from rest. The ultra intent latches from the button-release edge and is
//! re-assigned from the sample every tick; a caller that stops feeding samples
//! leaves the last value in place. Ultra has no cooldown of its own.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::state::{PlayerState, FIRE_COOLDOWN_SECS};

/// One tick of input from the external input collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Combined movement/aim vector.
    pub aim: Vec2,
    /// True on the tick the ultra button was released.
    pub ultra_released: bool,
}

impl InputSample {
    /// A sample with the stick at rest and no ultra edge.
    pub const fn idle() -> Self {
        Self {
            aim: Vec2::ZERO,
            ultra_released: false,
        }
    }

    /// A sample aiming in the given direction.
    pub const fn aiming(aim: Vec2) -> Self {
        Self {
            aim,
            ultra_released: false,
        }
    }
}

/// Translate a sample into the player's intent flags.
///
/// Both flags are overwritten every call; that reassignment is what resets
/// the ultra latch on ticks without a release edge.
pub fn translate_sample(player: &mut PlayerState, sample: &InputSample) {
    player.firing = sample.aim.length() > 0.0;
    player.using_ultra = sample.ultra_released;
}

/// Whether the primary-shot cooldown has elapsed.
#[inline]
pub fn fire_ready(player: &PlayerState, now: f32) -> bool {
    now >= player.next_shot_time
}

/// Start the primary-shot cooldown after a successful fire.
#[inline]
pub fn arm_fire_cooldown(player: &mut PlayerState, now: f32) {
    player.next_shot_time = now + FIRE_COOLDOWN_SECS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Authority, Element, PlayerId};

    fn player() -> PlayerState {
        PlayerState::new(
            PlayerId::new([1; 16]),
            Element::Fire,
            Authority::Local,
            Vec2::ZERO,
        )
    }

    #[test]
    fn test_firing_is_level_triggered() {
        let mut p = player();

        translate_sample(&mut p, &InputSample::aiming(Vec2::new(0.3, 0.0)));
        assert!(p.firing);

        // Still held: still firing
        translate_sample(&mut p, &InputSample::aiming(Vec2::new(0.3, 0.0)));
        assert!(p.firing);

        // Stick back to rest: firing drops
        translate_sample(&mut p, &InputSample::idle());
        assert!(!p.firing);
    }

    #[test]
    fn test_ultra_latches_from_release_edge() {
        let mut p = player();

        translate_sample(
            &mut p,
            &InputSample {
                aim: Vec2::ZERO,
                ultra_released: true,
            },
        );
        assert!(p.using_ultra);

        // Next tick without an edge resets the latch
        translate_sample(&mut p, &InputSample::idle());
        assert!(!p.using_ultra);
    }

    #[test]
    fn test_fire_cooldown_gating() {
        let mut p = player();

        assert!(fire_ready(&p, 0.0));
        arm_fire_cooldown(&mut p, 0.0);

        assert!(!fire_ready(&p, 0.5));
        assert!(!fire_ready(&p, 0.999));
        assert!(fire_ready(&p, FIRE_COOLDOWN_SECS));
        assert!(fire_ready(&p, 1.5));
    }

    #[test]
    fn test_cooldown_rearms_from_fire_time() {
        let mut p = player();

        arm_fire_cooldown(&mut p, 2.0);
        assert_eq!(p.next_shot_time, 2.0 + FIRE_COOLDOWN_SECS);
    }
}
