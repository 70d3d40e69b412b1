//! Core Primitives
//!
//! Small building blocks shared by the game and network layers:
//!
//! - `vec2`: 2D float vector for aiming, offsets, impulses
//! - `clock`: injectable clock sources for cooldown and lifetime timing

pub mod clock;
pub mod vec2;

pub use clock::{Clock, ManualClock, TickClock};
pub use vec2::Vec2;
