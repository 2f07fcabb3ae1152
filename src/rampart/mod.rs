//! 2D castle wall vignette
//!
//! Deterministic sim for the rampart scene: guards pacing the walkway,
//! horses trotting the field, balloons drifting up for the pop minigame.
//! No rendering or platform dependencies; the host calls `tick` once per
//! frame with the clamped delta time and the current pointer state.

pub mod layout;
pub mod state;
pub mod tick;

pub use layout::Layout;
pub use state::{Balloon, Guard, Horse, Particle, SceneEvent, SceneState};
pub use tick::{FrameInput, tick};
