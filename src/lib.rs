//! Castle Vignettes - decorative castle scenes
//!
//! Core modules:
//! - `rampart`: 2D castle wall vignette with the balloon-pop minigame
//! - `flyover`: 3D procedural-terrain castle flyover with patrols and cannons
//! - `noise` / `terrain`: seeded procedural ground shared by sim and shaders
//! - `renderer`: WebGPU fullscreen-SDF pipelines
//! - `audio`: procedural Web Audio effects
//!
//! Both scene sims are deterministic: fixed seeds, caller-supplied delta
//! time, no platform dependencies. The entry point in `main.rs` owns all
//! DOM/browser wiring.

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod flyover;
pub mod noise;
pub mod rampart;
pub mod renderer;
pub mod settings;
pub mod terrain;

pub use settings::{QualityPreset, Settings};
pub use terrain::Terrain;

/// Shared configuration constants
pub mod consts {
    /// Per-frame delta clamp; large gaps (tab switch) advance at most this far
    pub const MAX_FRAME_DT: f32 = 0.033;

    /// Flyover terrain extent (world units per side)
    pub const TERRAIN_SIZE: f32 = 3000.0;
    /// Radius of the flattened build area at the summit
    pub const PLATEAU_RADIUS: f32 = 260.0;
    /// Height the plateau blends toward
    pub const PLATEAU_HEIGHT: f32 = 420.0;

    /// Castle footprint half-extent on the plateau
    pub const CASTLE_HALF: f32 = 160.0;
    pub const WALL_HEIGHT: f32 = 36.0;
    pub const WALL_THICKNESS: f32 = 18.0;
    pub const TOWER_HEIGHT: f32 = 60.0;
    /// Ground level of the castle courtyard (plateau plus foundation slab)
    pub const CASTLE_BASE: f32 = PLATEAU_HEIGHT + 6.0;

    /// Downward acceleration on cannon projectiles (units/s^2)
    pub const PROJECTILE_GRAVITY: f32 = 60.0;
    /// Projectile timeout when it never finds the ground (seconds)
    pub const PROJECTILE_LIFE: f32 = 12.0;

    /// Scripted camera sweep duration (milliseconds)
    pub const CINEMATIC_DURATION_MS: f64 = 14_000.0;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep of `t` clamped to [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Wrap a phase into [0, 1)
#[inline]
pub fn wrap_unit(t: f32) -> f32 {
    let t = t % 1.0;
    if t < 0.0 { t + 1.0 } else { t }
}
