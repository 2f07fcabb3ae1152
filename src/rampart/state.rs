//! Scene state and entity types for the rampart vignette

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::layout::Layout;

/// Number of balloon palette entries the renderer knows about
pub const BALLOON_COLORS: u32 = 6;
/// Guards pacing the walkway
pub const GUARD_COUNT: usize = 6;
/// Horses on the field
pub const HORSE_COUNT: usize = 3;
/// Hard cap on pop-burst particles
pub const MAX_PARTICLES: usize = 256;

/// Minimum balloons kept aloft regardless of canvas width
pub const BALLOON_MIN_TARGET: usize = 8;
/// One extra balloon per this many CSS pixels of width
pub const BALLOON_WIDTH_PER_TARGET: f32 = 140.0;

/// A balloon drifting up the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balloon {
    pub pos: Vec2,
    pub radius: f32,
    /// Vertical velocity (negative: up the screen)
    pub vy: f32,
    pub sway_amp: f32,
    pub sway_freq: f32,
    pub sway_phase: f32,
    /// Palette index in [0, BALLOON_COLORS)
    pub color: u32,
    /// Set by a successful click; the updater removes popped balloons
    pub popped: bool,
}

/// A guard pacing between the walkway ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guard {
    /// Distance along the walkway from its left end
    pub progress: f32,
    pub speed: f32,
    /// +1.0 walking right, -1.0 walking left
    pub dir: f32,
}

/// A horse trotting along the ground line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horse {
    pub x: f32,
    pub speed: f32,
    pub dir: f32,
    /// Gait offset so the herd doesn't bob in unison
    pub phase: f32,
}

/// Pop-burst particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds remaining; doubles as the render alpha
    pub life: f32,
    pub color: u32,
}

/// Side effects produced by a tick, drained by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    BalloonPopped { pos: Vec2, color: u32 },
}

/// The whole rampart scene: one owner, mutated only by `tick`
pub struct SceneState {
    pub seed: u64,
    pub elapsed: f32,
    pub score: u32,
    /// Pointer position in scene coordinates
    pub pointer: Vec2,
    /// True while the pointer rests on an unpopped balloon
    pub over_balloon: bool,
    pub balloons: Vec<Balloon>,
    pub guards: Vec<Guard>,
    pub horses: Vec<Horse>,
    pub particles: Vec<Particle>,
    pub events: Vec<SceneEvent>,
    rng: Pcg32,
}

impl SceneState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            elapsed: 0.0,
            score: 0,
            pointer: Vec2::new(-1000.0, -1000.0),
            over_balloon: false,
            balloons: Vec::new(),
            guards: Vec::with_capacity(GUARD_COUNT),
            horses: Vec::with_capacity(HORSE_COUNT),
            particles: Vec::with_capacity(MAX_PARTICLES),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Balloon population target for the current canvas width
    pub fn balloon_target(layout: &Layout) -> usize {
        ((layout.w / BALLOON_WIDTH_PER_TARGET) as usize).max(BALLOON_MIN_TARGET)
    }

    /// Top the balloon population back up to the target, never past it
    pub fn ensure_balloons(&mut self, layout: &Layout) {
        let target = Self::balloon_target(layout);
        while self.balloons.len() < target {
            self.spawn_balloon(layout);
        }
    }

    fn spawn_balloon(&mut self, layout: &Layout) {
        let radius = self.rng.random_range(14.0..24.0);
        let x = self.rng.random_range(layout.w * 0.1..layout.w * 0.9);
        let y = layout.h + radius + self.rng.random_range(0.0..60.0);
        let vy = -self.rng.random_range(30.0..50.0);
        let sway_amp = self.rng.random_range(14.0..30.0);
        let sway_freq = self.rng.random_range(0.6..1.4);
        let sway_phase = self.rng.random_range(0.0..std::f32::consts::TAU);
        let color = self.rng.random_range(0..BALLOON_COLORS);
        self.balloons.push(Balloon {
            pos: Vec2::new(x, y),
            radius,
            vy,
            sway_amp,
            sway_freq,
            sway_phase,
            color,
            popped: false,
        });
    }

    /// Seed the guard patrol once the layout is known
    pub fn ensure_guards(&mut self, layout: &Layout) {
        if !self.guards.is_empty() {
            return;
        }
        let path_len = layout.path_len();
        for i in 0..GUARD_COUNT {
            self.guards.push(Guard {
                progress: (i as f32 / GUARD_COUNT as f32) * path_len,
                speed: self.rng.random_range(30.0..50.0),
                dir: if self.rng.random_bool(0.5) { 1.0 } else { -1.0 },
            });
        }
    }

    /// Seed the horses once the layout is known
    pub fn ensure_horses(&mut self, layout: &Layout) {
        if !self.horses.is_empty() {
            return;
        }
        for i in 0..HORSE_COUNT {
            self.horses.push(Horse {
                x: (i as f32 / HORSE_COUNT as f32) * layout.w,
                speed: self.rng.random_range(40.0..70.0),
                dir: if self.rng.random_bool(0.5) { 1.0 } else { -1.0 },
                phase: self.rng.random_range(0.0..std::f32::consts::TAU),
            });
        }
    }

    /// Radial particle burst where a balloon popped
    pub fn spawn_burst(&mut self, pos: Vec2, color: u32) {
        let count = self.rng.random_range(16..28);
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let speed = self.rng.random_range(80.0..200.0);
            self.particles.push(Particle {
                pos,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                life: self.rng.random_range(0.6..1.1),
                color,
            });
        }
    }
}
