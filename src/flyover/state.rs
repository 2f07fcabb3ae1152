//! World state and entity types for the flyover scene

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::{CASTLE_BASE, CASTLE_HALF, WALL_HEIGHT};
use crate::lerp;
use crate::terrain::Terrain;

/// Guards on the wall-walk
pub const PATROL_COUNT: usize = 10;
/// Citizens wandering the courtyard
pub const CITIZEN_COUNT: usize = 30;
/// Horses in the courtyard
pub const HORSE_COUNT: usize = 6;
/// Cloud billboards ringing the mountain
pub const CLOUD_COUNT: usize = 60;

/// Citizens keep this far inside the walls
pub const CITIZEN_MARGIN: f32 = 30.0;
/// Horses keep this far inside the walls
pub const HORSE_MARGIN: f32 = 20.0;

/// A guard walking laps of the square wall-walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patrol {
    /// Normalized perimeter phase in [0, 1)
    pub t: f32,
    /// Laps per second
    pub speed: f32,
}

impl Patrol {
    /// Position and facing yaw for the current phase. The walk is four
    /// straight segments around the wall top, corner to corner.
    pub fn pose(&self) -> (Vec3, f32) {
        use std::f32::consts::{FRAC_PI_2, PI};
        let half = CASTLE_HALF;
        let y = CASTLE_BASE + WALL_HEIGHT + 2.0;
        let d = self.t * half * 8.0;
        let (x, z, yaw) = if d < half * 2.0 {
            (-half + d, -half, 0.0)
        } else if d < half * 4.0 {
            (half, -half + (d - half * 2.0), FRAC_PI_2)
        } else if d < half * 6.0 {
            (half - (d - half * 4.0), half, PI)
        } else {
            (-half, half - (d - half * 6.0), -FRAC_PI_2)
        };
        (Vec3::new(x, y, z), yaw)
    }
}

/// A wall cannon with a randomized firing cadence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cannon {
    pub pos: Vec3,
    /// Facing in the ground plane, pointing away from the keep
    pub yaw: f32,
    /// Seconds between shots; re-rolled after each one
    pub cooldown: f32,
    pub timer: f32,
}

impl Cannon {
    /// Muzzle position at the end of the barrel
    pub fn muzzle(&self) -> Vec3 {
        self.pos + Vec3::new(self.yaw.cos() * 16.0, 3.0, self.yaw.sin() * 16.0)
    }

    /// Launch direction: outward with a fixed upward bias
    pub fn fire_dir(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.26, self.yaw.sin()).normalize()
    }
}

/// A cannonball in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub pos: Vec3,
    pub vel: Vec3,
    /// Seconds until timeout if it never lands
    pub life: f32,
}

/// A courtyard citizen strolling between random waypoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Citizen {
    /// Courtyard-plane position (x, z)
    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub target: Option<Vec2>,
}

/// A courtyard horse on a meandering random walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horse {
    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub bob_phase: f32,
}

/// A drifting cloud billboard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cloud {
    pub pos: Vec3,
    pub scale: f32,
}

/// An impact dust puff; grows and fades, then expires
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustPuff {
    pub pos: Vec3,
    pub vel: Vec3,
    pub age: f32,
    pub life: f32,
    /// Scale gained per second of age
    pub growth: f32,
}

impl DustPuff {
    pub fn scale(&self) -> f32 {
        1.0 + self.age * self.growth
    }

    pub fn opacity(&self) -> f32 {
        lerp(0.8, 0.0, (self.age / self.life).clamp(0.0, 1.0))
    }
}

/// Side effects produced by a tick, drained by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    CannonFired { pos: Vec3 },
    ProjectileLanded { pos: Vec3 },
}

/// The whole flyover world: one owner, mutated only by `tick`
pub struct World {
    pub seed: u64,
    pub time: f32,
    pub terrain: Terrain,
    pub patrols: Vec<Patrol>,
    pub cannons: Vec<Cannon>,
    pub projectiles: Vec<Projectile>,
    pub citizens: Vec<Citizen>,
    pub horses: Vec<Horse>,
    pub clouds: Vec<Cloud>,
    pub puffs: Vec<DustPuff>,
    pub events: Vec<WorldEvent>,
    pub(crate) rng: Pcg32,
}

impl World {
    pub fn new(seed: u64) -> Self {
        let mut world = Self {
            seed,
            time: 0.0,
            terrain: Terrain::new(seed),
            patrols: Vec::with_capacity(PATROL_COUNT),
            cannons: Vec::new(),
            projectiles: Vec::new(),
            citizens: Vec::with_capacity(CITIZEN_COUNT),
            horses: Vec::with_capacity(HORSE_COUNT),
            clouds: Vec::with_capacity(CLOUD_COUNT),
            puffs: Vec::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        };
        world.populate();
        world
    }
}
