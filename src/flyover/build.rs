//! One-time world construction
//!
//! Static castle geometry is pure layout (shared constants plus the shader);
//! what gets built here is the ambient population with its randomized
//! parameters.

use glam::{Vec2, Vec3};
use rand::Rng;

use super::state::{
    CITIZEN_COUNT, CITIZEN_MARGIN, CLOUD_COUNT, Cannon, Citizen, Cloud, HORSE_COUNT,
    HORSE_MARGIN, Horse, PATROL_COUNT, Patrol, World,
};
use crate::consts::{CASTLE_BASE, CASTLE_HALF, WALL_HEIGHT};

impl World {
    pub(super) fn populate(&mut self) {
        self.spawn_patrols();
        self.spawn_cannons();
        self.spawn_citizens();
        self.spawn_horses();
        self.spawn_clouds();
    }

    fn spawn_patrols(&mut self) {
        for _ in 0..PATROL_COUNT {
            self.patrols.push(Patrol {
                t: self.rng.random_range(0.0..1.0),
                speed: self.rng.random_range(0.02..0.04),
            });
        }
    }

    fn spawn_cannons(&mut self) {
        let half = CASTLE_HALF;
        let y = CASTLE_BASE + WALL_HEIGHT + 1.0;
        // Four corners plus the midpoint of each wall
        let stations = [
            Vec2::new(-half, -half),
            Vec2::new(half, -half),
            Vec2::new(-half, half),
            Vec2::new(half, half),
            Vec2::new(0.0, -half),
            Vec2::new(0.0, half),
            Vec2::new(-half, 0.0),
            Vec2::new(half, 0.0),
        ];
        for s in stations {
            let cooldown = self.rng.random_range(1.0..3.5);
            self.cannons.push(Cannon {
                pos: Vec3::new(s.x, y, s.y),
                yaw: s.y.atan2(s.x),
                cooldown,
                timer: self.rng.random_range(0.0..cooldown),
            });
        }
    }

    fn spawn_citizens(&mut self) {
        let bound = CASTLE_HALF - CITIZEN_MARGIN;
        for _ in 0..CITIZEN_COUNT {
            let pos = Vec2::new(
                self.rng.random_range(-bound..bound),
                self.rng.random_range(-bound..bound),
            );
            self.citizens.push(Citizen {
                pos,
                heading: self.rng.random_range(0.0..std::f32::consts::TAU),
                speed: self.rng.random_range(10.0..22.0),
                target: None,
            });
        }
    }

    fn spawn_horses(&mut self) {
        let bound = CASTLE_HALF - HORSE_MARGIN * 2.0;
        for _ in 0..HORSE_COUNT {
            self.horses.push(Horse {
                pos: Vec2::new(
                    self.rng.random_range(-bound..bound),
                    self.rng.random_range(-bound..bound),
                ),
                heading: self.rng.random_range(0.0..std::f32::consts::TAU),
                speed: self.rng.random_range(14.0..28.0),
                bob_phase: self.rng.random_range(0.0..std::f32::consts::TAU),
            });
        }
    }

    fn spawn_clouds(&mut self) {
        for _ in 0..CLOUD_COUNT {
            let r = self.rng.random_range(1200.0..2400.0);
            let a = self.rng.random_range(0.0..std::f32::consts::TAU);
            self.clouds.push(Cloud {
                pos: Vec3::new(
                    a.cos() * r,
                    self.rng.random_range(700.0..980.0),
                    a.sin() * r,
                ),
                scale: self.rng.random_range(200.0..700.0),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_counts() {
        let world = World::new(11);
        assert_eq!(world.patrols.len(), PATROL_COUNT);
        assert_eq!(world.cannons.len(), 8);
        assert_eq!(world.citizens.len(), CITIZEN_COUNT);
        assert_eq!(world.horses.len(), HORSE_COUNT);
        assert_eq!(world.clouds.len(), CLOUD_COUNT);
        assert!(world.projectiles.is_empty());
        assert!(world.puffs.is_empty());
    }

    #[test]
    fn test_cannons_sit_on_walls() {
        let world = World::new(12);
        for c in &world.cannons {
            let on_wall_line = c.pos.x.abs() == CASTLE_HALF || c.pos.z.abs() == CASTLE_HALF;
            assert!(on_wall_line, "cannon off the wall at {:?}", c.pos);
            assert_eq!(c.pos.y, CASTLE_BASE + WALL_HEIGHT + 1.0);
            assert!(c.timer < c.cooldown);
        }
    }

    #[test]
    fn test_cannons_point_outward() {
        let world = World::new(13);
        for c in &world.cannons {
            let outward = Vec2::new(c.pos.x, c.pos.z).normalize();
            let facing = Vec2::new(c.yaw.cos(), c.yaw.sin());
            assert!(outward.dot(facing) > 0.5, "cannon aims inward at {:?}", c.pos);
        }
    }

    #[test]
    fn test_citizens_start_inside_walls() {
        let world = World::new(14);
        let bound = CASTLE_HALF - CITIZEN_MARGIN;
        for c in &world.citizens {
            assert!(c.pos.x.abs() <= bound);
            assert!(c.pos.y.abs() <= bound);
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = World::new(99);
        let b = World::new(99);
        assert_eq!(a.patrols, b.patrols);
        assert_eq!(a.cannons, b.cannons);
        assert_eq!(a.citizens, b.citizens);
        assert_eq!(a.horses, b.horses);
        assert_eq!(a.clouds, b.clouds);
    }
}
