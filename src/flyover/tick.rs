//! Per-frame update for the flyover world
//!
//! Single synchronous pass, entity list by entity list. The dust puffs are
//! an explicit timed-effects list advanced here rather than self-scheduled
//! animations, so the whole world stays a pure function of (state, dt).

use glam::{Vec2, Vec3};
use rand::Rng;

use super::state::{CITIZEN_MARGIN, DustPuff, HORSE_MARGIN, Projectile, World, WorldEvent};
use crate::consts::{
    CASTLE_HALF, MAX_FRAME_DT, PROJECTILE_GRAVITY, PROJECTILE_LIFE, TERRAIN_SIZE,
};

/// Cooldown range re-rolled after each shot (seconds)
const REFIRE_RANGE: std::ops::Range<f32> = 2.0..5.5;
/// Muzzle speed range (units/s)
const SHOT_SPEED_RANGE: std::ops::Range<f32> = 180.0..260.0;
/// Projectiles land once they dip this close to the ground
const GROUND_CLEARANCE: f32 = 1.0;
/// Cloud drift velocity (units/s)
const CLOUD_DRIFT: Vec2 = Vec2::new(3.0, 1.0);

/// Advance the world by one frame
pub fn tick(world: &mut World, dt: f32) {
    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    world.time += dt;

    update_patrols(world, dt);
    update_cannons(world, dt);
    update_projectiles(world, dt);
    update_citizens(world, dt);
    update_horses(world, dt);
    update_clouds(world, dt);
    update_puffs(world, dt);
}

fn update_patrols(world: &mut World, dt: f32) {
    for p in &mut world.patrols {
        p.t = crate::wrap_unit(p.t + p.speed * dt);
    }
}

fn update_cannons(world: &mut World, dt: f32) {
    for i in 0..world.cannons.len() {
        world.cannons[i].timer += dt;
        if world.cannons[i].timer < world.cannons[i].cooldown {
            continue;
        }
        world.cannons[i].timer = 0.0;
        world.cannons[i].cooldown = world.rng.random_range(REFIRE_RANGE);

        let muzzle = world.cannons[i].muzzle();
        let dir = world.cannons[i].fire_dir();
        let speed = world.rng.random_range(SHOT_SPEED_RANGE);
        world.projectiles.push(Projectile {
            pos: muzzle,
            vel: dir * speed,
            life: PROJECTILE_LIFE,
        });
        world.events.push(WorldEvent::CannonFired { pos: muzzle });
    }
}

fn update_projectiles(world: &mut World, dt: f32) {
    let World {
        projectiles,
        terrain,
        ..
    } = world;

    let mut impacts: Vec<Vec3> = Vec::new();
    projectiles.retain_mut(|p| {
        p.vel.y -= PROJECTILE_GRAVITY * dt;
        p.pos += p.vel * dt;
        p.life -= dt;

        let ground = terrain.height(p.pos.x, p.pos.z);
        if p.life <= 0.0 || p.pos.y <= ground + GROUND_CLEARANCE {
            impacts.push(Vec3::new(p.pos.x, ground + GROUND_CLEARANCE, p.pos.z));
            false
        } else {
            true
        }
    });

    for pos in impacts {
        spawn_dust(world, pos);
        world.events.push(WorldEvent::ProjectileLanded { pos });
    }
}

fn spawn_dust(world: &mut World, pos: Vec3) {
    let World { puffs, rng, .. } = world;
    let count = rng.random_range(6..12);
    for _ in 0..count {
        puffs.push(DustPuff {
            pos,
            vel: Vec3::new(
                rng.random_range(-6.0..6.0),
                rng.random_range(0.0..14.0),
                rng.random_range(-6.0..6.0),
            ),
            age: 0.0,
            life: rng.random_range(0.8..1.6),
            growth: rng.random_range(1.0..5.0),
        });
    }
}

fn update_citizens(world: &mut World, dt: f32) {
    let World { citizens, rng, .. } = world;
    let bound = CASTLE_HALF - CITIZEN_MARGIN;

    for c in citizens {
        let target = match c.target {
            Some(t) if c.pos.distance(t) >= 4.0 => t,
            _ => {
                let fresh = Vec2::new(
                    rng.random_range(-bound..bound),
                    rng.random_range(-bound..bound),
                );
                c.target = Some(fresh);
                fresh
            }
        };
        let to_target = target - c.pos;
        c.heading = to_target.y.atan2(to_target.x);
        // Citizens stroll at a fifth of their nominal speed
        let step = Vec2::new(c.heading.cos(), c.heading.sin()) * c.speed * dt * 0.2;
        c.pos = (c.pos + step).clamp(Vec2::splat(-bound), Vec2::splat(bound));
    }
}

fn update_horses(world: &mut World, dt: f32) {
    let World { horses, rng, .. } = world;
    let bound = CASTLE_HALF - HORSE_MARGIN;

    for h in horses {
        h.heading += rng.random_range(-0.5..0.5) * dt * 0.8;
        let step = Vec2::new(h.heading.cos(), h.heading.sin()) * h.speed * dt * 0.25;
        let next = h.pos + step;
        // Steps that would leave the courtyard are simply not taken
        if next.x.abs() < bound && next.y.abs() < bound {
            h.pos = next;
        }
        h.bob_phase += dt * 4.0;
    }
}

fn update_clouds(world: &mut World, dt: f32) {
    for c in &mut world.clouds {
        c.pos.x += CLOUD_DRIFT.x * dt;
        c.pos.z += CLOUD_DRIFT.y * dt;
        if c.pos.x > TERRAIN_SIZE {
            c.pos.x = -TERRAIN_SIZE;
        }
        if c.pos.z > TERRAIN_SIZE {
            c.pos.z = -TERRAIN_SIZE;
        }
    }
}

fn update_puffs(world: &mut World, dt: f32) {
    for puff in &mut world.puffs {
        puff.age += dt;
        puff.pos += puff.vel * dt;
    }
    world.puffs.retain(|p| p.age < p.life);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CASTLE_BASE, WALL_HEIGHT};
    use crate::flyover::state::Patrol;
    use proptest::prelude::*;

    #[test]
    fn test_patrols_stay_on_perimeter() {
        let mut world = World::new(21);
        for _ in 0..300 {
            tick(&mut world, 0.016);
        }
        for p in &world.patrols {
            assert!((0.0..1.0).contains(&p.t));
            let (pos, _) = p.pose();
            let on_edge =
                (pos.x.abs() - CASTLE_HALF).abs() < 1e-3 || (pos.z.abs() - CASTLE_HALF).abs() < 1e-3;
            assert!(on_edge, "patrol off the wall-walk at {:?}", pos);
            assert_eq!(pos.y, CASTLE_BASE + WALL_HEIGHT + 2.0);
        }
    }

    #[test]
    fn test_patrol_pose_walks_the_square() {
        let north = Patrol { t: 0.1, speed: 0.0 };
        let (pos, yaw) = north.pose();
        assert_eq!(pos.z, -CASTLE_HALF);
        assert_eq!(yaw, 0.0);

        let east = Patrol { t: 0.35, speed: 0.0 };
        let (pos, _) = east.pose();
        assert_eq!(pos.x, CASTLE_HALF);

        let south = Patrol { t: 0.6, speed: 0.0 };
        let (pos, _) = south.pose();
        assert_eq!(pos.z, CASTLE_HALF);

        let west = Patrol { t: 0.85, speed: 0.0 };
        let (pos, _) = west.pose();
        assert_eq!(pos.x, -CASTLE_HALF);
    }

    #[test]
    fn test_cannon_fires_when_cooldown_elapses() {
        let mut world = World::new(22);
        // Force the first cannon to the brink
        world.cannons[0].timer = world.cannons[0].cooldown - 0.001;
        let before = world.projectiles.len();

        tick(&mut world, 0.016);

        assert!(world.projectiles.len() > before);
        assert!(
            world
                .events
                .iter()
                .any(|e| matches!(e, WorldEvent::CannonFired { .. }))
        );
        assert_eq!(world.cannons[0].timer, 0.0);
        assert!(REFIRE_RANGE.contains(&world.cannons[0].cooldown));
    }

    #[test]
    fn test_projectile_integration_step() {
        let mut world = World::new(23);
        // Keep the cannons quiet so the list stays ours
        for c in &mut world.cannons {
            c.timer = 0.0;
            c.cooldown = 1.0e6;
        }
        let pos = Vec3::new(0.0, 2000.0, 0.0);
        let vel = Vec3::new(100.0, 50.0, 0.0);
        world.projectiles.push(Projectile {
            pos,
            vel,
            life: PROJECTILE_LIFE,
        });

        let dt = 0.016;
        tick(&mut world, dt);

        let p = world.projectiles[0];
        let expected_vel = Vec3::new(vel.x, vel.y - PROJECTILE_GRAVITY * dt, vel.z);
        let expected_pos = pos + expected_vel * dt;
        assert!((p.vel - expected_vel).length() < 1e-3);
        assert!((p.pos - expected_pos).length() < 1e-3);
        assert!((p.life - (PROJECTILE_LIFE - dt)).abs() < 1e-5);
    }

    #[test]
    fn test_projectile_lands_on_terrain() {
        let mut world = World::new(24);
        for c in &mut world.cannons {
            c.timer = 0.0;
            c.cooldown = 1.0e6;
        }
        let ground = world.terrain.height(500.0, 500.0);
        world.projectiles.push(Projectile {
            pos: Vec3::new(500.0, ground + 2.0, 500.0),
            vel: Vec3::new(0.0, -200.0, 0.0),
            life: PROJECTILE_LIFE,
        });

        tick(&mut world, 0.033);

        assert!(world.projectiles.is_empty());
        assert!(!world.puffs.is_empty());
        assert!(
            world
                .events
                .iter()
                .any(|e| matches!(e, WorldEvent::ProjectileLanded { .. }))
        );
    }

    #[test]
    fn test_projectile_times_out() {
        let mut world = World::new(25);
        for c in &mut world.cannons {
            c.timer = 0.0;
            c.cooldown = 1.0e6;
        }
        world.projectiles.push(Projectile {
            pos: Vec3::new(0.0, 5000.0, 0.0),
            vel: Vec3::new(0.0, 100.0, 0.0),
            life: 0.01,
        });

        tick(&mut world, 0.033);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_citizens_confined_to_courtyard() {
        let mut world = World::new(26);
        for _ in 0..600 {
            tick(&mut world, 0.033);
        }
        let bound = CASTLE_HALF - CITIZEN_MARGIN;
        for c in &world.citizens {
            assert!(c.pos.x.abs() <= bound + 1e-3);
            assert!(c.pos.y.abs() <= bound + 1e-3);
        }
    }

    #[test]
    fn test_horses_confined_to_courtyard() {
        let mut world = World::new(27);
        for _ in 0..600 {
            tick(&mut world, 0.033);
        }
        let bound = CASTLE_HALF - HORSE_MARGIN;
        for h in &world.horses {
            assert!(h.pos.x.abs() < bound + 1e-3);
            assert!(h.pos.y.abs() < bound + 1e-3);
        }
    }

    #[test]
    fn test_clouds_wrap_at_terrain_edge() {
        let mut world = World::new(28);
        world.clouds[0].pos.x = TERRAIN_SIZE - 0.01;
        tick(&mut world, 0.033);
        assert!(world.clouds[0].pos.x <= TERRAIN_SIZE);
    }

    #[test]
    fn test_puffs_expire() {
        let mut world = World::new(29);
        world.puffs.push(DustPuff {
            pos: Vec3::ZERO,
            vel: Vec3::Y,
            age: 0.0,
            life: 0.05,
            growth: 2.0,
        });

        tick(&mut world, 0.033);
        assert_eq!(world.puffs.len(), 1);
        tick(&mut world, 0.033);
        assert!(world.puffs.is_empty());
    }

    #[test]
    fn test_same_seed_same_world_trajectory() {
        let mut a = World::new(404);
        let mut b = World::new(404);
        for _ in 0..120 {
            tick(&mut a, 0.016);
            tick(&mut b, 0.016);
        }
        assert_eq!(a.patrols, b.patrols);
        assert_eq!(a.cannons, b.cannons);
        assert_eq!(a.projectiles, b.projectiles);
        assert_eq!(a.citizens, b.citizens);
        assert_eq!(a.horses, b.horses);
        assert_eq!(a.events, b.events);
    }

    proptest! {
        #[test]
        fn prop_projectile_position_integrates(dt in 0.0f32..0.033) {
            let mut world = World::new(500);
            for c in &mut world.cannons {
                c.timer = 0.0;
                c.cooldown = 1.0e6;
            }
            let pos = Vec3::new(-300.0, 3000.0, 700.0);
            let vel = Vec3::new(80.0, 10.0, -40.0);
            world.projectiles.push(Projectile { pos, vel, life: PROJECTILE_LIFE });

            tick(&mut world, dt);

            prop_assert_eq!(world.projectiles.len(), 1);
            let p = world.projectiles[0];
            let expected_vel = vel + Vec3::new(0.0, -PROJECTILE_GRAVITY, 0.0) * dt;
            let expected_pos = pos + expected_vel * dt;
            prop_assert!((p.pos - expected_pos).length() < 1e-2);
        }
    }
}
