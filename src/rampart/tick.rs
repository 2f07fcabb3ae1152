//! Per-frame update for the rampart scene
//!
//! Pure state transition: clamp the delta, apply the click, integrate every
//! entity list, then top the balloon population back up. Entity lists update
//! in draw order, background layers first.

use glam::Vec2;

use super::layout::Layout;
use super::state::{SceneEvent, SceneState};
use crate::consts::MAX_FRAME_DT;

/// Click hit radius relative to the balloon radius (slightly forgiving)
pub const CLICK_RADIUS_SCALE: f32 = 1.05;
/// Hover radius relative to the balloon radius (slightly strict)
pub const HOVER_RADIUS_SCALE: f32 = 0.95;
/// Downward pull on pop-burst particles (px/s^2)
const PARTICLE_GRAVITY: f32 = 120.0;
/// Balloons despawn this far above the top edge
const BALLOON_DESPAWN_MARGIN: f32 = 20.0;
/// Horses turn around this far past either screen edge
const HORSE_TURN_MARGIN: f32 = 30.0;

/// Pointer state for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Pointer position in scene coordinates, if it moved this frame
    pub pointer: Option<Vec2>,
    /// A click happened since the last frame
    pub click: bool,
}

/// Advance the scene by one frame
pub fn tick(state: &mut SceneState, layout: &Layout, input: &FrameInput, dt: f32) {
    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    state.elapsed += dt;
    if let Some(p) = input.pointer {
        state.pointer = p;
    }

    state.ensure_guards(layout);
    state.ensure_horses(layout);

    if input.click {
        let point = state.pointer;
        pop_at(state, point);
    }

    update_guards(state, layout, dt);
    update_horses(state, layout, dt);
    state.ensure_balloons(layout);
    update_balloons(state, dt);
    update_particles(state, dt);
}

/// Pop the topmost balloon under `point`. Returns whether anything popped.
///
/// Balloons later in the list draw on top, so the scan runs back to front
/// and stops at the first hit.
pub fn pop_at(state: &mut SceneState, point: Vec2) -> bool {
    for i in (0..state.balloons.len()).rev() {
        let b = state.balloons[i];
        if !b.popped && point.distance(b.pos) <= b.radius * CLICK_RADIUS_SCALE {
            state.balloons[i].popped = true;
            state.score += 1;
            state.spawn_burst(b.pos, b.color);
            state.events.push(SceneEvent::BalloonPopped {
                pos: b.pos,
                color: b.color,
            });
            return true;
        }
    }
    false
}

fn update_guards(state: &mut SceneState, layout: &Layout, dt: f32) {
    let path_len = layout.path_len();
    for g in &mut state.guards {
        g.progress += g.speed * g.dir * dt;
        if g.progress <= 0.0 {
            g.progress = 0.0;
            g.dir = 1.0;
        }
        if g.progress >= path_len {
            g.progress = path_len;
            g.dir = -1.0;
        }
    }
}

fn update_horses(state: &mut SceneState, layout: &Layout, dt: f32) {
    for h in &mut state.horses {
        h.x += h.speed * h.dir * dt;
        if h.x < -HORSE_TURN_MARGIN {
            h.dir = 1.0;
        }
        if h.x > layout.w + HORSE_TURN_MARGIN {
            h.dir = -1.0;
        }
    }
}

fn update_balloons(state: &mut SceneState, dt: f32) {
    for b in &mut state.balloons {
        b.sway_phase += b.sway_freq * dt;
        b.pos.y += b.vy * dt;
        b.pos.x += b.sway_phase.sin() * b.sway_amp * dt;
    }
    state
        .balloons
        .retain(|b| !b.popped && b.pos.y >= -b.radius - BALLOON_DESPAWN_MARGIN);

    let pointer = state.pointer;
    state.over_balloon = state
        .balloons
        .iter()
        .any(|b| pointer.distance(b.pos) < b.radius * HOVER_RADIUS_SCALE);
}

fn update_particles(state: &mut SceneState, dt: f32) {
    for p in &mut state.particles {
        p.life -= dt;
        p.pos += p.vel * dt;
        p.vel.y += PARTICLE_GRAVITY * dt;
    }
    state.particles.retain(|p| p.life > 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rampart::state::{Balloon, Particle};
    use proptest::prelude::*;

    fn test_layout() -> Layout {
        Layout::compute(1400.0, 800.0)
    }

    fn balloon_at(x: f32, y: f32, radius: f32) -> Balloon {
        Balloon {
            pos: Vec2::new(x, y),
            radius,
            vy: -40.0,
            sway_amp: 0.0,
            sway_freq: 1.0,
            sway_phase: 0.0,
            color: 2,
            popped: false,
        }
    }

    #[test]
    fn test_click_pops_exactly_one_topmost() {
        let layout = test_layout();
        let mut state = SceneState::new(1);
        // Two overlapping balloons; the later one renders on top
        state.balloons.push(balloon_at(400.0, 300.0, 20.0));
        state.balloons.push(balloon_at(405.0, 302.0, 20.0));

        let input = FrameInput {
            pointer: Some(Vec2::new(402.0, 301.0)),
            click: true,
        };
        tick(&mut state, &layout, &input, 0.016);

        assert_eq!(state.score, 1);
        assert_eq!(state.events.len(), 1);
        // The bottom balloon survives; the topmost was removed
        let survivor_near_bottom = state
            .balloons
            .iter()
            .any(|b| (b.pos.x - 400.0).abs() < 2.0 && b.radius == 20.0);
        assert!(survivor_near_bottom);
        assert!(!state.balloons.iter().any(|b| b.popped));
    }

    #[test]
    fn test_click_outside_leaves_score() {
        let layout = test_layout();
        let mut state = SceneState::new(2);
        state.balloons.push(balloon_at(400.0, 300.0, 20.0));

        let input = FrameInput {
            pointer: Some(Vec2::new(700.0, 700.0)),
            click: true,
        };
        tick(&mut state, &layout, &input, 0.016);

        assert_eq!(state.score, 0);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_click_without_flag_pops_nothing() {
        let layout = test_layout();
        let mut state = SceneState::new(3);
        state.balloons.push(balloon_at(400.0, 300.0, 20.0));

        let input = FrameInput {
            pointer: Some(Vec2::new(400.0, 300.0)),
            click: false,
        };
        tick(&mut state, &layout, &input, 0.016);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_spawner_reaches_target_without_overshoot() {
        let layout = test_layout();
        let target = SceneState::balloon_target(&layout);
        let mut state = SceneState::new(4);

        tick(&mut state, &layout, &FrameInput::default(), 0.016);
        assert_eq!(state.balloons.len(), target);

        // Steady state: population holds, the spawner adds nothing extra
        for _ in 0..60 {
            tick(&mut state, &layout, &FrameInput::default(), 0.016);
            assert!(state.balloons.len() <= target);
        }
    }

    #[test]
    fn test_balloon_integration_step() {
        let layout = test_layout();
        let mut state = SceneState::new(5);
        state.balloons.push(balloon_at(500.0, 400.0, 18.0));
        // Freeze the spawner out of the picture by reading index 0 only
        let y0 = state.balloons[0].pos.y;
        let vy = state.balloons[0].vy;

        tick(&mut state, &layout, &FrameInput::default(), 0.016);

        let b = state.balloons[0];
        assert!((b.pos.y - (y0 + vy * 0.016)).abs() < 1e-4);
        assert_eq!(b.pos.x, 500.0); // sway_amp is zero
    }

    #[test]
    fn test_dt_clamp_caps_large_jumps() {
        let layout = test_layout();
        let mut state = SceneState::new(6);
        state.balloons.push(balloon_at(500.0, 400.0, 18.0));
        let y0 = state.balloons[0].pos.y;
        let vy = state.balloons[0].vy;

        tick(&mut state, &layout, &FrameInput::default(), 2.5);

        let b = state.balloons[0];
        assert!((b.pos.y - (y0 + vy * MAX_FRAME_DT)).abs() < 1e-3);
    }

    #[test]
    fn test_balloon_despawns_above_top() {
        let layout = test_layout();
        let mut state = SceneState::new(7);
        state.balloons.push(balloon_at(500.0, -60.0, 18.0));

        tick(&mut state, &layout, &FrameInput::default(), 0.016);

        assert!(
            !state
                .balloons
                .iter()
                .any(|b| b.pos.y < -b.radius - BALLOON_DESPAWN_MARGIN)
        );
    }

    #[test]
    fn test_hover_flag_tracks_pointer() {
        let layout = test_layout();
        let mut state = SceneState::new(8);
        state.balloons.push(balloon_at(500.0, 400.0, 20.0));

        let over = FrameInput {
            pointer: Some(Vec2::new(500.0, 402.0)),
            click: false,
        };
        tick(&mut state, &layout, &over, 0.0);
        assert!(state.over_balloon);

        let away = FrameInput {
            pointer: Some(Vec2::new(100.0, 100.0)),
            click: false,
        };
        tick(&mut state, &layout, &away, 0.0);
        assert!(!state.over_balloon);
    }

    #[test]
    fn test_guard_reflects_at_path_ends() {
        let layout = test_layout();
        let mut state = SceneState::new(9);
        tick(&mut state, &layout, &FrameInput::default(), 0.016);

        let path_len = layout.path_len();
        // Force a guard to each extreme and walk it over the edge
        state.guards[0].progress = path_len - 0.1;
        state.guards[0].dir = 1.0;
        state.guards[0].speed = 50.0;
        state.guards[1].progress = 0.1;
        state.guards[1].dir = -1.0;
        state.guards[1].speed = 50.0;

        tick(&mut state, &layout, &FrameInput::default(), 0.033);

        assert_eq!(state.guards[0].dir, -1.0);
        assert!(state.guards[0].progress <= path_len);
        assert_eq!(state.guards[1].dir, 1.0);
        assert!(state.guards[1].progress >= 0.0);
    }

    #[test]
    fn test_horse_reverses_past_edges() {
        let layout = test_layout();
        let mut state = SceneState::new(10);
        tick(&mut state, &layout, &FrameInput::default(), 0.016);

        state.horses[0].x = layout.w + HORSE_TURN_MARGIN + 5.0;
        state.horses[0].dir = 1.0;
        tick(&mut state, &layout, &FrameInput::default(), 0.016);
        assert_eq!(state.horses[0].dir, -1.0);

        state.horses[1].x = -HORSE_TURN_MARGIN - 5.0;
        state.horses[1].dir = -1.0;
        tick(&mut state, &layout, &FrameInput::default(), 0.016);
        assert_eq!(state.horses[1].dir, 1.0);
    }

    #[test]
    fn test_expired_particles_removed() {
        let layout = test_layout();
        let mut state = SceneState::new(11);
        state.particles.push(Particle {
            pos: Vec2::new(10.0, 10.0),
            vel: Vec2::new(0.0, -50.0),
            life: 0.01,
            color: 1,
        });

        tick(&mut state, &layout, &FrameInput::default(), 0.033);
        assert!(state.particles.is_empty());
    }

    #[test]
    fn test_pop_spawns_burst() {
        let layout = test_layout();
        let mut state = SceneState::new(12);
        state.balloons.push(balloon_at(400.0, 300.0, 20.0));

        let input = FrameInput {
            pointer: Some(Vec2::new(400.0, 300.0)),
            click: true,
        };
        tick(&mut state, &layout, &input, 0.016);
        assert!(state.particles.len() >= 16);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let layout = test_layout();
        let mut a = SceneState::new(777);
        let mut b = SceneState::new(777);

        let inputs = [
            FrameInput::default(),
            FrameInput {
                pointer: Some(Vec2::new(300.0, 500.0)),
                click: false,
            },
            FrameInput {
                pointer: Some(Vec2::new(310.0, 480.0)),
                click: true,
            },
            FrameInput::default(),
        ];
        for input in &inputs {
            tick(&mut a, &layout, input, 0.016);
            tick(&mut b, &layout, input, 0.016);
        }

        assert_eq!(a.score, b.score);
        assert_eq!(a.balloons.len(), b.balloons.len());
        for (ba, bb) in a.balloons.iter().zip(&b.balloons) {
            assert_eq!(ba.pos, bb.pos);
            assert_eq!(ba.color, bb.color);
        }
    }

    proptest! {
        #[test]
        fn prop_integration_matches_velocity(dt in 0.0f32..0.033) {
            let layout = test_layout();
            let mut state = SceneState::new(99);
            state.balloons.push(balloon_at(600.0, 500.0, 16.0));
            let y0 = state.balloons[0].pos.y;
            let vy = state.balloons[0].vy;

            tick(&mut state, &layout, &FrameInput::default(), dt);

            let b = state.balloons[0];
            prop_assert!((b.pos.y - (y0 + vy * dt)).abs() < 1e-3);
        }
    }
}
