//! Scripted fly-in and interactive orbit cameras
//!
//! The cinematic is a two-state machine (idle / playing) over caller-supplied
//! millisecond timestamps, which keeps it deterministic and testable. When it
//! finishes it hands the final pose to the damped orbit camera.

use glam::Vec3;
use std::f32::consts::PI;

use crate::consts::{CINEMATIC_DURATION_MS, PLATEAU_HEIGHT};
use crate::{lerp, smoothstep};

// Sweep bounds: a wide high approach spiraling down toward the gate side
const START_ANGLE: f32 = -PI * 0.85;
const END_ANGLE: f32 = PI * 0.35;
const START_RADIUS: f32 = 1600.0;
const END_RADIUS: f32 = 520.0;
const START_HEIGHT: f32 = 700.0;
const END_HEIGHT: f32 = 380.0;

const MIN_DISTANCE: f32 = 60.0;
const MAX_DISTANCE: f32 = 2200.0;
/// Elevation clamp: just above the horizon up to nearly straight down
const MIN_PITCH: f32 = PI * 0.005;
const MAX_PITCH: f32 = PI * 0.49;

/// Eye position and look-at target; the shader derives its ray basis and
/// 60 degree projection from these two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
}

/// The point every camera looks at: just above the castle courtyard
pub fn focus() -> Vec3 {
    Vec3::new(0.0, PLATEAU_HEIGHT + 40.0, 0.0)
}

/// Camera placement before the first cinematic frame
pub fn initial_pose() -> CameraPose {
    CameraPose {
        eye: Vec3::new(-1200.0, 680.0, -1100.0),
        target: focus(),
    }
}

fn sweep_pose(u: f32) -> CameraPose {
    let angle = lerp(START_ANGLE, END_ANGLE, u);
    let radius = lerp(START_RADIUS, END_RADIUS, u);
    let height = lerp(START_HEIGHT, END_HEIGHT, u);
    CameraPose {
        eye: Vec3::new(angle.cos() * radius, height, angle.sin() * radius),
        target: focus(),
    }
}

/// Scripted camera sweep with an idle/playing state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cinematic {
    start_ms: Option<f64>,
    duration_ms: f64,
}

impl Default for Cinematic {
    fn default() -> Self {
        Self::new()
    }
}

impl Cinematic {
    pub fn new() -> Self {
        Self {
            start_ms: None,
            duration_ms: CINEMATIC_DURATION_MS,
        }
    }

    /// Begin (or restart) the sweep at the given timestamp. Restarting
    /// simply replaces the start time; there is no other cancellation.
    pub fn start(&mut self, now_ms: f64) {
        self.start_ms = Some(now_ms);
    }

    pub fn playing(&self) -> bool {
        self.start_ms.is_some()
    }

    /// Normalized progress in [0, 1] at `now_ms`; 1 when idle
    pub fn progress(&self, now_ms: f64) -> f32 {
        match self.start_ms {
            Some(start) => ((now_ms - start) / self.duration_ms).clamp(0.0, 1.0) as f32,
            None => 1.0,
        }
    }

    /// Pose for this frame, or `None` once control belongs to the orbit
    /// camera. The terminal frame still returns the final pose so the
    /// handoff is seamless.
    pub fn update(&mut self, now_ms: f64) -> Option<CameraPose> {
        let start = self.start_ms?;
        let t = (((now_ms - start) / self.duration_ms) as f32).max(0.0);
        let pose = sweep_pose(smoothstep(t));
        if t >= 1.0 {
            self.start_ms = None;
        }
        Some(pose)
    }

    /// Where the sweep ends; used to seed the orbit camera
    pub fn final_pose() -> CameraPose {
        sweep_pose(1.0)
    }
}

/// Damped interactive orbit around the castle: drag rotates, wheel zooms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    goal_yaw: f32,
    goal_pitch: f32,
    goal_distance: f32,
}

impl OrbitCamera {
    /// Seed the orbit from an existing pose (typically the cinematic's end).
    /// The current pitch keeps the handed-over pose exactly; only the goal is
    /// clamped, so an out-of-range pose glides into bounds instead of
    /// snapping.
    pub fn from_pose(pose: &CameraPose) -> Self {
        let offset = pose.eye - pose.target;
        let distance = offset.length().clamp(MIN_DISTANCE, MAX_DISTANCE);
        let yaw = offset.z.atan2(offset.x);
        let pitch = (offset.y / offset.length().max(1e-6)).asin();
        Self {
            yaw,
            pitch,
            distance,
            goal_yaw: yaw,
            goal_pitch: pitch.clamp(MIN_PITCH, MAX_PITCH),
            goal_distance: distance,
        }
    }

    /// Pointer drag in pixels
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.goal_yaw += dx * 0.005;
        self.goal_pitch = (self.goal_pitch + dy * 0.005).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Wheel zoom; positive delta moves away
    pub fn zoom(&mut self, delta: f32) {
        self.goal_distance =
            (self.goal_distance * (1.0 + delta * 0.001)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Ease the camera toward its goals
    pub fn update(&mut self, dt: f32) {
        let k = 1.0 - (-8.0 * dt.max(0.0)).exp();
        self.yaw += (self.goal_yaw - self.yaw) * k;
        self.pitch += (self.goal_pitch - self.pitch) * k;
        self.distance += (self.goal_distance - self.distance) * k;
    }

    pub fn pose(&self) -> CameraPose {
        let target = focus();
        let eye = target
            + Vec3::new(
                self.pitch.cos() * self.yaw.cos(),
                self.pitch.sin(),
                self.pitch.cos() * self.yaw.sin(),
            ) * self.distance;
        CameraPose { eye, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_monotonic_and_complete() {
        let mut cinematic = Cinematic::new();
        cinematic.start(1000.0);

        let mut last = -1.0f32;
        for step in 0..200 {
            let now = 1000.0 + step as f64 * 100.0;
            let p = cinematic.progress(now);
            assert!(p >= last, "progress regressed: {p} < {last}");
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
        assert_eq!(cinematic.progress(1000.0 + CINEMATIC_DURATION_MS), 1.0);
        assert_eq!(cinematic.progress(1000.0 + CINEMATIC_DURATION_MS + 5000.0), 1.0);
    }

    #[test]
    fn test_sweep_stays_within_pose_bounds() {
        let mut cinematic = Cinematic::new();
        cinematic.start(0.0);

        for step in 0..=140 {
            let now = step as f64 * 100.0;
            let Some(pose) = cinematic.update(now) else {
                break;
            };
            let radius = (pose.eye.x * pose.eye.x + pose.eye.z * pose.eye.z).sqrt();
            assert!(
                (END_RADIUS - 1.0..=START_RADIUS + 1.0).contains(&radius),
                "radius {radius} outside sweep bounds"
            );
            assert!((END_HEIGHT - 1.0..=START_HEIGHT + 1.0).contains(&pose.eye.y));
            assert_eq!(pose.target, focus());
        }
    }

    #[test]
    fn test_terminal_transition_to_idle() {
        let mut cinematic = Cinematic::new();
        cinematic.start(0.0);
        assert!(cinematic.playing());

        // Terminal frame still yields a pose, then the machine is idle
        let final_frame = cinematic.update(CINEMATIC_DURATION_MS + 1.0);
        assert!(final_frame.is_some());
        assert!(!cinematic.playing());
        assert_eq!(cinematic.update(CINEMATIC_DURATION_MS + 2.0), None);
    }

    #[test]
    fn test_replay_restarts_sweep() {
        let mut cinematic = Cinematic::new();
        cinematic.start(0.0);
        cinematic.update(CINEMATIC_DURATION_MS + 1.0);
        assert!(!cinematic.playing());

        cinematic.start(20_000.0);
        assert!(cinematic.playing());
        assert!(cinematic.progress(20_000.0) < 0.01);
    }

    #[test]
    fn test_final_pose_matches_sweep_end() {
        let mut cinematic = Cinematic::new();
        cinematic.start(0.0);
        let last = cinematic.update(CINEMATIC_DURATION_MS).unwrap();
        let expected = Cinematic::final_pose();
        assert!((last.eye - expected.eye).length() < 1e-3);
    }

    #[test]
    fn test_orbit_clamps() {
        let mut orbit = OrbitCamera::from_pose(&Cinematic::final_pose());
        orbit.zoom(1.0e9);
        orbit.update(10.0);
        let far = orbit.pose();
        assert!((far.eye - focus()).length() <= MAX_DISTANCE + 1.0);

        orbit.zoom(-1.0e9);
        orbit.update(10.0);
        let near = orbit.pose();
        assert!((near.eye - focus()).length() >= MIN_DISTANCE - 1.0);

        // Dragging far past vertical must not flip over the top
        orbit.drag(0.0, 1.0e6);
        orbit.update(10.0);
        let top = orbit.pose();
        assert!(top.eye.y > focus().y);
    }

    #[test]
    fn test_orbit_damps_toward_goal() {
        let mut orbit = OrbitCamera::from_pose(&Cinematic::final_pose());
        let before = orbit.pose();
        orbit.drag(200.0, 0.0);
        orbit.update(0.016);
        let mid = orbit.pose();
        assert!(mid.eye != before.eye);

        for _ in 0..1000 {
            orbit.update(0.016);
        }
        let settled = orbit.pose();
        // After settling, further updates barely move the eye
        orbit.update(0.016);
        assert!((orbit.pose().eye - settled.eye).length() < 1e-2);
    }
}
