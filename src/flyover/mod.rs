//! 3D castle flyover
//!
//! Deterministic world sim for the terrain flyover: patrols walking the
//! wall-walk, cannons lobbing shot over the valley, citizens and horses
//! milling about the courtyard, clouds drifting past. The camera lives here
//! too: a scripted fly-in followed by a damped interactive orbit.

pub mod build;
pub mod camera;
pub mod state;
pub mod tick;

pub use camera::{CameraPose, Cinematic, OrbitCamera};
pub use state::{
    Cannon, Citizen, Cloud, DustPuff, Horse, Patrol, Projectile, World, WorldEvent,
};
pub use tick::tick;
