//! WebGPU rendering module
//!
//! Both scenes render as a single fullscreen triangle whose fragment shader
//! draws everything: 2D SDFs for the rampart vignette, a raymarched
//! heightfield plus SDF castle for the flyover. Entity data goes up in
//! storage buffers each frame.

pub mod flyover;
pub mod rampart;

pub use flyover::FlyoverRenderState;
pub use rampart::RampartRenderState;
