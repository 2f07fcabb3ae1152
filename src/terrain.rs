//! Procedural terrain height
//!
//! A radial dome with ridged fractal noise and fine detail, flattened to a
//! plateau near the origin so the castle has level ground. `height` is the
//! single source of truth for the ground: the flyover sim queries it for
//! projectile impacts and the shader evaluates the same formula for the
//! visible heightfield.

use crate::consts::{PLATEAU_HEIGHT, PLATEAU_RADIUS};
use crate::lerp;
use crate::noise::NoiseField;

/// Altitude where grass starts giving way to rock
const RAMP_BASE: f32 = 280.0;
/// Height of the full grass-to-snow transition band
const RAMP_SPAN: f32 = 350.0;

const GRASS: [f32; 3] = [0.431, 0.549, 0.435];
const ROCK: [f32; 3] = [0.478, 0.498, 0.525];
const SNOW: [f32; 3] = [0.902, 0.933, 0.949];

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
    ]
}

/// Seeded terrain with a plateau falloff at the summit
pub struct Terrain {
    noise: NoiseField,
}

impl Terrain {
    pub fn new(seed: u64) -> Self {
        Self {
            noise: NoiseField::new(seed),
        }
    }

    /// The underlying noise field (the renderer uploads its permutation)
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Ground height at plane coordinates (x, z)
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let r = (x * x + z * z).sqrt();
        let dome = 350.0 * (-(r / 1600.0) * (r / 1600.0)).exp();
        let ridges = 160.0
            * self
                .noise
                .fractal(x + 100.0, z + 200.0, 4, 2.2, 0.52, 600.0)
                .abs();
        let detail = 40.0 * self.noise.fractal(x - 300.0, z - 500.0, 3, 2.0, 0.55, 180.0);
        let mut h = dome + ridges + detail;

        let plateau_t = ((PLATEAU_RADIUS - r) / PLATEAU_RADIUS).max(0.0);
        if plateau_t > 0.0 {
            h = lerp(h, PLATEAU_HEIGHT, plateau_t.powf(2.5));
        }
        h
    }

    /// Altitude color: grass low, rock mid, snow high. Linear RGB.
    pub fn color(&self, height: f32) -> [f32; 3] {
        let t = ((height - RAMP_BASE) / RAMP_SPAN).clamp(0.0, 1.0);
        if t < 0.5 {
            mix(GRASS, ROCK, t / 0.5)
        } else {
            mix(ROCK, SNOW, (t - 0.5) / 0.5)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_height_repeatable() {
        let terrain = Terrain::new(2024);
        for i in 0..50 {
            let x = i as f32 * 37.0 - 900.0;
            let z = i as f32 * -53.0 + 400.0;
            assert_eq!(terrain.height(x, z), terrain.height(x, z));
        }
    }

    #[test]
    fn test_same_seed_same_ground() {
        let a = Terrain::new(5);
        let b = Terrain::new(5);
        for i in 0..50 {
            let x = i as f32 * 61.0 - 1500.0;
            assert_eq!(a.height(x, x * 0.3), b.height(x, x * 0.3));
        }
    }

    #[test]
    fn test_plateau_center_is_flat() {
        let terrain = Terrain::new(17);
        assert_eq!(terrain.height(0.0, 0.0), PLATEAU_HEIGHT);
        // Just inside the plateau the blend should hold the ground close to
        // the target height
        let h = terrain.height(PLATEAU_RADIUS * 0.1, PLATEAU_RADIUS * 0.1);
        assert!((h - PLATEAU_HEIGHT).abs() < 30.0, "h = {h}");
    }

    #[test]
    fn test_height_bounded() {
        // Dome (<=350) + ridges (<=~400) + detail (<=~120)
        let terrain = Terrain::new(88);
        for i in -20..=20 {
            for j in -20..=20 {
                let h = terrain.height(i as f32 * 75.0, j as f32 * 75.0);
                assert!(h.is_finite());
                assert!((-150.0..900.0).contains(&h), "h = {h}");
            }
        }
    }

    #[test]
    fn test_color_ramp_endpoints() {
        let terrain = Terrain::new(0);
        let low = terrain.color(0.0);
        let high = terrain.color(RAMP_BASE + RAMP_SPAN + 100.0);
        for i in 0..3 {
            assert!((low[i] - GRASS[i]).abs() < 1e-6);
            assert!((high[i] - SNOW[i]).abs() < 1e-6);
        }
    }

    proptest! {
        #[test]
        fn prop_height_deterministic(x in -1500.0f32..1500.0, z in -1500.0f32..1500.0) {
            let terrain = Terrain::new(424242);
            prop_assert_eq!(terrain.height(x, z), terrain.height(x, z));
        }
    }
}
