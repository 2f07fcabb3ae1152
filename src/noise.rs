//! Seeded 2D gradient noise
//!
//! Permutation-table noise in the classic Perlin style. Everything here is a
//! pure function of the inputs and the seed, which is what lets the terrain
//! height be re-derived identically on the Rust side (projectile ground
//! collision) and in WGSL (raymarched heightfield).

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

/// Quintic fade curve (zero first and second derivative at the endpoints)
#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Corner gradient directions, indexed by the low bits of the hashed corner
const GRADIENTS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (DIAG, DIAG),
    (-DIAG, DIAG),
    (DIAG, -DIAG),
    (-DIAG, -DIAG),
];

/// A seeded noise field with a period of 256 lattice cells
pub struct NoiseField {
    perm: [u8; 512],
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self { perm }
    }

    /// Permutation table widened for GPU upload, so the shader can evaluate
    /// the exact same field as the sim
    pub fn permutation_u32(&self) -> [u32; 512] {
        std::array::from_fn(|i| self.perm[i] as u32)
    }

    #[inline]
    fn corner_hash(&self, x: i32, y: i32) -> u8 {
        let xi = (x & 255) as usize;
        let yi = (y & 255) as usize;
        self.perm[self.perm[xi] as usize + yi]
    }

    #[inline]
    fn gradient(&self, x: i32, y: i32) -> (f32, f32) {
        GRADIENTS[(self.corner_hash(x, y) & 7) as usize]
    }

    /// 2D gradient noise, roughly in [-1, 1]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = x0 as i32;
        let yi = y0 as i32;
        let fx = x - x0;
        let fy = y - y0;

        let dot = |gx: i32, gy: i32, dx: f32, dy: f32| {
            let (gvx, gvy) = self.gradient(gx, gy);
            gvx * dx + gvy * dy
        };

        let n00 = dot(xi, yi, fx, fy);
        let n10 = dot(xi + 1, yi, fx - 1.0, fy);
        let n01 = dot(xi, yi + 1, fx, fy - 1.0);
        let n11 = dot(xi + 1, yi + 1, fx - 1.0, fy - 1.0);

        let u = fade(fx);
        let v = fade(fy);

        let nx0 = n00 + (n10 - n00) * u;
        let nx1 = n01 + (n11 - n01) * u;
        // Raw 2D gradient noise peaks near ±sqrt(2)/2; rescale toward ±1
        (nx0 + (nx1 - nx0) * v) * std::f32::consts::SQRT_2
    }

    /// Octave summation: each octave adds detail at `lacunarity` times the
    /// frequency and `gain` times the amplitude of the previous one.
    /// `scale` is the wavelength of the first octave in input units.
    pub fn fractal(
        &self,
        x: f32,
        y: f32,
        octaves: u32,
        lacunarity: f32,
        gain: f32,
        scale: f32,
    ) -> f32 {
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut sum = 0.0;
        for _ in 0..octaves {
            sum += amplitude * self.sample(x * frequency / scale, y * frequency / scale);
            frequency *= lacunarity;
            amplitude *= gain;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_is_deterministic() {
        let field = NoiseField::new(42);
        let a = field.sample(12.34, -56.78);
        let b = field.sample(12.34, -56.78);
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_seed_same_field() {
        let a = NoiseField::new(7);
        let b = NoiseField::new(7);
        for i in 0..100 {
            let x = i as f32 * 1.7 - 50.0;
            let y = i as f32 * -2.3 + 10.0;
            assert_eq!(a.sample(x, y), b.sample(x, y));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differs = (0..100).any(|i| {
            let x = i as f32 * 3.1;
            a.sample(x, x * 0.5) != b.sample(x, x * 0.5)
        });
        assert!(differs);
    }

    #[test]
    fn test_zero_at_lattice_points() {
        // Gradient noise vanishes at integer coordinates
        let field = NoiseField::new(99);
        for x in -3..4 {
            for y in -3..4 {
                assert_eq!(field.sample(x as f32, y as f32), 0.0);
            }
        }
    }

    #[test]
    fn test_fractal_deterministic() {
        let field = NoiseField::new(1234);
        let a = field.fractal(100.0, 200.0, 4, 2.2, 0.52, 600.0);
        let b = field.fractal(100.0, 200.0, 4, 2.2, 0.52, 600.0);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_sample_bounded(x in -5000.0f32..5000.0, y in -5000.0f32..5000.0) {
            let field = NoiseField::new(31337);
            let n = field.sample(x, y);
            prop_assert!(n.is_finite());
            prop_assert!(n.abs() <= 1.5, "noise out of range: {}", n);
        }

        #[test]
        fn prop_sample_repeatable(x in -5000.0f32..5000.0, y in -5000.0f32..5000.0) {
            let field = NoiseField::new(8675309);
            prop_assert_eq!(field.sample(x, y), field.sample(x, y));
        }
    }
}
