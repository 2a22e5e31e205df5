use helpers::general::lerp;
use std::f64::consts::PI;

/// Number of precalculated random values, i.e. the period of the noise field.
pub const NOISE_TABLE_SIZE: usize = 256;

// linear congruential generator parameters (Numerical Recipes)
const LCG_A: f64 = 1664525.0;
const LCG_C: f64 = 1013904223.0;
const LCG_M: f64 = 4294967296.0; // 2^32

/// ValueNoise is a one-dimensional value noise field. A table of random values in [0, 1[ is
/// precalculated from the seed, sample() blends between neighboring table entries using cosine
/// interpolation. The field is periodic with period NOISE_TABLE_SIZE.
#[derive(Debug, Clone)]
pub struct ValueNoise {
    values: [f64; NOISE_TABLE_SIZE],
}

impl ValueNoise {
    pub fn new(seed: f64) -> ValueNoise {
        let mut state = seed * 1e9;
        let mut values = [0.0; NOISE_TABLE_SIZE];

        for value in values.iter_mut() {
            state = (LCG_A * state + LCG_C).rem_euclid(LCG_M);
            let tmp_value = state / LCG_M;

            // rem_euclid may round up to the modulus itself
            *value = if tmp_value < 1.0 { tmp_value } else { 0.0 };
        }

        ValueNoise { values }
    }

    /// sample returns the noise value at x. The result lies in [0, 1[ and depends only on the
    /// seed and x.
    pub fn sample(&self, x: f64) -> f64 {
        let x_floor = x.floor();
        let t = x - x_floor;

        let idx = (x_floor as i64).rem_euclid(NOISE_TABLE_SIZE as i64) as usize;
        let v0 = self.values[idx];
        let v1 = self.values[(idx + 1) % NOISE_TABLE_SIZE];

        lerp(v0, v1, smooth(t))
    }
}

/// Cosine easing of t in [0, 1].
fn smooth(t: f64) -> f64 {
    (1.0 - (t * PI).cos()) / 2.0
}
