// THEORY:
// The `noise` module holds the four stochastic degradation operators. Each one
// is a pure function over a `Frame` plus a caller-supplied RNG: given the same
// seed the output is identical byte for byte, which is what makes degraded
// datasets reproducible and the operators testable.
//
// The parameter defaults are deliberately aggressive (variance 0.3, 30% impulse
// density) so the degradation is unmistakable in a side-by-side comparison.

use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::core_modules::frame::Frame;

/// Variance of the additive and multiplicative Gaussian operators.
pub const GAUSSIAN_VARIANCE: f64 = 0.3;
/// Fraction of samples hit by the impulse operator.
pub const IMPULSE_AMOUNT: f32 = 0.3;
/// Intensity scale applied before Poisson sampling in the shot operator.
pub const SHOT_SCALE: f64 = 10.0;
/// Raised lower clip bound for shot noise, so some signal always survives.
pub const SHOT_FLOOR: f32 = 0.1;

/// Adds zero-mean Gaussian noise (variance 0.3) to every sample; clips to [0,1].
pub fn gaussian<R: Rng>(frame: &mut Frame, rng: &mut R) {
    let normal = Normal::new(0.0, GAUSSIAN_VARIANCE.sqrt())
        .expect("gaussian std dev is finite and positive");
    for sample in &mut frame.samples {
        *sample += normal.sample(rng) as f32;
    }
    frame.clip(0.0, 1.0);
}

/// Shot (Poisson) noise: scale by 10, draw Poisson(lambda = scaled sample),
/// rescale down, clip to [0.1, 1].
pub fn shot<R: Rng>(frame: &mut Frame, rng: &mut R) {
    for sample in &mut frame.samples {
        let lambda = f64::from(*sample) * SHOT_SCALE;
        // Poisson is undefined for lambda <= 0; a dark sample stays dark.
        let drawn = if lambda > 0.0 {
            let poisson =
                Poisson::new(lambda).expect("lambda is positive and finite");
            poisson.sample(rng)
        } else {
            0.0
        };
        *sample = (drawn / SHOT_SCALE) as f32;
    }
    frame.clip(SHOT_FLOOR, 1.0);
}

/// Impulse (salt & pepper) noise: each sample is independently replaced by 0 or
/// 1 with probability 0.3, fair coin between the two extremes.
pub fn impulse<R: Rng>(frame: &mut Frame, rng: &mut R) {
    for sample in &mut frame.samples {
        if rng.random::<f32>() < IMPULSE_AMOUNT {
            *sample = if rng.random::<bool>() { 1.0 } else { 0.0 };
        }
    }
}

/// Speckle noise: multiply each sample by (1 + n), n ~ N(0, 0.3); clip to [0,1].
pub fn speckle<R: Rng>(frame: &mut Frame, rng: &mut R) {
    let normal = Normal::new(0.0, GAUSSIAN_VARIANCE.sqrt())
        .expect("speckle std dev is finite and positive");
    for sample in &mut frame.samples {
        *sample *= 1.0 + normal.sample(rng) as f32;
    }
    frame.clip(0.0, 1.0);
}
