// THEORY:
// The `drift` module holds the two deterministic degradation operators. Unlike
// the stochastic noise models, drift simulates a sensor or illumination change:
// a spatially-varying brightness offset that is a function of pixel position
// only. No RNG is involved, so two applications are always identical.

use crate::core_modules::frame::{CHANNELS, Frame};

/// Peak offset of the gradual left-to-right ramp.
pub const GRADUAL_AMOUNT: f32 = 0.6;
/// Constant offset applied to the lower half by the sudden drift.
pub const SUDDEN_AMOUNT: f32 = 0.7;

/// Adds a horizontal linear ramp 0 -> 0.6 across the image width, identical for
/// every row and channel; clips to [0,1].
pub fn gradual<R>(frame: &mut Frame, _rng: &mut R) {
    let width = frame.width as usize;
    let span = (width.saturating_sub(1)).max(1) as f32;
    for (pixel_index, pixel) in frame.samples.chunks_mut(CHANNELS).enumerate() {
        let column = (pixel_index % width) as f32;
        let offset = GRADUAL_AMOUNT * column / span;
        for sample in pixel {
            *sample += offset;
        }
    }
    frame.clip(0.0, 1.0);
}

/// Adds a constant 0.7 offset to every sample in rows >= height/2 (floor
/// division); the upper half is untouched. Clips to [0,1].
pub fn sudden<R>(frame: &mut Frame, _rng: &mut R) {
    let width = frame.width as usize;
    let split_row = (frame.height / 2) as usize;
    for (pixel_index, pixel) in frame.samples.chunks_mut(CHANNELS).enumerate() {
        if pixel_index / width >= split_row {
            for sample in pixel {
                *sample += SUDDEN_AMOUNT;
            }
        }
    }
    frame.clip(0.0, 1.0);
}
