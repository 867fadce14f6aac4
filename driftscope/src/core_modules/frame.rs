// THEORY:
// The `Frame` module is the single data container every operator works on. All
// degradation math happens in normalized floating point: an 8-bit RGB image is
// lifted into [0,1] samples once, the operators perturb those samples freely
// (including pushing them out of range), and a single rescale-and-clip step on
// the way out guarantees the 8-bit invariant.
//
// Key architectural principles:
// 1.  **Dumb container**: `Frame` holds data and conversions only. It does not
//     know what noise or drift is; that knowledge lives in the operator modules.
// 2.  **Shape invariant**: width, height and channel count never change while a
//     frame passes through the pipeline. Operators mutate samples in place.
// 3.  **Range safety at the boundary**: operators may leave samples outside
//     [0,1]; `to_rgb8` clips before quantizing, so the encoded output can never
//     overflow or underflow the 8-bit range.

use image::RgbImage;

/// Interleaved RGB channel count. Fixed for the lifetime of the pipeline.
pub const CHANNELS: usize = 3;

/// An image lifted into normalized floating-point samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major, interleaved RGB samples, each nominally in [0,1].
    pub samples: Vec<f32>,
}

impl Frame {
    /// Lifts an 8-bit RGB image into [0,1] samples.
    pub fn from_rgb8(image: &RgbImage) -> Self {
        let samples = image
            .as_raw()
            .iter()
            .map(|&byte| f32::from(byte) / 255.0)
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            samples,
        }
    }

    /// Rescales to [0,255] with clipping and quantizes back to 8-bit RGB.
    pub fn to_rgb8(&self) -> RgbImage {
        let bytes: Vec<u8> = self
            .samples
            .iter()
            .map(|&sample| (sample.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        // The shape invariant guarantees the buffer length matches.
        RgbImage::from_raw(self.width, self.height, bytes)
            .expect("frame buffer length matches its dimensions")
    }

    /// Clips every sample into [lo, hi] in place.
    pub fn clip(&mut self, lo: f32, hi: f32) {
        for sample in &mut self.samples {
            *sample = sample.clamp(lo, hi);
        }
    }
}
