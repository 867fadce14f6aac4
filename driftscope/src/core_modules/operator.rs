// THEORY:
// The `operator` module is the closed dispatch table over the degradation
// operators. The wire carries operator names as strings (a selection is an
// ordered list of names); this module is the single place that maps those names
// onto the closed `OperatorId` enumeration and runs them.
//
// Unknown names are a deliberate no-op: a selection containing a name this
// build does not know is applied as if that entry were absent, with a debug
// event so the skip is visible in the logs. This keeps old selections working
// against newer and older builds alike.

use rand::Rng;
use tracing::debug;

use crate::core_modules::drift;
use crate::core_modules::frame::Frame;
use crate::core_modules::noise;

/// The closed set of degradation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    Gaussian,
    Shot,
    Impulse,
    Speckle,
    GradualDrift,
    SuddenDrift,
}

impl OperatorId {
    /// All operators, in presentation order.
    pub const ALL: [OperatorId; 6] = [
        OperatorId::Gaussian,
        OperatorId::Shot,
        OperatorId::Impulse,
        OperatorId::Speckle,
        OperatorId::GradualDrift,
        OperatorId::SuddenDrift,
    ];

    /// Parses a wire name. Returns `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gaussian" => Some(Self::Gaussian),
            "shot" => Some(Self::Shot),
            "impulse" => Some(Self::Impulse),
            "speckle" => Some(Self::Speckle),
            "gradual_drift" => Some(Self::GradualDrift),
            "sudden_drift" => Some(Self::SuddenDrift),
            _ => None,
        }
    }

    /// The wire name of this operator.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Shot => "shot",
            Self::Impulse => "impulse",
            Self::Speckle => "speckle",
            Self::GradualDrift => "gradual_drift",
            Self::SuddenDrift => "sudden_drift",
        }
    }

    /// Applies this operator to the frame in place.
    pub fn apply<R: Rng>(self, frame: &mut Frame, rng: &mut R) {
        match self {
            Self::Gaussian => noise::gaussian(frame, rng),
            Self::Shot => noise::shot(frame, rng),
            Self::Impulse => noise::impulse(frame, rng),
            Self::Speckle => noise::speckle(frame, rng),
            Self::GradualDrift => drift::gradual(frame, rng),
            Self::SuddenDrift => drift::sudden(frame, rng),
        }
    }
}

/// Applies a named selection in order. Each operator feeds the next; names that
/// do not parse are skipped (explicit pass-through, logged).
pub fn apply_selection<R: Rng>(frame: &mut Frame, selection: &[String], rng: &mut R) {
    for name in selection {
        match OperatorId::parse(name) {
            Some(op) => op.apply(frame, rng),
            None => debug!(operator = %name, "unknown operator name, passing through"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::CHANNELS;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn flat(width: u32, height: u32, value: f32) -> Frame {
        Frame {
            width,
            height,
            samples: vec![value; (width * height) as usize * CHANNELS],
        }
    }

    #[test]
    fn parse_round_trips_every_operator() {
        for op in OperatorId::ALL {
            assert_eq!(OperatorId::parse(op.name()), Some(op));
        }
        assert_eq!(OperatorId::parse("solarize"), None);
        assert_eq!(OperatorId::parse("GAUSSIAN"), None);
    }

    #[test]
    fn unknown_names_are_a_pass_through() {
        let mut frame = flat(8, 8, 0.3);
        let before = frame.clone();
        let selection = vec!["motion_blur".to_string(), "".to_string()];
        apply_selection(&mut frame, &selection, &mut StdRng::seed_from_u64(1));
        assert_eq!(frame, before);
    }

    #[test]
    fn selection_composes_in_order() {
        // Impulse then gradual_drift lifts pepper pixels by the ramp; the
        // reverse order leaves them at exactly zero. Order must matter.
        let a_then_b = {
            let mut frame = flat(10, 10, 0.2);
            let selection = vec!["impulse".to_string(), "gradual_drift".to_string()];
            apply_selection(&mut frame, &selection, &mut StdRng::seed_from_u64(5));
            frame
        };
        let composed_by_hand = {
            let mut frame = flat(10, 10, 0.2);
            let mut rng = StdRng::seed_from_u64(5);
            OperatorId::Impulse.apply(&mut frame, &mut rng);
            OperatorId::GradualDrift.apply(&mut frame, &mut rng);
            frame
        };
        assert_eq!(a_then_b, composed_by_hand);

        let b_then_a = {
            let mut frame = flat(10, 10, 0.2);
            let selection = vec!["gradual_drift".to_string(), "impulse".to_string()];
            apply_selection(&mut frame, &selection, &mut StdRng::seed_from_u64(5));
            frame
        };
        assert_ne!(a_then_b, b_then_a);
    }

    #[test]
    fn every_operator_preserves_shape_and_eight_bit_range() {
        for op in OperatorId::ALL {
            let mut frame = flat(9, 7, 0.5);
            op.apply(&mut frame, &mut StdRng::seed_from_u64(11));
            assert_eq!(frame.width, 9);
            assert_eq!(frame.height, 7);
            assert_eq!(frame.samples.len(), 9 * 7 * CHANNELS);
            let encoded = frame.to_rgb8();
            assert_eq!(encoded.dimensions(), (9, 7));
            // u8 cannot leave [0,255]; the interesting check is that the clip
            // left nothing non-finite behind.
            assert!(frame.samples.iter().all(|s| s.is_finite()));
        }
    }
}
