// THEORY:
// This file is the main entry point for the `driftscope` library crate. It
// exposes the degradation engine as a small, layered API: the pixel-level
// operators live in `core_modules` and stay encapsulated; consumers (like the
// viewer server) work through the higher-level surfaces — the file-to-file
// `pipeline`, the `session` that scopes one comparison run, and the `display`
// publisher that fans the current image pair out to live listeners.

pub mod core_modules;
pub mod display;
pub mod pipeline;
pub mod session;

// Re-export the types a consumer needs for a full comparison run.
pub use crate::core_modules::operator::OperatorId;
pub use crate::display::{DisplayPublisher, DisplayState};
pub use crate::pipeline::{
    ApplyDegradation, DegradePipeline, PipelineError, ProcessError, ProcessedPair, Processor,
    selection_fingerprint,
};
pub use crate::session::{ComparisonSession, SessionError};
