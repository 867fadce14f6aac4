// THEORY:
// The `pipeline` module is the file-to-file surface of the engine. It stacks
// three small layers:
//
// 1.  `DegradePipeline` — the applicator. Reads an image, runs the selected
//     operators in order over one running frame, writes the result. Every
//     failure is caught at this boundary and reported as a plain `false`; a
//     bad image must never take the serving process down.
// 2.  `selection_fingerprint` — outputs are keyed by the ordered selection, so
//     switching selections can never serve a result computed for a different
//     one.
// 3.  `Processor` — the cache guard plus filename resolution. It skips the
//     applicator entirely when the output file already exists (path-existence
//     check, best-effort at-most-once, not transactional).

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::core_modules::frame::Frame;
use crate::core_modules::operator::apply_selection;
use crate::session::ComparisonSession;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to commit output {path}: {source}")]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The seam between the cache guard and the applicator. Exists so callers (and
/// tests) can substitute their own applicator.
pub trait ApplyDegradation {
    /// Applies `selection` to the image at `input`, writing to `output`.
    /// Returns `false` on any failure; never panics on bad input.
    fn apply(&self, input: &Path, output: &Path, selection: &[String]) -> bool;
}

/// The degradation applicator: decode, run operators in order, encode.
#[derive(Debug, Clone, Default)]
pub struct DegradePipeline {
    /// When set, every application derives its RNG from this seed and the
    /// input filename, making whole runs reproducible byte for byte.
    pub seed: Option<u64>,
}

impl DegradePipeline {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    fn rng_for(&self, input: &Path) -> StdRng {
        match self.seed {
            Some(seed) => {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                StdRng::seed_from_u64(seed ^ xxh3_64(name.as_bytes()))
            }
            None => StdRng::from_os_rng(),
        }
    }

    fn try_apply(
        &self,
        input: &Path,
        output: &Path,
        selection: &[String],
    ) -> Result<(), PipelineError> {
        let decoded = image::open(input).map_err(|source| PipelineError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let mut frame = Frame::from_rgb8(&decoded.to_rgb8());
        let mut rng = self.rng_for(input);
        apply_selection(&mut frame, selection, &mut rng);

        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;

        // Stage next to the final path and rename into place, so a failed or
        // interrupted encode never leaves a partial file where the cache
        // guard would trust it. The suffix keeps format-by-extension working.
        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(".staged-")
            .suffix(&suffix)
            .tempfile_in(parent)
            .map_err(|source| PipelineError::Commit {
                path: output.to_path_buf(),
                source,
            })?;
        frame
            .to_rgb8()
            .save(staged.path())
            .map_err(|source| PipelineError::Write {
                path: output.to_path_buf(),
                source,
            })?;
        staged
            .persist(output)
            .map_err(|error| PipelineError::Commit {
                path: output.to_path_buf(),
                source: error.error,
            })?;
        Ok(())
    }
}

impl ApplyDegradation for DegradePipeline {
    fn apply(&self, input: &Path, output: &Path, selection: &[String]) -> bool {
        match self.try_apply(input, output, selection) {
            Ok(()) => {
                debug!(input = %input.display(), output = %output.display(), "degraded image written");
                true
            }
            Err(error) => {
                warn!(%error, "pipeline application failed");
                false
            }
        }
    }
}

/// Stable fingerprint of an ordered selection, used as the output subdirectory
/// so each selection gets its own cache namespace.
pub fn selection_fingerprint(selection: &[String]) -> String {
    format!("{:016x}", xxh3_64(selection.join("\n").as_bytes()))
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("image index {index} out of range (total {total})")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("failed to process image {filename}")]
    Failed { filename: String },
}

/// The original/modified pair produced by one process operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedPair {
    pub index: usize,
    pub total: usize,
    pub filename: String,
    /// Absolute path of the untouched source image.
    pub original: PathBuf,
    /// Absolute path of the degraded output.
    pub modified: PathBuf,
    /// The selection fingerprint the output is keyed under.
    pub fingerprint: String,
}

/// Resolves sequence indices to paths and guards the applicator behind the
/// output-existence check.
#[derive(Debug, Clone)]
pub struct Processor<P = DegradePipeline> {
    source_dir: PathBuf,
    output_root: PathBuf,
    pipeline: P,
}

impl<P: ApplyDegradation> Processor<P> {
    pub fn new(source_dir: PathBuf, output_root: PathBuf, pipeline: P) -> Self {
        Self {
            source_dir,
            output_root,
            pipeline,
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Processes the image at `index` under the session's selection. Skips the
    /// applicator when the keyed output already exists.
    pub fn process(
        &self,
        session: &ComparisonSession,
        index: usize,
    ) -> Result<ProcessedPair, ProcessError> {
        let total = session.len();
        let filename = session
            .filename(index)
            .ok_or(ProcessError::IndexOutOfRange { index, total })?
            .to_string();

        let fingerprint = selection_fingerprint(session.selection());
        let original = self.source_dir.join(&filename);
        let modified = self.output_root.join(&fingerprint).join(&filename);

        if modified.exists() {
            debug!(%filename, %fingerprint, "output already present, skipping recompute");
        } else if !self
            .pipeline
            .apply(&original, &modified, session.selection())
        {
            return Err(ProcessError::Failed { filename });
        }

        Ok(ProcessedPair {
            index,
            total,
            filename,
            original,
            modified,
            fingerprint,
        })
    }
}
