//! Preview generation for files on disk.
//!
//! Wraps [`ImageProcessor::previews`] with file I/O: each input is read,
//! rendered at every requested size, and written next to a JSON manifest.
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── dawn-large.jpg     # <stem>-<label>.<ext>, ext follows the encoded format
//! ├── dawn-small.jpg
//! └── dawn.json          # {"large": {...}, "small": {...}, "original": [1500, 1000]}
//! ```
//!
//! ## Parallel Processing
//!
//! Inputs are processed in parallel using [rayon](https://docs.rs/rayon).
//! The processor shares no state between calls, so each worker simply borrows
//! it. Files for one input are written only after all of its previews
//! rendered, so a failing input leaves nothing behind.
//!
//! Output names come from the file stem alone, so two inputs sharing a stem
//! (`a/dawn.jpg`, `b/dawn.png`) are rejected before anything is processed.

use crate::imaging::{
    ImageBackend, ImageProcessor, Preprocessor, PreviewRequest, PreviewResult, ProcessError,
    extension_for,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}: {source}", path.display())]
    Process { path: PathBuf, source: ProcessError },
    #[error(
        "{} and {} would both write previews named '{stem}'",
        first.display(),
        second.display()
    )]
    DuplicateStem {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One written preview, as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewFile {
    /// File name relative to the output directory.
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Per-input manifest: every label plus the source dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewManifest {
    #[serde(flatten)]
    pub previews: BTreeMap<String, PreviewFile>,
    pub original: [u32; 2],
}

/// Progress report sent after each input finishes.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    pub source: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: PreviewManifest,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BatchError {
    let path = path.to_path_buf();
    move |source| BatchError::Io { path, source }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Reject inputs whose output names would collide.
fn check_unique_stems(inputs: &[PathBuf]) -> Result<(), BatchError> {
    let mut seen: BTreeMap<String, &PathBuf> = BTreeMap::new();
    for input in inputs {
        let stem = file_stem(input);
        if let Some(first) = seen.get(&stem) {
            return Err(BatchError::DuplicateStem {
                stem,
                first: first.to_path_buf(),
                second: input.clone(),
            });
        }
        seen.insert(stem, input);
    }
    Ok(())
}

/// Render previews for every input and write them to `output_dir`.
///
/// Returns one [`BatchEvent`] per input in input order. The first failing
/// input aborts the batch with its error. Inputs sharing a file stem fail
/// with [`BatchError::DuplicateStem`] before any file is read.
pub fn write_previews<B, P>(
    processor: &ImageProcessor<B, P>,
    inputs: &[PathBuf],
    request: &PreviewRequest,
    output_dir: &Path,
    events: Option<Sender<BatchEvent>>,
) -> Result<Vec<BatchEvent>, BatchError>
where
    B: ImageBackend,
    P: Preprocessor,
{
    check_unique_stems(inputs)?;
    std::fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;

    inputs
        .par_iter()
        .map_with(events, |events, source| {
            let event = write_one(processor, source, request, output_dir)?;
            if let Some(tx) = events {
                // Receiver gone just means nobody is printing progress
                let _ = tx.send(event.clone());
            }
            Ok(event)
        })
        .collect()
}

fn write_one<B, P>(
    processor: &ImageProcessor<B, P>,
    source: &Path,
    request: &PreviewRequest,
    output_dir: &Path,
) -> Result<BatchEvent, BatchError>
where
    B: ImageBackend,
    P: Preprocessor,
{
    let bytes = std::fs::read(source).map_err(io_err(source))?;
    let result = processor
        .previews(&bytes, request)
        .map_err(|e| BatchError::Process {
            path: source.to_path_buf(),
            source: e,
        })?;

    let stem = file_stem(source);
    let manifest = write_result(&result, &stem, output_dir)?;
    let manifest_path = output_dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&manifest_path, json).map_err(io_err(&manifest_path))?;
    debug!(source = %source.display(), labels = manifest.previews.len(), "wrote previews");

    Ok(BatchEvent {
        source: source.to_path_buf(),
        manifest_path,
        manifest,
    })
}

/// Write each preview as `<stem>-<label>.<ext>` and build the manifest.
pub fn write_result(
    result: &PreviewResult,
    stem: &str,
    output_dir: &Path,
) -> Result<PreviewManifest, BatchError> {
    let mut previews = BTreeMap::new();
    for (label, preview) in &result.previews {
        let file = format!("{stem}-{label}.{}", extension_for(&preview.image));
        let path = output_dir.join(&file);
        std::fs::write(&path, &preview.image).map_err(io_err(&path))?;
        previews.insert(
            label.clone(),
            PreviewFile {
                file,
                width: preview.width,
                height: preview.height,
            },
        );
    }

    Ok(PreviewManifest {
        previews,
        original: [result.original.width, result.original.height],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{ColorNormalization, Dimensions, SizeSpec, TransformResult};
    use tempfile::TempDir;

    fn request() -> PreviewRequest {
        PreviewRequest::from_pairs([
            ("small", SizeSpec::Exact(200, 100)),
            ("large", SizeSpec::Exact(500, 250)),
        ])
        .unwrap()
    }

    #[test]
    fn manifest_serializes_labels_and_original() {
        let manifest = PreviewManifest {
            previews: BTreeMap::from([(
                "small".to_string(),
                PreviewFile {
                    file: "a-small.jpg".into(),
                    width: 200,
                    height: 100,
                },
            )]),
            original: [1500, 1000],
        };
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["small"]["width"], 200);
        assert_eq!(json["small"]["file"], "a-small.jpg");
        assert_eq!(json["original"], serde_json::json!([1500, 1000]));

        let back: PreviewManifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn write_result_names_files_by_label() {
        let tmp = TempDir::new().unwrap();
        let result = PreviewResult {
            previews: BTreeMap::from([(
                "thumb".to_string(),
                TransformResult {
                    image: b"blob".to_vec(),
                    width: 75,
                    height: 50,
                    color: ColorNormalization::AlreadyRgb,
                },
            )]),
            original: Dimensions::from((1500, 1000)),
        };

        let manifest = write_result(&result, "dawn", tmp.path()).unwrap();
        let entry = &manifest.previews["thumb"];
        assert_eq!(entry.file, "dawn-thumb.bin");
        assert_eq!((entry.width, entry.height), (75, 50));
        assert_eq!(std::fs::read(tmp.path().join("dawn-thumb.bin")).unwrap(), b"blob");
    }

    #[test]
    fn write_previews_processes_every_input() {
        let tmp = TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = ["one.jpg", "two.jpg"]
            .iter()
            .map(|name| {
                let path = tmp.path().join(name);
                std::fs::write(&path, b"image").unwrap();
                path
            })
            .collect();
        let out = tmp.path().join("out");

        let processor = ImageProcessor::new(MockBackend::new());
        let (tx, rx) = std::sync::mpsc::channel();
        let events = write_previews(&processor, &inputs, &request(), &out, Some(tx)).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source, inputs[0]);
        assert_eq!(events[1].manifest.original, [1500, 1000]);
        assert_eq!(rx.iter().count(), 2);
        assert!(out.join("one.json").exists());
        assert!(out.join("two-large.bin").exists());

        let decodes = processor
            .backend()
            .count(|op| matches!(op, RecordedOp::Decode(_)));
        assert_eq!(decodes, 2);
    }

    #[test]
    fn failing_input_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("bad.jpg");
        std::fs::write(&input, b"image").unwrap();
        let out = tmp.path().join("out");

        let backend = MockBackend {
            failing_size: Some((500, 250)),
            ..MockBackend::default()
        };
        let processor = ImageProcessor::new(backend);
        let result = write_previews(&processor, &[input], &request(), &out, None);

        assert!(matches!(result, Err(BatchError::Process { .. })));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn shared_stems_are_rejected_before_processing() {
        let tmp = TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = ["a", "b"]
            .iter()
            .map(|dir| {
                let dir = tmp.path().join(dir);
                std::fs::create_dir_all(&dir).unwrap();
                let path = dir.join("dawn.jpg");
                std::fs::write(&path, b"image").unwrap();
                path
            })
            .collect();
        let out = tmp.path().join("out");

        let processor = ImageProcessor::new(MockBackend::new());
        let result = write_previews(&processor, &inputs, &request(), &out, None);

        match result {
            Err(BatchError::DuplicateStem {
                stem,
                first,
                second,
            }) => {
                assert_eq!(stem, "dawn");
                assert_eq!(first, inputs[0]);
                assert_eq!(second, inputs[1]);
            }
            other => panic!("expected DuplicateStem, got {other:?}"),
        }
        assert!(!out.exists());
        assert!(processor.backend().get_operations().is_empty());
    }

    #[test]
    fn same_stem_different_extension_collides() {
        let inputs = vec![PathBuf::from("x/dawn.jpg"), PathBuf::from("x/dawn.png")];
        assert!(matches!(
            check_unique_stems(&inputs),
            Err(BatchError::DuplicateStem { .. })
        ));
        assert!(check_unique_stems(&[PathBuf::from("dawn.jpg"), PathBuf::from("dusk.jpg")]).is_ok());
    }

    #[test]
    fn missing_input_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let processor = ImageProcessor::new(MockBackend::new());
        let result = write_previews(
            &processor,
            &[tmp.path().join("missing.jpg")],
            &request(),
            tmp.path(),
            None,
        );
        assert!(matches!(result, Err(BatchError::Io { .. })));
    }
}
