//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Single transforms
//!
//! ```text
//! dawn.jpg → dawn-300.jpg
//!     300x200, 18.4 KB
//! ```
//!
//! ## Previews
//!
//! ```text
//! dawn.jpg (1500x1000)
//!     large: dawn-large.jpg 500x250
//!     small: dawn-small.jpg 200x100
//!     Manifest: out/dawn.json
//! ```
//!
//! ## Identify
//!
//! ```text
//! dawn.jpg
//!     1500x1000 CMYK
//! ```

use crate::batch::BatchEvent;
use crate::imaging::{Colorspace, Dimensions, TransformResult};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count: `512 B`, `18.4 KB`, `2.1 MB`.
pub fn format_bytes(len: usize) -> String {
    const KB: f64 = 1024.0;
    let len_f = len as f64;
    if len_f < KB {
        format!("{len} B")
    } else if len_f < KB * KB {
        format!("{:.1} KB", len_f / KB)
    } else {
        format!("{:.1} MB", len_f / (KB * KB))
    }
}

pub fn format_transform(source: &Path, output: &Path, result: &TransformResult) -> Vec<String> {
    vec![
        format!("{} → {}", display_name(source), output.display()),
        format!(
            "{}{}x{}, {}",
            indent(1),
            result.width,
            result.height,
            format_bytes(result.image.len())
        ),
    ]
}

pub fn print_transform(source: &Path, output: &Path, result: &TransformResult) {
    for line in format_transform(source, output, result) {
        println!("{}", line);
    }
}

pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    let [w, h] = event.manifest.original;
    let mut lines = vec![format!("{} ({}x{})", display_name(&event.source), w, h)];
    for (label, file) in &event.manifest.previews {
        lines.push(format!(
            "{}{}: {} {}x{}",
            indent(1),
            label,
            file.file,
            file.width,
            file.height
        ));
    }
    lines.push(format!(
        "{}Manifest: {}",
        indent(1),
        event.manifest_path.display()
    ));
    lines
}

pub fn format_identify(source: &Path, dims: Dimensions, colorspace: Colorspace) -> Vec<String> {
    vec![
        display_name(source),
        format!("{}{}x{} {}", indent(1), dims.width, dims.height, colorspace),
    ]
}

pub fn print_identify(source: &Path, dims: Dimensions, colorspace: Colorspace) {
    for line in format_identify(source, dims, colorspace) {
        println!("{}", line);
    }
}
