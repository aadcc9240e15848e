//! Synchronous per-image retouching.

use crate::client::GeminiClient;
use crate::error::{Result, RetouchError};
use crate::format::ImageFormat;
use crate::model::GeminiModel;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Directory segment that anchors output mirroring.
pub const RAW_ANCHOR: &str = "raw";

/// Resolves the output directory for a raw input directory.
///
/// If the input path contains a segment literally named `raw`, everything
/// after that segment is reproduced under the output base; otherwise the
/// output base is used flat.
pub fn mirror_output_dir(raw_dir: &Path, processed_base: &Path) -> PathBuf {
    let parts: Vec<&OsStr> = raw_dir.iter().collect();
    match parts.iter().position(|p| *p == OsStr::new(RAW_ANCHOR)) {
        Some(pos) => {
            let mut out = processed_base.to_path_buf();
            for part in &parts[pos + 1..] {
                out.push(part);
            }
            out
        }
        None => processed_base.to_path_buf(),
    }
}

/// Lists image filenames in `dir`, sorted for deterministic processing
/// order.
///
/// Accepts `.jpg`/`.jpeg`/`.png` case-insensitively; `.webp` only when
/// `include_webp` is set (the upload path accepts it, the sync path does
/// not).
pub fn list_image_files(dir: &Path, include_webp: bool) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let format = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension);
        match format {
            Some(ImageFormat::WebP) if !include_webp => {}
            Some(_) => files.push(name.to_string()),
            None => {}
        }
    }
    files.sort();
    Ok(files)
}

/// Output path for the `index`-th image returned for one input file.
///
/// The first image keeps `retouched_{stem}.{ext}`; extra images get a
/// numeric suffix so nothing gets overwritten. The extension follows the
/// returned MIME type.
pub fn output_path(out_dir: &Path, input_name: &str, index: usize, mime_type: &str) -> PathBuf {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_name);
    let ext = ImageFormat::from_mime(mime_type).extension();
    let name = if index == 0 {
        format!("retouched_{stem}.{ext}")
    } else {
        format!("retouched_{stem}_{}.{ext}", index + 1)
    };
    out_dir.join(name)
}

/// Retouches one file: reads it, sends it with the instruction, and saves
/// every image found in the response.
///
/// Returns the written paths; an empty result means the response carried no
/// inline images, which is not an error.
pub async fn retouch_file(
    client: &GeminiClient,
    model: GeminiModel,
    prompt: &str,
    input: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RetouchError::InvalidLocation(format!("not a file path: {}", input.display()))
        })?;
    let bytes = std::fs::read(input)?;

    let images = client.generate_content(model, prompt, &bytes).await?;

    let mut saved = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let path = output_path(out_dir, name, index, &image.mime_type);
        std::fs::write(&path, &image.data)?;
        tracing::debug!(path = %path.display(), "saved retouched image");
        saved.push(path);
    }
    Ok(saved)
}
