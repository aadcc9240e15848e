//! Result manifest decoding.
//!
//! Each line of the result manifest is decoded independently: malformed lines
//! and per-item vendor errors are recorded and skipped, never fatal. Output
//! filenames are a deterministic function of each line's `custom_id`, so
//! re-running the parser over the same manifest reproduces the same files.

use crate::batch::manifest::decode_custom_id;
use crate::error::Result;
use crate::format::ImageFormat;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Suffix appended to each output filename stem.
pub const OUTPUT_SUFFIX: &str = "_retouched";

/// One image extracted from the result manifest, ready to be written.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// The request line's correlation id.
    pub custom_id: String,
    /// Output filename derived from the id and the declared MIME type.
    pub file_name: String,
    /// Decoded image bytes.
    pub data: Vec<u8>,
}

/// A line that could not be decoded (bad JSON, bad base64).
#[derive(Debug, Clone)]
pub struct LineFailure {
    /// 1-based line number in the manifest.
    pub line: usize,
    /// Human-readable reason.
    pub reason: String,
}

/// A well-formed line carrying a vendor-side error for its item.
#[derive(Debug, Clone)]
pub struct ItemError {
    /// The request line's correlation id.
    pub custom_id: String,
    /// The error payload as reported by the service.
    pub detail: String,
}

/// Outcome of parsing a result manifest.
#[derive(Debug, Default)]
pub struct ResultSummary {
    /// Every inline image found, in manifest order.
    pub images: Vec<DecodedImage>,
    /// Lines that failed to decode.
    pub failures: Vec<LineFailure>,
    /// Items the service reported an error for.
    pub item_errors: Vec<ItemError>,
}

/// Derives the output filename for a result item: tag stripped, original
/// extension dropped, suffix appended, extension chosen by MIME family.
pub fn output_file_name(custom_id: &str, mime_type: &str) -> String {
    let base = decode_custom_id(custom_id);
    let stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base);
    let ext = ImageFormat::from_mime(mime_type).extension();
    format!("{stem}{OUTPUT_SUFFIX}.{ext}")
}

/// Decodes a JSON-lines result manifest.
///
/// Never fails as a whole: each line is handled independently and problems
/// are collected in the returned summary.
pub fn parse_result_manifest(raw: &[u8]) -> ResultSummary {
    let mut summary = ResultSummary::default();

    for (idx, raw_line) in raw.split(|b| *b == b'\n').enumerate() {
        let line_no = idx + 1;
        if raw_line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let parsed: ResultLine = match serde_json::from_slice(raw_line) {
            Ok(line) => line,
            Err(e) => {
                summary.failures.push(LineFailure {
                    line: line_no,
                    reason: format!("invalid JSON: {e}"),
                });
                continue;
            }
        };

        let custom_id = parsed
            .custom_id
            .unwrap_or_else(|| format!("image_{idx}"));

        let Some(response) = parsed.response else {
            continue;
        };

        if let Some(error) = response.error {
            tracing::warn!(custom_id = %custom_id, "item failed remotely: {error}");
            summary.item_errors.push(ItemError {
                custom_id,
                detail: error.to_string(),
            });
            continue;
        }

        // A line with candidates but no inline parts yields nothing; that is
        // an expected outcome, not a failure.
        'line: for candidate in &response.candidates {
            let Some(content) = &candidate.content else {
                continue;
            };
            for part in &content.parts {
                let Some(inline) = &part.inline_data else {
                    continue;
                };
                let data = match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        summary.failures.push(LineFailure {
                            line: line_no,
                            reason: format!("invalid base64 for {custom_id}: {e}"),
                        });
                        break 'line;
                    }
                };
                summary.images.push(DecodedImage {
                    custom_id: custom_id.clone(),
                    file_name: output_file_name(&custom_id, &inline.mime_type),
                    data,
                });
            }
        }
    }

    summary
}

/// Writes decoded images into `out_dir`, creating it if needed.
///
/// Returns the written paths. Identical input always produces identical
/// files.
pub fn write_images(images: &[DecodedImage], out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(images.len());
    for image in images {
        let path = out_dir.join(&image.file_name);
        std::fs::write(&path, &image.data)?;
        written.push(path);
    }
    Ok(written)
}

// Result line wire shape. The batch surface emits snake_case; aliases cover
// the camelCase spelling the live API uses for the same structures.
#[derive(Debug, Deserialize)]
struct ResultLine {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default, alias = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn success_line(custom_id: &str, mime: &str, payload: &[u8]) -> String {
        format!(
            r#"{{"custom_id":"{custom_id}","response":{{"candidates":[{{"content":{{"parts":[{{"inline_data":{{"mime_type":"{mime}","data":"{}"}}}}]}}}}]}}}}"#,
            b64(payload)
        )
    }

    #[test]
    fn test_end_to_end_example() {
        let manifest = success_line("retouch_a.jpg", "image/png", b"png-bytes");
        let summary = parse_result_manifest(manifest.as_bytes());

        assert_eq!(summary.images.len(), 1);
        assert!(summary.failures.is_empty());
        let image = &summary.images[0];
        assert_eq!(image.file_name, "a_retouched.png");
        assert_eq!(image.data, b"png-bytes");
    }

    #[test]
    fn test_error_line_is_skipped_not_fatal() {
        let manifest = format!(
            "{}\n{}\n",
            success_line("retouch_ok.jpg", "image/png", b"data"),
            r#"{"custom_id":"retouch_bad.jpg","response":{"error":{"code":500,"message":"internal"}}}"#,
        );
        let summary = parse_result_manifest(manifest.as_bytes());

        assert_eq!(summary.images.len(), 1);
        assert_eq!(summary.item_errors.len(), 1);
        assert_eq!(summary.item_errors[0].custom_id, "retouch_bad.jpg");
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_malformed_line_between_good_lines() {
        let manifest = format!(
            "{}\nnot json at all{{{{\n{}\n",
            success_line("retouch_a.jpg", "image/png", b"one"),
            success_line("retouch_b.jpg", "image/jpeg", b"two"),
        );
        let summary = parse_result_manifest(manifest.as_bytes());

        assert_eq!(summary.images.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].line, 2);
        assert_eq!(summary.images[0].file_name, "a_retouched.png");
        assert_eq!(summary.images[1].file_name, "b_retouched.jpg");
    }

    #[test]
    fn test_extension_follows_mime_family() {
        assert_eq!(
            output_file_name("retouch_x.png", "image/jpeg"),
            "x_retouched.jpg"
        );
        assert_eq!(
            output_file_name("retouch_x.jpg", "image/png"),
            "x_retouched.png"
        );
        // Unrecognized MIME falls into the PNG family
        assert_eq!(
            output_file_name("retouch_x.jpg", "image/tiff"),
            "x_retouched.png"
        );
    }

    #[test]
    fn test_candidates_without_inline_parts_yield_nothing() {
        let manifest = r#"{"custom_id":"retouch_t.jpg","response":{"candidates":[{"content":{"parts":[{"text":"no image here"}]}}]}}"#;
        let summary = parse_result_manifest(manifest.as_bytes());

        assert!(summary.images.is_empty());
        assert!(summary.failures.is_empty());
        assert!(summary.item_errors.is_empty());
    }

    #[test]
    fn test_missing_custom_id_gets_positional_fallback() {
        let manifest = format!(
            r#"{{"response":{{"candidates":[{{"content":{{"parts":[{{"inline_data":{{"mime_type":"image/png","data":"{}"}}}}]}}}}]}}}}"#,
            b64(b"x")
        );
        let summary = parse_result_manifest(manifest.as_bytes());
        assert_eq!(summary.images.len(), 1);
        assert_eq!(summary.images[0].file_name, "image_0_retouched.png");
    }

    #[test]
    fn test_invalid_base64_recorded_as_line_failure() {
        let manifest = r#"{"custom_id":"retouch_z.jpg","response":{"candidates":[{"content":{"parts":[{"inline_data":{"mime_type":"image/png","data":"!!!not-base64!!!"}}]}}]}}"#;
        let summary = parse_result_manifest(manifest.as_bytes());

        assert!(summary.images.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].reason.contains("retouch_z.jpg"));
    }

    #[test]
    fn test_camel_case_aliases_accepted() {
        let manifest = format!(
            r#"{{"custom_id":"retouch_c.jpg","response":{{"candidates":[{{"content":{{"parts":[{{"inlineData":{{"mimeType":"image/jpeg","data":"{}"}}}}]}}}}]}}}}"#,
            b64(b"jpeg-bytes")
        );
        let summary = parse_result_manifest(manifest.as_bytes());
        assert_eq!(summary.images.len(), 1);
        assert_eq!(summary.images[0].file_name, "c_retouched.jpg");
    }

    #[test]
    fn test_blank_lines_ignored() {
        let manifest = format!(
            "\n{}\n\n   \n",
            success_line("retouch_a.jpg", "image/png", b"data")
        );
        let summary = parse_result_manifest(manifest.as_bytes());
        assert_eq!(summary.images.len(), 1);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let manifest = format!(
            "{}\n{}\n",
            success_line("retouch_a.jpg", "image/png", b"one"),
            success_line("retouch_b.jpg", "image/jpeg", b"two"),
        );
        let first = parse_result_manifest(manifest.as_bytes());
        let second = parse_result_manifest(manifest.as_bytes());

        let names1: Vec<_> = first.images.iter().map(|i| &i.file_name).collect();
        let names2: Vec<_> = second.images.iter().map(|i| &i.file_name).collect();
        assert_eq!(names1, names2);
        assert_eq!(first.images[0].data, second.images[0].data);
    }

    #[test]
    fn test_write_images_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = success_line("retouch_a.jpg", "image/png", b"payload");
        let summary = parse_result_manifest(manifest.as_bytes());

        let written = write_images(&summary.images, dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("a_retouched.png"));
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"payload");
    }
}
