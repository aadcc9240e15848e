//! Request manifest encoding.
//!
//! One JSON object per line, one line per image, in the exact shape the batch
//! endpoint consumes. The `custom_id` carries the original filename so results
//! can be correlated back without any local state.

use crate::error::Result;
use crate::format::ImageFormat;
use crate::model::GeminiModel;
use crate::storage::GcsLocation;
use serde::Serialize;
use std::path::Path;

/// Tag prefixed to every filename to form its `custom_id`.
pub const CUSTOM_ID_TAG: &str = "retouch_";

/// Derives the manifest `custom_id` for a filename.
pub fn encode_custom_id(file_name: &str) -> String {
    format!("{CUSTOM_ID_TAG}{file_name}")
}

/// Recovers the original filename from a `custom_id`.
///
/// Ids without the tag are passed through unchanged.
pub fn decode_custom_id(custom_id: &str) -> &str {
    custom_id.strip_prefix(CUSTOM_ID_TAG).unwrap_or(custom_id)
}

/// A request manifest covering an ordered collection of uploaded images.
#[derive(Debug)]
pub struct RequestManifest {
    lines: Vec<RequestLine>,
}

impl RequestManifest {
    /// Builds one request line per filename, all sharing a single instruction.
    ///
    /// Each line references the image's copy under `input` rather than inline
    /// bytes; the MIME type is implied by the filename extension.
    pub fn build(
        file_names: &[String],
        model: GeminiModel,
        prompt: &str,
        input: &GcsLocation,
    ) -> Self {
        let lines = file_names
            .iter()
            .map(|name| RequestLine {
                custom_id: encode_custom_id(name),
                method: "POST".into(),
                request: GenerateRequest {
                    model: model.resource_name(),
                    contents: vec![
                        RequestContent {
                            parts: vec![RequestPart::Text {
                                text: prompt.to_string(),
                            }],
                        },
                        RequestContent {
                            parts: vec![RequestPart::FileData {
                                file_data: FileData {
                                    mime_type: mime_for_name(name),
                                    file_uri: input.uri_for(name),
                                },
                            }],
                        },
                    ],
                    generation_config: GenerationConfig {
                        response_modalities: vec!["IMAGE".into()],
                    },
                },
            })
            .collect();
        Self { lines }
    }

    /// Number of request lines in the manifest.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the manifest carries no requests.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the manifest as JSON-lines text. Empty manifests render as an
    /// empty string.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&serde_json::to_string(line)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Writes the manifest to `path`, replacing any prior content.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.render()?)?;
        Ok(())
    }
}

fn mime_for_name(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
        .unwrap_or(ImageFormat::Jpeg)
        .mime_type()
        .to_string()
}

// Wire shape required by the batch endpoint; field names are part of the
// contract and stay snake_case, unlike the live generateContent call.
#[derive(Debug, Serialize)]
struct RequestLine {
    custom_id: String,
    method: String,
    request: GenerateRequest,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    FileData { file_data: FileData },
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_modalities: Vec<String>,
}
