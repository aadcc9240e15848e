//! Gemini API client.

use crate::batch::{BatchJob, BatchOperation};
use crate::error::{Result, RetouchError};
use crate::format::ImageFormat;
use crate::model::GeminiModel;
use base64::Engine;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to the `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                RetouchError::Auth("GEMINI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

/// An image returned by the API, decoded from its inline-data part.
#[derive(Debug, Clone)]
pub struct RetouchedImage {
    /// Declared MIME type of the image bytes.
    pub mime_type: String,
    /// Decoded image bytes.
    pub data: Vec<u8>,
}

impl RetouchedImage {
    /// Output extension for this image per the declared MIME type.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime(&self.mime_type).extension()
    }
}

/// Client for the Gemini generative-image API.
///
/// Owns one HTTP connection pool for the whole run; constructed once via
/// [`GeminiClient::builder`] and dropped at end of run.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Sends one image plus an instruction and returns every image found in
    /// the response, across all candidates and content parts.
    pub async fn generate_content(
        &self,
        model: GeminiModel,
        prompt: &str,
        image: &[u8],
    ) -> Result<Vec<RetouchedImage>> {
        let url = format!("{BASE_URL}/v1beta/models/{}:generateContent", model.as_str());

        let mime = ImageFormat::from_magic_bytes(image)
            .unwrap_or(ImageFormat::Jpeg)
            .mime_type();
        let body = GenerateContentRequest::retouch(prompt, image, mime);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let content: GenerateContentResponse = response.json().await?;

        let mut images = Vec::new();
        for candidate in content.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(&inline.data)
                        .map_err(|e| RetouchError::Decode(e.to_string()))?;
                    images.push(RetouchedImage {
                        mime_type: inline.mime_type,
                        data,
                    });
                }
            }
        }
        Ok(images)
    }

    /// Uploads raw bytes to the Files API and returns the `files/...`
    /// resource name.
    pub async fn upload_file(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String> {
        let url = format!("{BASE_URL}/upload/v1beta/files");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let uploaded: UploadFileResponse = response.json().await?;
        Ok(uploaded.file.name)
    }

    /// Registers a batch job over an uploaded request manifest.
    ///
    /// When `dest` is given, the result manifest is directed at that GCS
    /// location; if the service rejects the destination the job is re-created
    /// against the vendor's default storage.
    pub async fn create_batch(
        &self,
        model: GeminiModel,
        src_file: &str,
        dest: Option<&str>,
    ) -> Result<BatchJob> {
        if let Some(gcs_uri) = dest {
            match self.create_batch_inner(model, src_file, Some(gcs_uri)).await {
                Ok(job) => return Ok(job),
                Err(e) => {
                    tracing::warn!(
                        dest = %gcs_uri,
                        "could not set GCS destination ({e}), falling back to default storage"
                    );
                }
            }
        }
        self.create_batch_inner(model, src_file, None).await
    }

    async fn create_batch_inner(
        &self,
        model: GeminiModel,
        src_file: &str,
        dest: Option<&str>,
    ) -> Result<BatchJob> {
        let url = format!(
            "{BASE_URL}/v1beta/models/{}:batchGenerateContent",
            model.as_str()
        );

        let body = CreateBatchRequest {
            batch: BatchSpec {
                display_name: "image-retouch-batch".into(),
                input_config: InputConfig {
                    file_name: src_file.into(),
                },
                output_config: dest.map(|uri| OutputConfig {
                    gcs_uri: uri.into(),
                }),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let operation: BatchOperation = response.json().await?;
        Ok(BatchJob::from_operation(operation))
    }

    /// Fetches the current state of a batch job by its `batches/...` name.
    pub async fn get_batch(&self, name: &str) -> Result<BatchJob> {
        let url = format!("{BASE_URL}/v1beta/{name}");

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let operation: BatchOperation = response.json().await?;
        Ok(BatchJob::from_operation(operation))
    }

    /// Downloads the content of a `files/...` resource (the result manifest).
    pub async fn download_file(&self, name: &str) -> Result<Vec<u8>> {
        let url = format!("{BASE_URL}/v1beta/{name}:download?alt=media");

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn parse_error(&self, status: u16, text: &str) -> RetouchError {
        if status == 429 {
            return RetouchError::RateLimited(text.into());
        }
        if status == 401 || status == 403 {
            return RetouchError::Auth(text.into());
        }
        RetouchError::Api {
            status,
            message: text.into(),
        }
    }
}

// Wire types for the live generateContent call. The REST surface speaks
// camelCase, unlike the batch manifest schema.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

/// A part in a request - inline image data or text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData { inline_data: RequestInlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

impl GenerateContentRequest {
    /// Builds a retouch request: the image first, then the instruction.
    fn retouch(prompt: &str, image: &[u8], mime_type: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: RequestInlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        },
                    },
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateBatchRequest {
    batch: BatchSpec,
}

#[derive(Debug, Serialize)]
struct BatchSpec {
    display_name: String,
    input_config: InputConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_config: Option<OutputConfig>,
}

#[derive(Debug, Serialize)]
struct InputConfig {
    file_name: String,
}

#[derive(Debug, Serialize)]
struct OutputConfig {
    gcs_uri: String,
}
