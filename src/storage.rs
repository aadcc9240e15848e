//! Google Cloud Storage locations and uploads.

use crate::error::{Result, RetouchError};
use crate::format::ImageFormat;
use std::path::Path;

/// A `gs://bucket/prefix/` location.
///
/// The prefix is normalized to end with a separator so object names can be
/// formed by plain concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsLocation {
    bucket: String,
    prefix: String,
}

impl GcsLocation {
    /// Parses a `gs://` URI into bucket and prefix.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("gs://").ok_or_else(|| {
            RetouchError::InvalidLocation(format!("expected a gs:// URI, got {uri:?}"))
        })?;

        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(RetouchError::InvalidLocation(format!(
                "missing bucket name in {uri:?}"
            )));
        }

        let mut prefix = prefix.to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The normalized object prefix (empty or `/`-terminated).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object name for a file under this location.
    pub fn object_name(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }

    /// Full `gs://` URI for a file under this location.
    pub fn uri_for(&self, file_name: &str) -> String {
        format!("gs://{}/{}{}", self.bucket, self.prefix, file_name)
    }
}

impl std::fmt::Display for GcsLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.prefix)
    }
}

/// Gets a bearer token by running `gcloud auth print-access-token`.
fn gcloud_access_token() -> Result<String> {
    let output = std::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| {
            RetouchError::Auth(format!(
                "failed to run gcloud CLI: {e}. Install it from https://cloud.google.com/sdk/docs/install"
            ))
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RetouchError::Auth(format!("gcloud auth failed: {stderr}")));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Uploads local files into a [`GcsLocation`] via the JSON API.
///
/// Auth uses the gcloud CLI; the token is acquired once when the uploader is
/// created.
pub struct GcsUploader {
    client: reqwest::Client,
    token: String,
}

impl GcsUploader {
    /// Creates an uploader, resolving credentials via the gcloud CLI.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            token: gcloud_access_token()?,
        })
    }

    /// Uploads one object. The MIME type is implied by the filename
    /// extension.
    pub async fn upload(
        &self,
        location: &GcsLocation,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let mime = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Jpeg)
            .mime_type();

        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            location.bucket()
        );
        let object = location.object_name(file_name);

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .bearer_auth(&self.token)
            .header("Content-Type", mime)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RetouchError::Api {
                status: status.as_u16(),
                message: format!("upload of {object} failed: {text}"),
            });
        }

        tracing::debug!(object = %object, "uploaded to GCS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_prefix() {
        let loc = GcsLocation::parse("gs://gemini-image-retouch/raw/").unwrap();
        assert_eq!(loc.bucket(), "gemini-image-retouch");
        assert_eq!(loc.prefix(), "raw/");
    }

    #[test]
    fn test_parse_normalizes_missing_trailing_slash() {
        let loc = GcsLocation::parse("gs://bucket/some/deep/prefix").unwrap();
        assert_eq!(loc.prefix(), "some/deep/prefix/");
    }

    #[test]
    fn test_parse_bucket_only() {
        let loc = GcsLocation::parse("gs://bucket").unwrap();
        assert_eq!(loc.bucket(), "bucket");
        assert_eq!(loc.prefix(), "");
        assert_eq!(loc.uri_for("a.jpg"), "gs://bucket/a.jpg");
    }

    #[test]
    fn test_parse_rejects_non_gs_uri() {
        assert!(GcsLocation::parse("s3://bucket/raw/").is_err());
        assert!(GcsLocation::parse("bucket/raw/").is_err());
        assert!(GcsLocation::parse("gs://").is_err());
    }

    #[test]
    fn test_object_name_and_uri() {
        let loc = GcsLocation::parse("gs://bucket/raw").unwrap();
        assert_eq!(loc.object_name("a.jpg"), "raw/a.jpg");
        assert_eq!(loc.uri_for("a.jpg"), "gs://bucket/raw/a.jpg");
    }

    #[test]
    fn test_display_round_trip() {
        let loc = GcsLocation::parse("gs://bucket/raw").unwrap();
        assert_eq!(loc.to_string(), "gs://bucket/raw/");
        assert_eq!(GcsLocation::parse(&loc.to_string()).unwrap(), loc);
    }
}
