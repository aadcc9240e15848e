#![warn(missing_docs)]
//! Photo retouching via the Gemini image API.
//!
//! Three workflows over one contract:
//!
//! - synchronous: send each image individually and save the returned images
//!   ([`process`]),
//! - batch submit: upload images to Cloud Storage, encode a JSON-lines
//!   request manifest, and register a batch job ([`batch::RequestManifest`]),
//! - batch fetch: check a job and decode its JSON-lines result manifest into
//!   image files ([`batch::parse_result_manifest`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use gemini_retouch::{GeminiClient, GeminiModel, DEFAULT_PROMPT};
//!
//! #[tokio::main]
//! async fn main() -> gemini_retouch::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let image = std::fs::read("photo.jpg")?;
//!     let retouched = client
//!         .generate_content(GeminiModel::Flash25Image, DEFAULT_PROMPT, &image)
//!         .await?;
//!     for (i, img) in retouched.iter().enumerate() {
//!         std::fs::write(format!("retouched_{i}.{}", img.extension()), &img.data)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod batch;
mod client;
mod error;
mod format;
mod model;
pub mod process;
pub mod storage;

pub use client::{GeminiClient, GeminiClientBuilder, RetouchedImage};
pub use error::{RetouchError, Result};
pub use format::ImageFormat;
pub use model::{GeminiModel, DEFAULT_PROMPT};
