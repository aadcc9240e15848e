//! Batch-job workflow: request manifest encoding, result manifest decoding,
//! and the job model tying the two together.

mod job;
mod manifest;
mod results;

pub use job::{BatchJob, BatchState};
pub(crate) use job::BatchOperation;
pub use manifest::{decode_custom_id, encode_custom_id, RequestManifest, CUSTOM_ID_TAG};
pub use results::{
    parse_result_manifest, write_images, DecodedImage, ItemError, LineFailure, ResultSummary,
    OUTPUT_SUFFIX,
};
