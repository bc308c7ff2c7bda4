//! Concurrent batch execution over the operation dispatch table.
//!
//! A batch is an ordered list of heterogeneous operation descriptors. All
//! items fan out across the rayon worker pool and every item's success or
//! failure is captured independently — one unreadable file never aborts its
//! siblings. The outcome list always has the same length and order as the
//! input, regardless of completion order; failed entries carry their
//! zero-based input index so callers can correlate positionally.
//!
//! The dispatch table ([`dispatch`]) is shared with direct invocation, so an
//! operation behaves identically alone or inside a batch. Descriptors name
//! operations by wire tag:
//!
//! | Tag | Operation |
//! |---|---|
//! | `resize-image` | [`ops::resize_image`] |
//! | `compress-image` | [`ops::compress_image`] |
//! | `convert-image-format` | [`ops::convert_format`] |
//! | `crop-image` | [`ops::crop_image`] |
//! | `get-image-metadata` | [`ops::image_metadata`] |

use crate::codec::ImageCodec;
use crate::ops::{self, OpError, OperationOutput};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One batch entry: an operation tag plus its (still untyped) options.
///
/// Options stay a raw JSON value until dispatch so that a bad tag or a
/// malformed option set fails that entry alone, not the whole batch parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub tool_name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Per-item result: either the operation's output, or an error message plus
/// the item's position in the submitted batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl BatchOutcome {
    fn success(result: OperationOutput) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            index: None,
        }
    }

    fn failure(index: usize, error: &OpError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.to_string()),
            index: Some(index),
        }
    }
}

fn parse_options<T: DeserializeOwned>(tool: &str, options: serde_json::Value) -> Result<T, OpError> {
    serde_json::from_value(options).map_err(|e| OpError::InvalidOptions {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Resolve an operation tag and run it against the codec.
pub fn dispatch(
    codec: &impl ImageCodec,
    tool: &str,
    options: serde_json::Value,
) -> Result<OperationOutput, OpError> {
    match tool {
        "resize-image" => {
            ops::resize_image(codec, &parse_options(tool, options)?).map(OperationOutput::Path)
        }
        "compress-image" => {
            ops::compress_image(codec, &parse_options(tool, options)?).map(OperationOutput::Path)
        }
        "convert-image-format" => {
            ops::convert_format(codec, &parse_options(tool, options)?).map(OperationOutput::Path)
        }
        "crop-image" => {
            ops::crop_image(codec, &parse_options(tool, options)?).map(OperationOutput::Path)
        }
        "get-image-metadata" => {
            ops::image_metadata(codec, &parse_options(tool, options)?)
                .map(OperationOutput::Metadata)
        }
        other => Err(OpError::UnknownOperation(other.to_string())),
    }
}

/// Run every batch item concurrently and collect outcomes in input order.
///
/// Concurrency comes from the global rayon pool (see [`init_worker_pool`]),
/// so fan-out is bounded by the configured worker count rather than the
/// batch length. `par_iter` + `collect` keeps results index-addressed: the
/// outcome list matches the submission order no matter which items finish
/// first.
pub fn run_batch(codec: &impl ImageCodec, items: &[BatchItem]) -> Vec<BatchOutcome> {
    items
        .par_iter()
        .enumerate()
        .map(
            |(index, item)| match dispatch(codec, &item.tool_name, item.options.clone()) {
                Ok(output) => BatchOutcome::success(output),
                Err(e) => BatchOutcome::failure(index, &e),
            },
        )
        .collect()
}

/// Resolve the effective worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(requested: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

/// Initialize the global rayon pool with a bounded worker count.
///
/// Call once at process start, before the first batch. Errors (pool already
/// built, e.g. in tests) are ignored; rayon then keeps its existing pool.
pub fn init_worker_pool(requested: Option<usize>) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(effective_workers(requested))
        .build_global()
        .ok();
}
