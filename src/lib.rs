//! # pixmill
//!
//! Image manipulation with a uniform request/response contract: resize,
//! compress, format-convert, crop, and metadata inspection, invokable one at
//! a time or as a concurrent batch with per-item failure isolation.
//!
//! # Architecture
//!
//! Requests flow through three layers:
//!
//! ```text
//! caller → dispatch table → operation → format policy → pixel engine → filesystem
//!            (batch fans out here)        (encode options)   (decode/encode)
//! ```
//!
//! The operation layer owns validation and error taxonomy; the format policy
//! owns every quality/lossless defaulting rule; the engine owns pixels. The
//! batch runner fans descriptors out over a bounded rayon pool and fans
//! outcomes back in submission order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Closed format enumeration + per-format encode option rules |
//! | [`ops`] | The five operations: validate, derive options, run a codec job |
//! | [`batch`] | Dispatch table + concurrent batch runner with bulkhead isolation |
//! | [`codec`] | `ImageCodec` trait, job descriptors, and the pure-Rust `PixelEngine` |
//! | [`metadata`] | The read-only metadata record assembled from stat + header probe |
//! | [`output`] | CLI report formatting for batch results |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging (No ImageMagick, No libvips)
//!
//! The [`codec`] module uses the `image` crate (Lanczos3 resampling, rav1e
//! AVIF encoding) plus `avif-parse`/`rav1d` for AVIF decoding — all pure
//! Rust. No system dependencies: the binary is fully self-contained and
//! works the same on any machine.
//!
//! ## Bounded Fan-Out
//!
//! A batch of N items never spawns N threads. Work fans out over the global
//! rayon pool, sized once at startup to at most the machine's core count, so
//! a thousand-item batch cannot exhaust file handles or memory by sheer
//! concurrency.
//!
//! ## Options as Tagged Unions
//!
//! Every format has a different knob set (JPEG quality, PNG compression
//! level, WebP/AVIF lossless). These are modeled as one enum variant per
//! format ([`format::EncodeOptions`]), derived in exactly one place, instead
//! of a stringly-typed option bag that each call site fills differently.

pub mod batch;
pub mod codec;
pub mod format;
pub mod metadata;
pub mod ops;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
