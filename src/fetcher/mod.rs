//! Resource fetcher for portrait images
//!
//! This module turns each distinct image reference into exactly one file in
//! the artifact cache:
//! - Deterministic, filesystem-safe filenames derived from the reference
//! - Cache-hit fast path with no network call
//! - Streamed retrieval with bounded exponential backoff
//! - Atomic placement so a cached file is never partial

mod filename;
mod resource;
mod retry;

pub use filename::derive_filename;
pub use resource::ResourceFetcher;
pub use retry::RetryPolicy;
