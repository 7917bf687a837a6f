//! Cloudflare R2 uploader.
//!
//! This crate provides:
//! - The [`Uploader`] trait and its R2 (S3 API) implementation
//! - [`RetryPolicy`]: max attempts plus fixed or exponential backoff
//! - [`upload_with_retry`]: retrying upload that reports attempt counts

pub mod client;
pub mod error;
pub mod retry;
pub mod uploader;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult, UploadError};
pub use retry::{upload_with_retry, Backoff, RetryPolicy, UploadOutcome};
pub use uploader::{object_key, R2Uploader, Uploader};
