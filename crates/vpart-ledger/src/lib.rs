//! Append-only completion ledger.
//!
//! This crate provides:
//! - The [`Ledger`] trait: read completed labels, append one record
//! - [`SheetsLedger`]: Google Sheets REST backend with token caching and retry
//! - [`FileLedger`]: JSON-lines file backend
//! - [`MemoryLedger`]: in-process backend for tests and dry runs

pub mod error;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod sheets;
pub mod token_cache;

pub use error::{LedgerError, LedgerResult};
pub use file::FileLedger;
pub use ledger::{completed_labels, Ledger};
pub use memory::MemoryLedger;
pub use retry::RetryConfig;
pub use sheets::{SheetsConfig, SheetsLedger};
pub use token_cache::{StaticToken, TokenCache, TokenSource, SHEETS_SCOPE};
