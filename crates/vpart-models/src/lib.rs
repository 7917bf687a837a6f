//! Shared data models for the segment pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source media and segment descriptors
//! - Segment planning (count policy, labels, offsets)
//! - Ledger records and terminal statuses
//! - Transform and encoding configuration
//! - Remote upload destinations

pub mod destination;
pub mod encoding;
pub mod env;
pub mod ledger;
pub mod media;
pub mod planner;
pub mod segment;
pub mod transform;

pub use destination::{guess_mime_type, RemoteDestination, RemoteObject};
pub use encoding::EncodingConfig;
pub use ledger::{LedgerRecord, SegmentStatus};
pub use media::SourceMedia;
pub use planner::{plan_segments, segment_count, PlanError, SegmentCountPolicy};
pub use segment::{label_for, SegmentDescriptor};
pub use transform::TransformConfig;
