//! State module for tracking partition progress
//!
//! # Components
//!
//! - `PartitionStatus`: Where a partition is in the orchestration run
//! - `StopReason`: Why the page crawler stopped paginating a partition

mod partition_state;

pub use partition_state::{PartitionStatus, StopReason};
