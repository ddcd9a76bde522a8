//! SQLite-backed generation store for intercepted responses.
//!
//! This module provides persistent, versioned partitions using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - One partition per stored category and generation (`{prefix}-{version}`)
//! - Explicit insertion order through a monotonic sequence column
//! - Oldest-first trimming to a per-partition entry limit
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use partitions::{Generation, Partition, PartitionInfo};
