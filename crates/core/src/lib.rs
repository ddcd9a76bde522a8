//! Core types and shared functionality for mapcache.
//!
//! This crate provides:
//! - Request/response model and the request classifier
//! - Generation store (versioned partitions) with SQLite backend
//! - Oldest-first eviction
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{CacheDb, CacheEntry, Generation, Partition, PartitionInfo};
pub use classify::{Category, Classifier};
pub use config::{AppConfig, ConfigError, PartitionLimits};
pub use error::Error;
pub use model::{Request, RequestKey, RequestMode, Response, ResponseType};
