//! Partition inspection and maintenance tools.

pub mod partitions;
pub mod purge;

pub use partitions::partitions_impl;
pub use purge::{CachePurgeParams, purge_impl};
