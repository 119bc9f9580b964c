//! Object storage for HLS publishing.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability (bucket check/create, upload by path, stat)
//! - An S3-compatible backend for MinIO, R2 and AWS S3
//! - A local filesystem backend for development
//! - [`Publisher`]: ensure-container, publish, public URLs and existence checks

pub mod client;
pub mod config;
pub mod error;
pub mod local;
pub mod publisher;
pub mod store;

pub use client::{S3Config, S3ObjectStore};
pub use config::{StorageBackend, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use local::LocalObjectStore;
pub use publisher::{content_type_for, Publisher};
pub use store::{ObjectStat, ObjectStore};
