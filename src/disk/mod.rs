//! Yandex Disk integration
//!
//! This module provides:
//! - API types for resources, directory pages and pre-signed links
//! - Client for listing, downloading, uploading and creating folders

pub mod client;
pub mod types;

pub use client::{normalize_path, YandexDiskClient, DEFAULT_LIST_LIMIT};
pub use types::*;
