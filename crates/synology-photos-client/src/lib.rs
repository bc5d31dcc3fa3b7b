//! Synology Photos Client
//!
//! Minimal client for the Synology Photos Web API: session login, album
//! search listings and optimized JPEG downloads.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SynologyPhotosClient, DEFAULT_ADDITIONAL};
pub use error::{Result, SynologyError};
pub use types::{parse_items, PhotoItem};
