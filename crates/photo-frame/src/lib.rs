//! Photo Frame Library
//!
//! Keeps a Synology Photos album mirrored in a [`photo_cache::PhotoCache`]
//! and serves its photos over HTTP, fetching on cache miss.

pub mod config;
pub mod error;
pub mod lookup;
pub mod server;
pub mod source;
pub mod sync;
pub mod types;

pub use config::{Cli, Config};
pub use error::{PhotoFrameError, Result};
pub use lookup::{fetch_photo, Lookup};
pub use server::{create_router, start_server, ServerState, SharedState};
pub use source::{PhotoSource, SynologySource};
pub use sync::{run_sync_loop, sync_once, SyncReport};
