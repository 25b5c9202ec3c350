//! photovault: a photo storage backend.
//!
//! One blob provider (memory, filesystem, null or an object store) holds
//! image bytes; a metadata store holds one versioned record per photo;
//! a token store tracks refresh tokens. Metadata updates use optimistic
//! concurrency on `last_modified`, and a reconciler imports blobs that have
//! no record yet.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod library;
pub mod logging;
pub mod photo;
pub mod server;
pub mod services;

pub use error::{Error, Result};
