//! Storage abstraction over the blob and metadata stores.
//!
//! [`PhotoLibrary`] is the only API request handlers use for photos;
//! [`Reconciler`] runs the out-of-band rescan against the same library.

mod reconciler;
mod service;
mod signature;

#[cfg(test)]
mod property_tests;

pub use reconciler::{Reconciler, RescanReport};
pub use service::{Blob, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PhotoLibrary, PhotoPage};
pub use signature::{ImageFormat, sniff};
