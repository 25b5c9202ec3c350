//! Storage services behind the photo library and the auth service.
//!
//! - **blob**: image bytes, one provider per deployment
//! - **metadata**: photo records with conditional updates
//! - **tokens**: refresh-token records with TTL

pub mod blob;
pub mod metadata;
pub mod tokens;
