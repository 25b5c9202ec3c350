//! HTTP API handlers organized by concern.

pub mod auth;
pub mod photos;
pub mod system;

// Re-export all handlers for use in routing
pub(crate) use auth::{login, logout, refresh};
pub(crate) use photos::{get_image, get_photo, list_photos, update_metadata};
pub(crate) use system::{health, rescan};
