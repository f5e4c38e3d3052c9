//! Route handlers for the HTTP surface
//!
//! Handlers are organized by domain:
//! - [`videos`] - Latest feed snapshot
//! - [`images`] - Cached thumbnails
//! - [`system`] - Health

mod images;
mod system;
mod videos;

pub use images::*;
pub use system::*;
pub use videos::*;
