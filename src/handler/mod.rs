//! Request handler module
//!
//! Routing dispatch, static file serving and the rebuild webhook.

pub mod router;
pub mod static_files;
pub mod webhook;

// Re-export main entry point
pub use router::handle_request;
