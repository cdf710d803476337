//! Request handler module
//!
//! Routes requests onto the served trees and the fixed assets, and renders
//! directory listings.

pub mod delivery;
pub mod render;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
