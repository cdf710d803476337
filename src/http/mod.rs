//! HTTP protocol layer module
//!
//! Conditional requests, range negotiation, content types and response
//! building, independent of how the served tree is laid out.

pub mod body;
pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::{HttpResponse, ResponseBody};
pub use cache::{ConditionalCache, Validator};
pub use range::{negotiate, ByteRange, Negotiated};
pub use response::{
    build_304_response, build_405_response, build_error_response, build_options_response,
    build_redirect_response,
};
