//! HTTP protocol layer module
//!
//! Validators, range parsing, MIME detection and response builders,
//! independent of routing.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeOutcome};
pub use response::{
    build_304_response, build_400_response, build_404_response, build_405_response,
    build_413_response, build_416_response, build_empty_response, build_options_response,
    HttpResponse,
};
