//! HTTP protocol layer module
//!
//! Protocol helpers shared by the dish core and the server: cache validators,
//! MIME lookup and canned responses.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_405_response, build_500_response, build_error_response,
    build_options_response,
};
