//! HTTP inbound adapter.

pub mod error;

pub use error::ApiResult;
