//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! Only the HTTP error mapping lives here; request handlers are provided by
//! the hosting application.

pub mod http;
