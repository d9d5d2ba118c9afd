//! HTTP request layer: wire types, the write-only response cache, and the
//! credentialed API client with its interceptors.

pub mod api;
pub mod cache;
pub mod types;
