//! Outbound HTTP

pub mod http;

pub use http::HttpFetcher;
