//! HTTP client building for token endpoints.

mod client;

pub use client::{HttpClientBuilder, HttpClientConfig};
