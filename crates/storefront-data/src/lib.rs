//! Data loading for the storefront.
//!
//! This crate provides:
//! - `StorefrontClient` - GraphQL client for the Storefront API
//! - `CacheMode` / `QueryCache` - Per-query caching with stale-while-revalidate
//! - `RetryPolicy` - Retry strategies for upstream failures
//! - `SessionStore` / `CookieSession` - Signed cookie sessions
//! - `StorefrontTransport` - Outbound HTTP seam

mod cache;
mod client;
mod error;
mod retry;
mod session;
mod transport;

pub use cache::*;
pub use client::*;
pub use error::*;
pub use retry::*;
pub use session::*;
pub use transport::*;
