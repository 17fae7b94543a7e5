//! Security infrastructure for the streaming SSR storefront.
//!
//! This crate provides:
//! - `Nonce` - Per-request token for inline scripts and styles
//! - `ContentSecurityPolicy` - Policy builder, shop-aware
//! - `SecurityContext` - Nonce, header value and markup scope for one request
//! - `NonceScope` - Stamps the nonce onto rendered markup
//!
//! # Example
//!
//! ```ignore
//! use storefront_security::ContentSecurityPolicy;
//!
//! let ctx = ContentSecurityPolicy::new().with_shop(&env.shop_domains()).build();
//! let tree = ctx.scope.wrap(document);
//! ```

mod nonce;
mod policy;
mod scope;

pub use nonce::*;
pub use policy::*;
pub use scope::*;
