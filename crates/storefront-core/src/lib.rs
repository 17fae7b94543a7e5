//! Core abstractions for the streaming SSR storefront.
//!
//! This crate provides the fundamental types:
//! - `StorefrontEnv` - Shop, API and session configuration
//! - `ClientClassification` - Bot vs. interactive browser
//! - `RequestContext` - Typed request parameters
//! - `LifecyclePhase` - Render lifecycle tracking

mod client;
mod config;
mod context;
mod error;
mod lifecycle;

pub use client::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
