//! Skeleton storefront - Reference workload.
//!
//! Demonstrates streaming SSR over the Storefront API with:
//! - A root layout that loads the shop header and streams the cart in later
//! - An index page and a product detail page
//! - An error boundary for route errors and loader failures
//! - Crawlers served a complete document, browsers served the shell first

pub mod app;
pub mod assets;
pub mod queries;
pub mod routes;
pub mod server;

pub use app::AppState;
pub use assets::{FAVICON_PATH, STYLESHEET_PATH};
pub use server::{build_router, REQUEST_ID_HEADER};
