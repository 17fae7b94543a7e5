//! Static assets compiled into the binary.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use storefront_data::CacheMode;

pub const STYLESHEET_PATH: &str = "/app.css";
pub const FAVICON_PATH: &str = "/favicon.svg";

const APP_CSS: &str = include_str!("../assets/app.css");
const FAVICON_SVG: &str = include_str!("../assets/favicon.svg");

pub async fn stylesheet() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/css; charset=utf-8".to_string()),
            (CACHE_CONTROL, CacheMode::Long.cache_control()),
        ],
        APP_CSS,
    )
}

pub async fn favicon() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "image/svg+xml".to_string()),
            (CACHE_CONTROL, CacheMode::Long.cache_control()),
        ],
        FAVICON_SVG,
    )
}
