//! End-to-end page tests.
//!
//! Drives the router with an in-memory Storefront API and checks status,
//! headers and streamed markup for both client classes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use skeleton_storefront::{build_router, AppState, REQUEST_ID_HEADER};
use storefront_core::StorefrontEnv;
use storefront_data::{
    CookieSession, DataError, SessionStore, StorefrontTransport, TransportRequest,
    TransportResponse,
};
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const BROWSER: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15";
const CRAWLER: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// In-memory Storefront API.
#[derive(Default)]
struct FakeStorefront {
    layout_fails: bool,
    cart_fails: bool,
    queries: Mutex<Vec<Value>>,
}

impl FakeStorefront {
    fn queries(&self) -> Vec<Value> {
        self.queries.lock().unwrap().clone()
    }
}

fn graphql(body: Value) -> Result<TransportResponse, DataError> {
    Ok(TransportResponse {
        status: http::StatusCode::OK,
        body: Bytes::from(body.to_string()),
    })
}

#[async_trait]
impl StorefrontTransport for FakeStorefront {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, DataError> {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        self.queries.lock().unwrap().push(body.clone());
        let query = body["query"].as_str().unwrap_or_default();

        if query.starts_with("query layout") {
            if self.layout_fails {
                return graphql(json!({"errors": [{"message": "shop unavailable"}]}));
            }
            return graphql(json!({"data": {"shop": {
                "name": "Hydro",
                "description": "Boards & bindings"
            }}}));
        }

        if query.starts_with("query Product") {
            let product = match body["variables"]["handle"].as_str() {
                Some("abcdef") => json!({
                    "id": "gid://shopify/Product/1",
                    "title": "The Hydrogen",
                    "descriptionHtml": "<p>A <em>fast</em> board.</p>"
                }),
                Some("tampered") => json!({
                    "id": "gid://shopify/Product/2",
                    "title": "Tampered",
                    "descriptionHtml": "<p>Sale</p><script>steal()</script>"
                }),
                _ => Value::Null,
            };
            return graphql(json!({"data": {"product": product}}));
        }

        if query.starts_with("query CartQuery") {
            if self.cart_fails {
                return graphql(json!({"errors": [{"message": "cart expired"}]}));
            }
            return graphql(json!({"data": {"cart": {
                "id": body["variables"]["cartId"],
                "checkoutUrl": "https://checkout.example.com/c/1",
                "totalQuantity": 2,
                "cost": {"totalAmount": {"amount": "20.0", "currencyCode": "USD"}}
            }}}));
        }

        graphql(json!({"errors": [{"message": "unknown query"}]}))
    }
}

fn env() -> StorefrontEnv {
    StorefrontEnv {
        store_domain: "example.myshopify.com".into(),
        checkout_domain: Some("checkout.example.com".into()),
        public_storefront_api_token: Some("public".into()),
        session_secret: SECRET.into(),
        ..Default::default()
    }
}

fn router(storefront: &Arc<FakeStorefront>) -> Router {
    let state = AppState::new(env(), storefront.clone()).unwrap();
    build_router(Arc::new(state))
}

fn get(uri: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::USER_AGENT, user_agent)
        .body(Body::empty())
        .unwrap()
}

async fn cart_cookie() -> String {
    let session = CookieSession::new(vec![SECRET.to_string()]).unwrap();
    session.set("cartId", "gid://shopify/Cart/1").await;
    session.set("customerAccessToken", "token").await;
    let set_cookie = session.commit().await.unwrap().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn nonce_from_policy(policy: &str) -> String {
    let start = policy.find("'nonce-").unwrap() + "'nonce-".len();
    let end = start + policy[start..].find('\'').unwrap();
    policy[start..end].to_string()
}

// === Index Tests ===

#[tokio::test]
async fn test_index_renders_layout() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront).oneshot(get("/", BROWSER)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(response.headers().get(REQUEST_ID_HEADER).is_some());

    let html = body_text(response).await;
    assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
    assert!(html.contains(r#"<div class="PageLayout"><h1>Hydro (skeleton)</h1><h2>Boards &amp; bindings</h2>"#));
    assert!(html.contains(r#"<a href="/products/abcdef">TEST product</a>"#));
    assert!(html.contains(r#"<link rel="stylesheet" href="/app.css">"#));
    assert!(html.contains(r#"<link rel="preconnect" href="https://shop.app">"#));
    assert!(!html.contains("deferred-cart"));
    assert!(html.ends_with("</html>\n"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let storefront = Arc::new(FakeStorefront::default());
    let request = Request::builder()
        .uri("/")
        .header(REQUEST_ID_HEADER, "req-abc")
        .body(Body::empty())
        .unwrap();

    let response = router(&storefront).oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-abc");
}

#[tokio::test]
async fn test_inline_scripts_carry_policy_nonce() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront).oneshot(get("/", BROWSER)).await.unwrap();

    let policy = response.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .to_string();
    let nonce = nonce_from_policy(&policy);
    let html = body_text(response).await;

    let scripts = html.matches("<script").count();
    assert!(scripts >= 2);
    assert_eq!(html.matches(&format!(r#"<script nonce="{}">"#, nonce)).count(), scripts);
    assert!(html.contains("window.__storefrontContext={\"isLoggedIn\":false"));
}

#[tokio::test]
async fn test_policy_scoped_to_shop_for_crawlers() {
    let storefront = Arc::new(FakeStorefront::default());
    let app = router(&storefront);

    let bot = app.clone().oneshot(get("/", CRAWLER)).await.unwrap();
    let policy = bot.headers()[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(policy.contains("https://example.myshopify.com"));
    assert!(policy.contains("https://checkout.example.com"));

    let browser = app.oneshot(get("/", BROWSER)).await.unwrap();
    let policy = browser.headers()[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(!policy.contains("example.myshopify.com"));
}

// === Product Tests ===

#[tokio::test]
async fn test_product_page() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront)
        .oneshot(get("/products/abcdef", BROWSER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(
        r#"<div class="product"><h1>The Hydrogen</h1><br/><p><strong>Description</strong></p><br/><div><p>A <em>fast</em> board.</p></div><br/></div>"#
    ));

    let product_query = storefront
        .queries()
        .into_iter()
        .find(|q| q["query"].as_str().unwrap().starts_with("query Product"))
        .unwrap();
    assert_eq!(product_query["variables"], json!({"handle": "abcdef"}));
}

#[tokio::test]
async fn test_description_scripts_are_not_nonced() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront)
        .oneshot(get("/products/tampered", BROWSER))
        .await
        .unwrap();

    let policy = response.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .to_string();
    let nonce = nonce_from_policy(&policy);
    let html = body_text(response).await;

    assert!(html.contains("<div><p>Sale</p><script>steal()</script></div>"));
    assert!(!html.contains(&format!(r#"<script nonce="{}">steal()"#, nonce)));
    assert_eq!(
        html.matches(&format!(r#"<script nonce="{}">"#, nonce)).count(),
        html.matches("<script").count() - 1
    );
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront)
        .oneshot(get("/products/nope", CRAWLER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("<h1>Hydro (skeleton)</h1>"));
    assert!(html.contains("<div>Route Error</div>"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let storefront = Arc::new(FakeStorefront::default());
    let response = router(&storefront)
        .oneshot(get("/collections/all", BROWSER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("<div>Route Error</div>"));
}

// === Root Loader Tests ===

#[tokio::test]
async fn test_layout_failure_renders_thrown_error() {
    let storefront = Arc::new(FakeStorefront {
        layout_fails: true,
        ..Default::default()
    });
    let response = router(&storefront).oneshot(get("/", BROWSER)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await;
    assert!(html.contains("<div>Thrown Error</div>"));
    assert!(!html.contains("PageLayout"));
    assert!(!html.contains("__storefrontContext"));
}

#[tokio::test]
async fn test_cart_streams_after_shell() {
    let storefront = Arc::new(FakeStorefront::default());
    let request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, BROWSER)
        .header(header::COOKIE, cart_cookie().await)
        .body(Body::empty())
        .unwrap();

    let response = router(&storefront).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    let placeholder = html
        .find(r#"<div id="deferred-cart"><p class="cart">Loading cart...</p></div>"#)
        .unwrap();
    let content = html.find(r#"<template id="deferred-cart-content">"#).unwrap();
    assert!(placeholder < content);
    assert!(html.contains(r#"Cart (2)</a> <span>20.0 USD</span>"#));
    assert!(html.contains("\"isLoggedIn\":true"));

    let cart_query = storefront
        .queries()
        .into_iter()
        .find(|q| q["query"].as_str().unwrap().starts_with("query CartQuery"))
        .unwrap();
    assert_eq!(
        cart_query["variables"],
        json!({"cartId": "gid://shopify/Cart/1", "country": "US", "language": "EN"})
    );
}

#[tokio::test]
async fn test_cart_failure_keeps_browser_status() {
    let storefront = Arc::new(FakeStorefront {
        cart_fails: true,
        ..Default::default()
    });
    let request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, BROWSER)
        .header(header::COOKIE, cart_cookie().await)
        .body(Body::empty())
        .unwrap();

    let response = router(&storefront).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Loading cart..."));
    assert!(!html.contains("deferred-cart-content"));
}

#[tokio::test]
async fn test_cart_failure_fails_crawler_response() {
    let storefront = Arc::new(FakeStorefront {
        cart_fails: true,
        ..Default::default()
    });
    let request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, CRAWLER)
        .header(header::COOKIE, cart_cookie().await)
        .body(Body::empty())
        .unwrap();

    let response = router(&storefront).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("<h1>Hydro (skeleton)</h1>"));
}

#[tokio::test]
async fn test_forged_session_is_ignored() {
    let storefront = Arc::new(FakeStorefront::default());
    let request = Request::builder()
        .uri("/")
        .header(header::USER_AGENT, BROWSER)
        .header(header::COOKIE, "session=eyJjYXJ0SWQiOiJ4In0.bad")
        .body(Body::empty())
        .unwrap();

    let response = router(&storefront).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains("deferred-cart"));
    assert!(storefront
        .queries()
        .iter()
        .all(|q| !q["query"].as_str().unwrap().starts_with("query CartQuery")));
}

// === Asset Tests ===

#[tokio::test]
async fn test_static_assets() {
    let storefront = Arc::new(FakeStorefront::default());
    let app = router(&storefront);

    let css = app.clone().oneshot(get("/app.css", BROWSER)).await.unwrap();
    assert_eq!(css.status(), StatusCode::OK);
    assert_eq!(css.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
    assert!(body_text(css).await.contains(".PageLayout"));

    let icon = app.oneshot(get("/favicon.svg", BROWSER)).await.unwrap();
    assert_eq!(icon.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert!(storefront.queries().is_empty());
}
