//! HTTP host: routes, the page pipeline and response conversion.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use storefront_core::{RequestContext, RequestId};
use storefront_data::{SessionStore, StorefrontClient};
use storefront_observability::{RenderMetrics, StructuredLogger};
use storefront_streaming::{escape_html, AssembledResponse, RenderRequest};
use tracing::Instrument;

use crate::app::AppState;
use crate::assets::{self, FAVICON_PATH, STYLESHEET_PATH};
use crate::routes::{self, error_boundary, RouteError};

/// Header echoing the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the storefront router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/products/{handle}", get(product))
        .route(STYLESHEET_PATH, get(assets::stylesheet))
        .route(FAVICON_PATH, get(assets::favicon))
        .fallback(not_found)
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>, uri: Uri, headers: HeaderMap) -> Response {
    let ctx = RequestContext::new(uri.to_string(), headers);
    render_page(&state, ctx, Page::Index).await
}

async fn product(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let ctx = RequestContext::new(uri.to_string(), headers).with_param("handle", handle.clone());
    render_page(&state, ctx, Page::Product(handle)).await
}

async fn not_found(State(state): State<Arc<AppState>>, uri: Uri, headers: HeaderMap) -> Response {
    let ctx = RequestContext::new(uri.to_string(), headers);
    render_page(&state, ctx, Page::NotFound).await
}

enum Page {
    Index,
    Product(String),
    NotFound,
}

impl Page {
    fn route(&self) -> &'static str {
        match self {
            Self::Index => "/",
            Self::Product(_) => "/products/{handle}",
            Self::NotFound => "*",
        }
    }

    async fn load(&self, client: &StorefrontClient) -> Result<String, RouteError> {
        match self {
            Self::Index => Ok(routes::index::view()),
            Self::Product(handle) => {
                let product = routes::product::load(client, handle).await?;
                Ok(routes::product::view(&product))
            }
            Self::NotFound => Err(RouteError::not_found()),
        }
    }
}

async fn render_page(state: &AppState, mut ctx: RequestContext, page: Page) -> Response {
    let logger = StructuredLogger::new(ctx.request_id.clone())
        .with_route(page.route())
        .with_client(ctx.classification);
    let span = logger.span();

    async move {
        logger.info("request started");

        let session = match state.session(&ctx) {
            Ok(session) => session,
            Err(e) => {
                logger.error("session unavailable", &e);
                return error_page(&ctx.request_id);
            }
        };

        let (root, body) = tokio::join!(
            routes::root::load(&state.client, &session),
            page.load(&state.client),
        );
        ctx.timing.mark("loaded");
        tracing::debug!(
            loaders_ms = ctx.timing.since_start("loaded").map(|d| d.as_millis() as u64),
            "loaders finished"
        );

        let mut status = StatusCode::OK;
        let mut children = match body {
            Ok(html) => html,
            Err(e) => {
                status = e.status();
                error_boundary(&e, &logger)
            }
        };
        let root = match root {
            Ok(root) => Some(root),
            Err(e) => {
                status = e.status();
                children = error_boundary(&e, &logger);
                None
            }
        };

        let mut headers = HeaderMap::new();
        match session.commit().await {
            Ok(Some(cookie)) => match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.insert(SET_COOKIE, value);
                }
                Err(e) => logger.error("invalid session cookie", &e),
            },
            Ok(None) => {}
            Err(e) => logger.error("session commit failed", &e),
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id.0) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let request = RenderRequest::new(ctx.classification)
            .with_request_id(ctx.request_id.clone())
            .with_url(ctx.url.clone())
            .with_status(status)
            .with_headers(headers);
        let document = routes::root::document(root, children);

        match state.assembler.build_response(request, document).await {
            Ok(assembled) => {
                logger.info("response resolved");
                stream_response(assembled, page.route())
            }
            Err(e) => {
                logger.error("render failed", &e);
                error_page(&ctx.request_id)
            }
        }
    }
    .instrument(span)
    .await
}

/// Hand the streamed body to the transport and record metrics once it settles.
fn stream_response(assembled: AssembledResponse, route: &'static str) -> Response {
    let AssembledResponse {
        status,
        headers,
        body,
        settled,
    } = assembled;

    tokio::spawn(async move {
        if let Some(report) = settled.report().await {
            RenderMetrics::from_report(&report).with_route(route).record();
        }
    });

    let mut response = Response::new(Body::from_stream(body.map(Ok::<_, Infallible>)));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Generic page for requests whose shell could not be rendered.
fn error_page(request_id: &RequestId) -> Response {
    let html = format!(
        concat!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Server Error</title></head>\n",
            "<body><h1>Something went wrong</h1><p>Request ID: {}</p></body>\n</html>\n"
        ),
        escape_html(&request_id.0)
    );

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response();
    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
