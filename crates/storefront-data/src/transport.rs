//! Outbound HTTP transport for Storefront API calls.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::DataError;

/// A POST to the Storefront API.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Raw upstream response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Sends requests to the upstream API.
#[async_trait]
pub trait StorefrontTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, DataError>;
}

/// HTTPS transport backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder(TokioExecutor::new()).build(https),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorefrontTransport for HyperTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, DataError> {
        let mut builder = Request::builder().method(Method::POST).uri(&request.url);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let outbound = builder
            .body(Full::new(request.body))
            .map_err(|e| DataError::Transport(e.to_string()))?;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| DataError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| DataError::Transport(e.to_string()))?
            .to_bytes();

        Ok(TransportResponse { status, body })
    }
}
