//! Shared application state.

use std::sync::Arc;

use anyhow::Context;
use storefront_core::{RequestContext, StorefrontEnv};
use storefront_data::{
    CookieSession, SessionError, StorefrontClient, StorefrontConfig, StorefrontTransport,
};
use storefront_streaming::{DocumentRenderer, ResponseAssembler};

/// State shared by every request.
pub struct AppState {
    pub env: StorefrontEnv,
    pub client: StorefrontClient,
    pub assembler: ResponseAssembler<DocumentRenderer>,
    session_secrets: Vec<String>,
}

impl AppState {
    /// Validate the environment and wire the storefront client.
    pub fn new(env: StorefrontEnv, transport: Arc<dyn StorefrontTransport>) -> anyhow::Result<Self> {
        env.validate().context("invalid storefront environment")?;

        let config = StorefrontConfig::from_env(&env).context("invalid Storefront API settings")?;
        let client = StorefrontClient::new(config, transport);
        let assembler = ResponseAssembler::new(DocumentRenderer, env.shop_domains())
            .with_development(env.development);

        // Comma-separated so secrets can be rotated: first signs, any verifies.
        let session_secrets = env
            .session_secret
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            env,
            client,
            assembler,
            session_secrets,
        })
    }

    /// Restore the visitor's session from the request cookies.
    pub fn session(&self, ctx: &RequestContext) -> Result<CookieSession, SessionError> {
        CookieSession::from_cookie_header(
            ctx.header(http::header::COOKIE.as_str()),
            self.session_secrets.clone(),
        )
    }
}
