//! Content security policy generation.

use storefront_core::ShopDomains;

use crate::nonce::Nonce;
use crate::scope::NonceScope;

const SELF: &str = "'self'";
const NONE: &str = "'none'";
const UNSAFE_INLINE: &str = "'unsafe-inline'";
const SHOPIFY_CDN: &str = "https://cdn.shopify.com";
const SHOPIFY: &str = "https://shopify.com";
const MONORAIL: &str = "https://monorail-edge.shopifysvc.com";

const DEV_DEFAULT_SOURCES: &[&str] = &["http://localhost:*"];
const DEV_CONNECT_SOURCES: &[&str] = &["http://localhost:*", "ws://localhost:*", "ws://127.0.0.1:*"];

/// A single CSP directive with its source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name (e.g. `default-src`).
    pub name: String,
    /// Source expressions.
    pub sources: Vec<String>,
}

impl Directive {
    fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn push(&mut self, source: impl Into<String>) {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    fn render(&self) -> String {
        if self.sources.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.sources.join(" "))
        }
    }
}

/// Builder for a per-request content security policy.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = ContentSecurityPolicy::new()
///     .with_shop(&shop)
///     .with_directive("img-src", &["'self'", "https://cdn.shopify.com"])
///     .build();
///
/// headers.insert("content-security-policy", ctx.header.parse()?);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentSecurityPolicy {
    shop: Option<ShopDomains>,
    development: bool,
    extra: Vec<Directive>,
}

impl ContentSecurityPolicy {
    /// Create a policy with the default directives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow connections to the shop's checkout and store domains.
    pub fn with_shop(mut self, shop: &ShopDomains) -> Self {
        self.shop = Some(shop.clone());
        self
    }

    /// Allow local development servers.
    pub fn with_development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    /// Add sources to a directive, creating it if needed.
    pub fn with_directive(mut self, name: &str, sources: &[&str]) -> Self {
        self.extra.push(Directive::new(name, sources));
        self
    }

    /// Generate a nonce and produce the security context for one request.
    pub fn build(&self) -> SecurityContext {
        self.build_with_nonce(Nonce::generate())
    }

    /// Produce the security context with a given nonce.
    pub fn build_with_nonce(&self, nonce: Nonce) -> SecurityContext {
        let directives = self.directives(&nonce);
        let header = directives
            .iter()
            .map(Directive::render)
            .collect::<Vec<_>>()
            .join("; ");

        SecurityContext {
            scope: NonceScope::new(nonce.clone()),
            nonce,
            header,
        }
    }

    fn directives(&self, nonce: &Nonce) -> Vec<Directive> {
        let mut default_src = Directive::new("default-src", &[SELF]);
        default_src.push(nonce.source());
        default_src.push(SHOPIFY_CDN);
        default_src.push(SHOPIFY);

        let style_src = Directive::new("style-src", &[SELF, UNSAFE_INLINE, SHOPIFY_CDN]);
        let mut connect_src = Directive::new("connect-src", &[SELF, MONORAIL]);

        if self.development {
            DEV_DEFAULT_SOURCES.iter().for_each(|s| default_src.push(*s));
            DEV_CONNECT_SOURCES.iter().for_each(|s| connect_src.push(*s));
        }

        if let Some(shop) = &self.shop {
            if let Some(domain) = &shop.checkout_domain {
                connect_src.push(https(domain));
            }
            if let Some(domain) = &shop.store_domain {
                connect_src.push(https(domain));
            }
        }

        let mut directives = vec![
            Directive::new("base-uri", &[SELF]),
            default_src,
            Directive::new("frame-ancestors", &[NONE]),
            style_src,
            connect_src,
        ];

        for extra in &self.extra {
            match directives.iter_mut().find(|d| d.name == extra.name) {
                Some(existing) => extra.sources.iter().for_each(|s| existing.push(s.clone())),
                None => directives.push(extra.clone()),
            }
        }

        directives
    }
}

fn https(domain: &str) -> String {
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Security context for one request. Immutable once built.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    /// Per-request nonce.
    pub nonce: Nonce,
    /// `Content-Security-Policy` header value.
    pub header: String,
    /// Scope through which the renderer emits nonced inline markup.
    pub scope: NonceScope,
}
