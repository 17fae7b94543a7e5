//! Storefront environment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Storefront API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-01";

/// Shop domains the storefront talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopDomains {
    /// Checkout domain (e.g. `checkout.example.com`).
    #[serde(default)]
    pub checkout_domain: Option<String>,
    /// Store domain (e.g. `example.myshopify.com`).
    #[serde(default)]
    pub store_domain: Option<String>,
}

/// Localization injected into storefront queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18n {
    /// Language code (e.g. `EN`).
    pub language: String,
    /// Country code (e.g. `US`).
    pub country: String,
}

impl Default for I18n {
    fn default() -> Self {
        Self {
            language: "EN".to_string(),
            country: "US".to_string(),
        }
    }
}

/// Storefront environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontEnv {
    /// Store domain (`PUBLIC_STORE_DOMAIN`).
    #[serde(default)]
    pub store_domain: String,
    /// Checkout domain (`PUBLIC_CHECKOUT_DOMAIN`).
    #[serde(default)]
    pub checkout_domain: Option<String>,
    /// Public Storefront API token (`PUBLIC_STOREFRONT_API_TOKEN`).
    #[serde(default)]
    pub public_storefront_api_token: Option<String>,
    /// Private Storefront API token (`PRIVATE_STOREFRONT_API_TOKEN`).
    #[serde(default)]
    pub private_storefront_api_token: Option<String>,
    /// Storefront API version (`PUBLIC_STOREFRONT_API_VERSION`).
    #[serde(default)]
    pub storefront_api_version: Option<String>,
    /// Secret used to sign the session cookie (`SESSION_SECRET`).
    #[serde(default)]
    pub session_secret: String,
    /// Localization defaults.
    #[serde(default)]
    pub i18n: I18n,
    /// Development mode (relaxed content security policy).
    #[serde(default)]
    pub development: bool,
}

impl StorefrontEnv {
    /// Load the environment from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse the environment from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))
    }

    /// Overlay values from process environment variables.
    pub fn with_process_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from a variable lookup.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup("PUBLIC_STORE_DOMAIN") {
            self.store_domain = v;
        }
        if let Some(v) = lookup("PUBLIC_CHECKOUT_DOMAIN") {
            self.checkout_domain = Some(v);
        }
        if let Some(v) = lookup("PUBLIC_STOREFRONT_API_TOKEN") {
            self.public_storefront_api_token = Some(v);
        }
        if let Some(v) = lookup("PRIVATE_STOREFRONT_API_TOKEN") {
            self.private_storefront_api_token = Some(v);
        }
        if let Some(v) = lookup("PUBLIC_STOREFRONT_API_VERSION") {
            self.storefront_api_version = Some(v);
        }
        if let Some(v) = lookup("SESSION_SECRET") {
            self.session_secret = v;
        }
        self
    }

    /// Validate required settings.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.store_domain.trim().is_empty() {
            return Err(CoreError::Missing("PUBLIC_STORE_DOMAIN"));
        }
        if self.session_secret.is_empty() {
            return Err(CoreError::Missing("SESSION_SECRET"));
        }
        Ok(())
    }

    /// Shop domains for the content security policy.
    pub fn shop_domains(&self) -> ShopDomains {
        ShopDomains {
            checkout_domain: self.checkout_domain.clone(),
            store_domain: Some(self.store_domain.clone()).filter(|d| !d.is_empty()),
        }
    }

    /// Configured API version or the default.
    pub fn api_version(&self) -> &str {
        self.storefront_api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_from_toml() {
        let env = StorefrontEnv::from_toml(
            r#"
store_domain = "example.myshopify.com"
checkout_domain = "checkout.example.com"
public_storefront_api_token = "public"
session_secret = "s3cret"
development = true

[i18n]
language = "FR"
country = "CA"
"#,
        )
        .unwrap();

        assert_eq!(env.store_domain, "example.myshopify.com");
        assert_eq!(env.checkout_domain.as_deref(), Some("checkout.example.com"));
        assert_eq!(env.i18n.country, "CA");
        assert!(env.development);
        assert_eq!(env.api_version(), DEFAULT_API_VERSION);
        env.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront.toml");
        std::fs::write(&path, "store_domain = \"a.myshopify.com\"\nsession_secret = \"x\"\n")
            .unwrap();

        let env = StorefrontEnv::load(&path).unwrap();
        assert_eq!(env.store_domain, "a.myshopify.com");
        assert_eq!(env.i18n, I18n::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = StorefrontEnv::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, CoreError::Read { .. }));
    }

    #[test]
    fn test_vars_overlay() {
        let vars: HashMap<&str, &str> = [
            ("PUBLIC_STORE_DOMAIN", "env.myshopify.com"),
            ("PUBLIC_STOREFRONT_API_VERSION", "2024-04"),
            ("SESSION_SECRET", "from-env"),
            ("PUBLIC_CHECKOUT_DOMAIN", ""),
        ]
        .into_iter()
        .collect();

        let env = StorefrontEnv {
            store_domain: "file.myshopify.com".into(),
            checkout_domain: Some("checkout.file.com".into()),
            ..Default::default()
        }
        .with_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(env.store_domain, "env.myshopify.com");
        assert_eq!(env.api_version(), "2024-04");
        assert_eq!(env.session_secret, "from-env");
        // Empty variables do not clobber file values.
        assert_eq!(env.checkout_domain.as_deref(), Some("checkout.file.com"));
    }

    #[test]
    fn test_validate_requires_domain_and_secret() {
        let env = StorefrontEnv::default();
        assert!(matches!(
            env.validate(),
            Err(CoreError::Missing("PUBLIC_STORE_DOMAIN"))
        ));

        let env = StorefrontEnv {
            store_domain: "a.myshopify.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            env.validate(),
            Err(CoreError::Missing("SESSION_SECRET"))
        ));
    }

    #[test]
    fn test_shop_domains() {
        let env = StorefrontEnv {
            store_domain: "a.myshopify.com".into(),
            checkout_domain: Some("checkout.a.com".into()),
            ..Default::default()
        };
        let shop = env.shop_domains();
        assert_eq!(shop.store_domain.as_deref(), Some("a.myshopify.com"));
        assert_eq!(shop.checkout_domain.as_deref(), Some("checkout.a.com"));

        assert_eq!(StorefrontEnv::default().shop_domains().store_domain, None);
    }
}
