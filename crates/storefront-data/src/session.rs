//! Signed cookie sessions.
//!
//! Session values live in a single `session` cookie:
//! `base64url(json) "." base64url(hmac_sha256(secret, base64url(json)))`.
//! New cookies are signed with the first secret; any configured secret
//! verifies an incoming one, so secrets can be rotated.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Attributes appended to every session `Set-Cookie`.
const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; SameSite=Lax";

/// Async key/value access to the visitor's session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    async fn set(&self, key: &str, value: &str);

    /// Remove a value.
    async fn unset(&self, key: &str);

    /// Serialize pending changes as a `Set-Cookie` value, if there are any.
    async fn commit(&self) -> Result<Option<String>, SessionError>;
}

#[derive(Debug, Default)]
struct SessionState {
    values: BTreeMap<String, String>,
    dirty: bool,
}

/// Session stored in a signed cookie.
#[derive(Debug)]
pub struct CookieSession {
    secrets: Vec<String>,
    state: Mutex<SessionState>,
}

impl CookieSession {
    /// Start an empty session.
    pub fn new(secrets: Vec<String>) -> Result<Self, SessionError> {
        if secrets.iter().all(|s| s.is_empty()) {
            return Err(SessionError::NoSecret);
        }
        Ok(Self {
            secrets,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Restore a session from a request's `Cookie` header.
    ///
    /// A missing, malformed or forged cookie yields an empty session.
    pub fn from_cookie_header(
        cookie_header: Option<&str>,
        secrets: Vec<String>,
    ) -> Result<Self, SessionError> {
        let session = Self::new(secrets)?;

        let Some(raw) = cookie_header.and_then(|h| find_cookie(h, SESSION_COOKIE)) else {
            return Ok(session);
        };

        match session.decode(raw) {
            Ok(values) => {
                if let Ok(mut state) = session.state.lock() {
                    state.values = values;
                }
            }
            Err(e) => tracing::debug!(error = %e, "discarding session cookie"),
        }
        Ok(session)
    }

    /// Snapshot of the current values.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.state
            .lock()
            .map(|s| s.values.clone())
            .unwrap_or_default()
    }

    fn sign(&self, secret: &str, payload: &str) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    fn encode(&self, values: &BTreeMap<String, String>) -> Result<String, SessionError> {
        let secret = self
            .secrets
            .iter()
            .find(|s| !s.is_empty())
            .ok_or(SessionError::NoSecret)?;
        let json =
            serde_json::to_vec(values).map_err(|e| SessionError::Serialization(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(secret, &payload)?.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    fn decode(&self, raw: &str) -> Result<BTreeMap<String, String>, SessionError> {
        let (payload, signature) = raw
            .split_once('.')
            .ok_or_else(|| SessionError::Malformed("missing signature".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;

        let verified = self
            .secrets
            .iter()
            .filter(|s| !s.is_empty())
            .any(|secret| {
                self.sign(secret, payload)
                    .map(|mac| mac.verify_slice(&signature).is_ok())
                    .unwrap_or(false)
            });
        if !verified {
            return Err(SessionError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| SessionError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for CookieSession {
    async fn get(&self, key: &str) -> Option<String> {
        self.state.lock().ok()?.values.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        if let Ok(mut state) = self.state.lock() {
            if state.values.get(key).map(String::as_str) != Some(value) {
                state.values.insert(key.to_string(), value.to_string());
                state.dirty = true;
            }
        }
    }

    async fn unset(&self, key: &str) {
        if let Ok(mut state) = self.state.lock() {
            if state.values.remove(key).is_some() {
                state.dirty = true;
            }
        }
    }

    async fn commit(&self) -> Result<Option<String>, SessionError> {
        let values = match self.state.lock() {
            Ok(state) if state.dirty => state.values.clone(),
            _ => return Ok(None),
        };

        let cookie = if values.is_empty() {
            format!("{}=; {}; Max-Age=0", SESSION_COOKIE, COOKIE_ATTRIBUTES)
        } else {
            format!("{}={}; {}", SESSION_COOKIE, self.encode(&values)?, COOKIE_ATTRIBUTES)
        };

        if let Ok(mut state) = self.state.lock() {
            state.dirty = false;
        }
        Ok(Some(cookie))
    }
}

/// Find a cookie value in a `Cookie` header.
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Vec<String> {
        vec!["s3cret".to_string()]
    }

    async fn committed_cookie(session: &CookieSession) -> String {
        let set_cookie = session.commit().await.unwrap().unwrap();
        let value = set_cookie
            .strip_prefix("session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        format!("theme=dark; session={}", value)
    }

    #[test]
    fn test_requires_secret() {
        assert_eq!(
            CookieSession::new(vec![String::new()]).unwrap_err(),
            SessionError::NoSecret
        );
    }

    #[tokio::test]
    async fn test_set_get_unset() {
        let session = CookieSession::new(secrets()).unwrap();
        assert_eq!(session.get("cartId").await, None);

        session.set("cartId", "gid://shopify/Cart/1").await;
        assert_eq!(session.get("cartId").await.as_deref(), Some("gid://shopify/Cart/1"));

        session.unset("cartId").await;
        assert_eq!(session.get("cartId").await, None);
    }

    #[tokio::test]
    async fn test_commit_only_when_changed() {
        let session = CookieSession::new(secrets()).unwrap();
        assert_eq!(session.commit().await.unwrap(), None);

        session.set("a", "1").await;
        let cookie = session.commit().await.unwrap().unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.ends_with("; Path=/; HttpOnly; SameSite=Lax"));

        assert_eq!(session.commit().await.unwrap(), None);
        session.set("a", "1").await;
        assert_eq!(session.commit().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_round_trip_through_cookie_header() {
        let session = CookieSession::new(secrets()).unwrap();
        session.set("customerAccessToken", "tok").await;
        let header = committed_cookie(&session).await;

        let restored = CookieSession::from_cookie_header(Some(&header), secrets()).unwrap();
        assert_eq!(
            restored.get("customerAccessToken").await.as_deref(),
            Some("tok")
        );
        assert_eq!(restored.commit().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rotated_secret_still_verifies() {
        let old = CookieSession::new(vec!["old".into()]).unwrap();
        old.set("cartId", "c1").await;
        let header = committed_cookie(&old).await;

        let rotated =
            CookieSession::from_cookie_header(Some(&header), vec!["new".into(), "old".into()])
                .unwrap();
        assert_eq!(rotated.get("cartId").await.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_forged_cookie_is_discarded() {
        let session = CookieSession::new(vec!["other".into()]).unwrap();
        session.set("cartId", "c1").await;
        let header = committed_cookie(&session).await;

        let restored = CookieSession::from_cookie_header(Some(&header), secrets()).unwrap();
        assert!(restored.values().is_empty());

        let garbage = CookieSession::from_cookie_header(Some("session=nope"), secrets()).unwrap();
        assert!(garbage.values().is_empty());
    }

    #[tokio::test]
    async fn test_clearing_session_expires_cookie() {
        let session = CookieSession::new(secrets()).unwrap();
        session.set("a", "1").await;
        session.commit().await.unwrap();
        session.unset("a").await;

        assert_eq!(
            session.commit().await.unwrap().as_deref(),
            Some("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
        );
    }

    #[test]
    fn test_find_cookie() {
        assert_eq!(find_cookie("a=1; session=x.y; b=2", "session"), Some("x.y"));
        assert_eq!(find_cookie("sessions=z", "session"), None);
        assert_eq!(find_cookie("", "session"), None);
    }
}
