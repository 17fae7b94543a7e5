//! Nonce scoping for rendered markup.

use crate::nonce::Nonce;

/// Renders the request's own inline `<script>` and `<style>` elements with its nonce.
///
/// Only markup built through the scope is authorized. HTML taken from
/// elsewhere, such as catalog descriptions, is emitted as-is and stays
/// blocked by the policy.
#[derive(Debug, Clone)]
pub struct NonceScope {
    nonce: Nonce,
}

impl NonceScope {
    /// Create a scope for a nonce.
    pub fn new(nonce: Nonce) -> Self {
        Self { nonce }
    }

    /// Get the nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Attribute fragment: ` nonce="<value>"`.
    pub fn attr(&self) -> String {
        format!(r#" nonce="{}""#, self.nonce)
    }

    /// Render an inline script carrying the nonce.
    pub fn script(&self, body: &str) -> String {
        format!("<script{}>{}</script>", self.attr(), body)
    }

    /// Render an inline style block carrying the nonce.
    pub fn style(&self, css: &str) -> String {
        format!("<style{}>{}</style>", self.attr(), css)
    }

    /// Wrap a component tree so its renderer sees this scope.
    pub fn wrap<T>(&self, tree: T) -> Scoped<T> {
        Scoped {
            scope: self.clone(),
            tree,
        }
    }
}

/// A component tree annotated with the request's nonce scope.
#[derive(Debug, Clone)]
pub struct Scoped<T> {
    /// The nonce scope.
    pub scope: NonceScope,
    /// The wrapped tree.
    pub tree: T,
}

impl<T> Scoped<T> {
    /// Split into scope and tree.
    pub fn into_parts(self) -> (NonceScope, T) {
        (self.scope, self.tree)
    }
}
