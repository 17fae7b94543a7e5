//! HTML document renderer.
//!
//! A `Document` is the component tree for one page: head content, a
//! fallible body view, deferred sections that stream in after the shell,
//! and optional hydration data. `DocumentRenderer` turns it into a
//! `RenderStream`:
//!
//! 1. Opening markup with section fallbacks, then `ShellReady`
//!    (or `ShellError` if the view fails).
//! 2. Each deferred section as it completes, swapped into place by an
//!    inline script. A failed section emits `StreamError` and keeps its
//!    fallback.
//! 3. Hydration data, scroll restoration, closing tags, then `AllReady`.

use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{self, FuturesUnordered};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use storefront_security::{NonceScope, Scoped};

use crate::render::{MarkupRenderer, RenderError, RenderEvent, RenderOptions, RenderStream};
use crate::shell::{escape_html, HeadContent, SCROLL_RESTORATION, SWAP_FUNCTION};

/// Global that receives hydration data on the client.
pub const HYDRATION_GLOBAL: &str = "__storefrontContext";

/// A fallible body view.
pub type View = Box<dyn FnOnce(&NonceScope) -> Result<String, RenderError> + Send>;

/// A named part of the page rendered after the shell.
pub struct DeferredSection {
    /// Section identifier, unique within the document.
    pub id: String,
    /// Markup shown until the content arrives.
    pub fallback: String,
    content: BoxFuture<'static, Result<String, RenderError>>,
}

impl DeferredSection {
    /// Create a deferred section.
    pub fn new<F>(id: impl Into<String>, fallback: impl Into<String>, content: F) -> Self
    where
        F: Future<Output = Result<String, RenderError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            fallback: fallback.into(),
            content: content.boxed(),
        }
    }

    /// DOM id of the placeholder element.
    pub fn dom_id(&self) -> String {
        format!("deferred-{}", self.id)
    }

    /// Placeholder markup to embed in the body view.
    pub fn placeholder(&self) -> String {
        format!(r#"<div id="{}">{}</div>"#, escape_html(&self.dom_id()), self.fallback)
    }

    async fn resolve(self, scope: NonceScope) -> Vec<RenderEvent> {
        let dom_id = escape_html(&self.dom_id());
        match self.content.await {
            Ok(html) => vec![RenderEvent::markup(format!(
                r#"<template id="{}-content">{}</template>{}"#,
                dom_id,
                html,
                scope.script(&format!("$sfSwap(\"{}\")", dom_id))
            ))],
            Err(error) => vec![RenderEvent::stream_error(RenderError::Deferred {
                section: self.id,
                reason: error.to_string(),
            })],
        }
    }
}

impl std::fmt::Debug for DeferredSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSection")
            .field("id", &self.id)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

/// Component tree for one HTML page.
pub struct Document {
    pub head: HeadContent,
    pub lang: String,
    body: View,
    deferred: Vec<DeferredSection>,
    hydration: Option<serde_json::Value>,
    scroll_restoration: bool,
}

impl Document {
    /// Create a document with an empty body.
    pub fn new(head: HeadContent) -> Self {
        Self {
            head,
            lang: "en".to_string(),
            body: Box::new(empty_view),
            deferred: Vec::new(),
            hydration: None,
            scroll_restoration: false,
        }
    }

    /// Set the `lang` attribute.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Set the body view.
    pub fn with_body<F>(mut self, view: F) -> Self
    where
        F: FnOnce(&NonceScope) -> Result<String, RenderError> + Send + 'static,
    {
        self.body = Box::new(view);
        self
    }

    /// Add a deferred section. Its placeholder must appear in the body.
    pub fn with_deferred(mut self, section: DeferredSection) -> Self {
        self.deferred.push(section);
        self
    }

    /// Embed data for client hydration.
    pub fn with_hydration<T: Serialize>(mut self, data: &T) -> Self {
        self.hydration = serde_json::to_value(data).ok();
        self
    }

    /// Restore scroll position on navigation.
    pub fn with_scroll_restoration(mut self) -> Self {
        self.scroll_restoration = true;
        self
    }

    fn render_opening(&self, scope: &NonceScope, body: &str) -> String {
        let mut html = String::from("<!DOCTYPE html>\n");
        html.push_str(&format!(r#"<html lang="{}">"#, escape_html(&self.lang)));
        html.push_str("\n<head>\n");
        html.push_str(&self.head.render(scope));
        if !self.deferred.is_empty() {
            html.push_str(&scope.script(SWAP_FUNCTION));
            html.push('\n');
        }
        html.push_str("</head>\n<body>\n");
        html.push_str(body);
        html
    }

    fn render_closing(&self, scope: &NonceScope) -> String {
        let mut html = String::new();
        if let Some(data) = &self.hydration {
            html.push_str(&scope.script(&format!(
                "window.{}={};",
                HYDRATION_GLOBAL,
                escape_json(data)
            )));
            html.push('\n');
        }
        if self.scroll_restoration {
            html.push_str(&scope.script(SCROLL_RESTORATION));
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("head", &self.head)
            .field("lang", &self.lang)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

fn empty_view(_scope: &NonceScope) -> Result<String, RenderError> {
    Ok(String::new())
}

/// Serialize JSON for an inline script. `<` is escaped so data cannot
/// close the script element.
fn escape_json(value: &serde_json::Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

/// Renders `Document` trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRenderer;

impl MarkupRenderer for DocumentRenderer {
    type Tree = Document;

    fn render(&self, tree: Scoped<Document>, _options: RenderOptions) -> RenderStream {
        let (scope, mut document) = tree.into_parts();

        let view = std::mem::replace(&mut document.body, Box::new(empty_view));
        let body = match view(&scope) {
            Ok(body) => body,
            Err(error) => return stream::iter(vec![RenderEvent::shell_error(error)]).boxed(),
        };

        let opening = document.render_opening(&scope, &body);
        let closing = document.render_closing(&scope);

        let shell = stream::iter(vec![RenderEvent::markup(opening), RenderEvent::shell_ready()]);
        let sections = std::mem::take(&mut document.deferred)
            .into_iter()
            .map(|section| section.resolve(scope.clone()))
            .collect::<FuturesUnordered<_>>()
            .flat_map(stream::iter);
        let tail = stream::iter(vec![RenderEvent::markup(closing), RenderEvent::all_ready()]);

        shell.chain(sections).chain(tail).boxed()
    }
}
