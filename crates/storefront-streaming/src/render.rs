//! Markup renderer contract.

use bytes::Bytes;
use futures::stream::BoxStream;
use storefront_security::{Nonce, Scoped};

/// Errors raised by a markup renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("component failed: {0}")]
    Component(String),

    #[error("deferred section '{section}' failed: {reason}")]
    Deferred { section: String, reason: String },

    #[error("renderer finished without producing a shell")]
    Incomplete,
}

/// Lifecycle signals emitted by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// Minimal markup to begin painting has been produced.
    ShellReady,
    /// Rendering is complete, including deferred content.
    AllReady,
    /// Rendering failed before a shell could be produced.
    ShellError(RenderError),
    /// Rendering failed during or after streaming.
    StreamError(RenderError),
}

/// One item of renderer output, in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// A chunk of markup.
    Chunk(Bytes),
    /// A lifecycle signal.
    Signal(LifecycleSignal),
}

impl RenderEvent {
    /// Markup chunk from a string.
    pub fn markup(html: impl Into<String>) -> Self {
        Self::Chunk(Bytes::from(html.into()))
    }

    /// `ShellReady` signal.
    pub fn shell_ready() -> Self {
        Self::Signal(LifecycleSignal::ShellReady)
    }

    /// `AllReady` signal.
    pub fn all_ready() -> Self {
        Self::Signal(LifecycleSignal::AllReady)
    }

    /// `ShellError` signal.
    pub fn shell_error(error: RenderError) -> Self {
        Self::Signal(LifecycleSignal::ShellError(error))
    }

    /// `StreamError` signal.
    pub fn stream_error(error: RenderError) -> Self {
        Self::Signal(LifecycleSignal::StreamError(error))
    }
}

/// Options passed to the renderer for one render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Nonce for inline scripts and styles.
    pub nonce: Nonce,
}

/// Renderer output. Dropping the stream abandons rendering.
pub type RenderStream = BoxStream<'static, RenderEvent>;

/// A server-side markup renderer.
///
/// Implementations produce markup chunks interleaved with lifecycle
/// signals. Exactly one of `ShellReady`/`ShellError` should precede
/// `AllReady`; `StreamError` may appear at any point.
pub trait MarkupRenderer: Send + Sync + 'static {
    /// Component tree type accepted by this renderer.
    type Tree: Send + 'static;

    /// Start rendering a scoped tree.
    fn render(&self, tree: Scoped<Self::Tree>, options: RenderOptions) -> RenderStream;
}
