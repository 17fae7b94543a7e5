//! Streaming response assembly for server-rendered pages.
//!
//! This crate provides:
//! - `MarkupRenderer` - Renderer contract: markup chunks plus lifecycle signals
//! - `ResponseAssembler` - Gates, secures and streams one response
//! - `ResponseBody` - Streaming body handed to the HTTP transport
//! - `Document` / `DocumentRenderer` - HTML page tree and its renderer
//! - `HeadContent` - Document head builder
//!
//! Crawlers receive a fully rendered document; everyone else gets the
//! shell as soon as it is ready, with the rest streamed after it.

mod assembler;
mod body;
mod document;
mod pending;
mod render;
mod shell;

pub use assembler::*;
pub use body::{BodyClosed, ResponseBody, DEFAULT_BODY_CAPACITY};
pub use document::*;
pub use render::*;
pub use shell::{escape_html, HeadContent};
