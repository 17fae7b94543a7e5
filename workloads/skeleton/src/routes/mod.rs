//! Route loaders and views.

pub mod index;
pub mod product;
pub mod root;

mod error;

pub use error::*;
