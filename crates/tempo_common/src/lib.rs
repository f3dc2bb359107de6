//! Shared foundational types for the Tempo cycle simulator.
//!
//! This crate provides interned names for blocks, methods, and variable paths,
//! content hashing used for schedule fingerprints and type layouts, and the
//! internal error type.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::{ContentHash, ContentHasher};
pub use ident::{Ident, Interner};
pub use result::{InternalError, TempoResult};
