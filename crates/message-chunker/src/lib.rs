//! # Dialog Message Chunker
//!
//! Splits long chat replies into pieces that respect the transport's hard
//! per-message ceiling.
//!
//! ## Architecture
//!
//! ```text
//! Reply text
//!     │
//!     ├──> Plain text ──> split_plain
//!     │      └─> cut at blank line, line break, space, or hard at the limit
//!     │
//!     └──> Formatted text ──> MessageChunker::split_markup
//!            ├─> Tokenize (tag | entity | char)
//!            ├─> Track open tags, reserve room for closing them
//!            ├─> Cut at the nearest whitespace or closing inline tag
//!            ├─> Close open tags, reopen them in the next chunk
//!            └─> Fall back to split_plain when no safe cut exists
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dialog_message_chunker::{ChunkerConfig, MessageChunker};
//!
//! let chunker = MessageChunker::new(ChunkerConfig::with_limit(16)).unwrap();
//! let parts = chunker.split_markup("<b>one two three</b>");
//! assert_eq!(parts, vec!["<b>one two </b>", "<b>three</b>"]);
//! ```

mod chunker;
mod config;
mod error;
mod markup;
mod splitter;

pub use chunker::MessageChunker;
pub use config::{ChunkerConfig, DEFAULT_BOUNDARY_TAGS, DEFAULT_MESSAGE_LIMIT};
pub use error::{ChunkerError, Result};
pub use splitter::split_plain;
