//! # Dialog Gateway
//!
//! Reply side of the dialog: every message a screen handler sends goes through
//! [`ReplyGateway`], which picks navigation buttons from the session's stack
//! and keeps each part under the chat service's message ceiling.
//!
//! ## Architecture
//!
//! ```text
//! Screen handler
//!     │ register_step(...)            answer(text, options)
//!     ▼                                   │
//! NavigationStack ◄─── affordances ───────┤
//!                                         ├─> MessageChunker (markup-safe split)
//!                                         └─> Transport::send_message (per part)
//!
//! Navigator
//!     ├─> go_back: pop previous step, re-render it
//!     └─> cancel:  drop scenario data, anchor > previous > role menu
//! ```

mod affordances;
mod config;
mod error;
mod navigator;
mod reply;
mod transport;

pub use affordances::Affordances;
pub use config::{GatewayConfig, Lexicon};
pub use error::{GatewayError, Result, TransportError, TransportResult};
pub use navigator::{fallback_screen, BackOutcome, CancelOutcome, Navigator, RoleDirectory};
pub use reply::{ReplyGateway, ReplyOptions};
pub use transport::{MessageId, OutgoingMessage, RecordingTransport, Transport};
