//! # Dialog Navigation
//!
//! Session-backed navigation for multi-step chat dialogs.
//!
//! ## Architecture
//!
//! ```text
//! SessionStore (external key/value bag per user)
//!     │
//!     ├──> NavigationStack
//!     │      ├─> history: [step, step, ..., current]
//!     │      ├─> cancel anchor: screen that launched the sub-flow
//!     │      └─> mode marker of the active dialog
//!     │
//!     ├──> ScenarioData (form values of the running sub-flow)
//!     │
//!     └──> ConfirmGuard (one-shot two-tap marker)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dialog_navigation::{MemorySessionStore, NavigationStack, SessionKey};
//! use dialog_protocol::{Command, KeyboardLayout};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = MemorySessionStore::new();
//! let nav = NavigationStack::new(&store, SessionKey::new(10, 42));
//!
//! nav.register_step(Command::Start, Some(KeyboardLayout::RolePicker), None).await?;
//! nav.register_step(Command::Help, None, None).await?;
//!
//! let back = nav.pop_previous_with_defaults(None, Some("Select an action")).await?;
//! assert_eq!(back.map(|step| step.command), Some(Command::Start));
//! # Ok::<(), dialog_navigation::NavigationError>(())
//! # }).unwrap();
//! # }
//! ```

mod confirm;
mod error;
mod locks;
mod memory;
mod scenario;
mod stack;
mod store;

pub use confirm::{ConfirmGuard, ConfirmOutcome, DEFAULT_CONFIRM_WINDOW};
pub use error::{NavigationError, Result, SessionStoreError, StoreResult};
pub use locks::SessionLocks;
pub use memory::MemorySessionStore;
pub use scenario::ScenarioData;
pub use stack::{NavigationStack, NavigationState};
pub use store::{SessionField, SessionKey, SessionMap, SessionStore};
