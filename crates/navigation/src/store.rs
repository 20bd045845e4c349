use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{NavigationError, Result, StoreResult};

/// Identifies one user's session in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl SessionKey {
    #[must_use]
    pub const fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.user_id)
    }
}

/// Typed name of a value inside a session.
///
/// Navigation fields and the mode marker live in their own namespace, so a
/// scenario value can never shadow them whatever its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionField {
    History,
    CancelAnchor,
    Mode,
    Scenario(String),
}

impl SessionField {
    const HISTORY: &'static str = "nav:history";
    const CANCEL_ANCHOR: &'static str = "nav:cancel_anchor";
    const MODE: &'static str = "mode";
    const SCENARIO_PREFIX: &'static str = "data:";

    pub fn scenario(name: impl Into<String>) -> Self {
        Self::Scenario(name.into())
    }

    /// Key under which the value is stored by backends that want flat strings.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::History => Self::HISTORY.to_string(),
            Self::CancelAnchor => Self::CANCEL_ANCHOR.to_string(),
            Self::Mode => Self::MODE.to_string(),
            Self::Scenario(name) => format!("{}{name}", Self::SCENARIO_PREFIX),
        }
    }

    #[must_use]
    pub fn from_storage_key(raw: &str) -> Option<Self> {
        match raw {
            Self::HISTORY => Some(Self::History),
            Self::CANCEL_ANCHOR => Some(Self::CancelAnchor),
            Self::MODE => Some(Self::Mode),
            _ => raw
                .strip_prefix(Self::SCENARIO_PREFIX)
                .map(|name| Self::Scenario(name.to_string())),
        }
    }

    /// History and cancel anchor survive scenario resets.
    #[must_use]
    pub const fn is_navigation(&self) -> bool {
        matches!(self, Self::History | Self::CancelAnchor)
    }
}

impl fmt::Display for SessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Everything stored for one session.
pub type SessionMap = BTreeMap<SessionField, Vec<u8>>;

/// Per-session key/value persistence.
///
/// Last write wins; there are no transactions and no expiry semantics that
/// callers may rely on. Implementations may expire idle sessions on their own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey, field: &SessionField) -> StoreResult<Option<Vec<u8>>>;

    async fn set(&self, key: &SessionKey, field: &SessionField, value: Vec<u8>) -> StoreResult<()>;

    async fn delete(&self, key: &SessionKey, field: &SessionField) -> StoreResult<()>;

    async fn get_all(&self, key: &SessionKey) -> StoreResult<SessionMap>;

    /// Replace the whole session with `data`.
    async fn set_all(&self, key: &SessionKey, data: SessionMap) -> StoreResult<()>;

    async fn clear(&self, key: &SessionKey) -> StoreResult<()>;
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &SessionKey,
    field: &SessionField,
) -> Result<Option<T>> {
    let Some(bytes) = store.get(key, field).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| NavigationError::serialization(field.storage_key(), err))
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    store: &dyn SessionStore,
    key: &SessionKey,
    field: &SessionField,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|err| NavigationError::serialization(field.storage_key(), err))?;
    store.set(key, field, bytes).await?;
    Ok(())
}
