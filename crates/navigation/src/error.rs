use thiserror::Error;

/// Failure reported by a session store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Session store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, SessionStoreError>;

pub type Result<T> = std::result::Result<T, NavigationError>;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error("Serialization error in session field {field}: {source}")]
    Serialization {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NavigationError {
    pub(crate) fn serialization(field: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            field: field.into(),
            source,
        }
    }
}
