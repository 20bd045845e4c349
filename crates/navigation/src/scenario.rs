use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::store::{read_json, write_json, SessionField, SessionKey, SessionStore};

/// Typed access to the in-progress form data of one session.
///
/// Values live under [`SessionField::Scenario`] and are discarded by both
/// scenario resets of [`crate::NavigationStack`].
#[derive(Clone, Copy)]
pub struct ScenarioData<'a> {
    store: &'a dyn SessionStore,
    key: SessionKey,
}

impl<'a> ScenarioData<'a> {
    #[must_use]
    pub fn new(store: &'a dyn SessionStore, key: SessionKey) -> Self {
        Self { store, key }
    }

    pub async fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        read_json(self.store, &self.key, &SessionField::scenario(name)).await
    }

    pub async fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        write_json(self.store, &self.key, &SessionField::scenario(name), value).await
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        self.store
            .delete(&self.key, &SessionField::scenario(name))
            .await?;
        Ok(())
    }
}
