use dialog_protocol::{Command, KeyboardLayout, NavigationStep};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{read_json, write_json, SessionField, SessionKey, SessionStore};

/// Navigation data of one session: the screen stack and the cancel anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Oldest first; the last element is the screen currently on the device.
    pub history: Vec<NavigationStep>,
    /// Where an abandoned sub-flow returns to.
    pub cancel_anchor: Option<NavigationStep>,
}

impl NavigationState {
    /// The screen "back" would return to.
    #[must_use]
    pub fn previous(&self) -> Option<&NavigationStep> {
        self.history.len().checked_sub(2).map(|idx| &self.history[idx])
    }
}

/// Navigation stack of one session.
///
/// Every operation is a read-modify-write against the session store with no
/// locking of its own: two events of the same user processed concurrently can
/// overwrite each other's update. Serialize events per session with
/// [`crate::SessionLocks`] when that matters.
#[derive(Clone, Copy)]
pub struct NavigationStack<'a> {
    store: &'a dyn SessionStore,
    key: SessionKey,
}

impl<'a> NavigationStack<'a> {
    #[must_use]
    pub fn new(store: &'a dyn SessionStore, key: SessionKey) -> Self {
        Self { store, key }
    }

    #[must_use]
    pub const fn key(&self) -> SessionKey {
        self.key
    }

    pub async fn history(&self) -> Result<Vec<NavigationStep>> {
        Ok(read_json(self.store, &self.key, &SessionField::History)
            .await?
            .unwrap_or_default())
    }

    async fn write_history(&self, history: &[NavigationStep]) -> Result<()> {
        write_json(self.store, &self.key, &SessionField::History, history).await
    }

    /// Start a new top-level flow: forget the whole history.
    pub async fn register_entry_point(&self) -> Result<()> {
        log::debug!("Session {}: navigation history reset", self.key);
        self.write_history(&[]).await
    }

    /// Record the screen about to be shown. Entry points reset history first.
    pub async fn register_step(
        &self,
        command: Command,
        keyboard: Option<KeyboardLayout>,
        text: Option<String>,
    ) -> Result<()> {
        if command.is_entry_point() {
            self.register_entry_point().await?;
        }
        self.push(NavigationStep {
            command,
            keyboard,
            text,
        })
        .await
    }

    /// Append a step without entry-point handling.
    pub async fn push(&self, step: NavigationStep) -> Result<()> {
        let mut history = self.history().await?;
        log::debug!("Session {}: push {}", self.key, step.command);
        history.push(step);
        self.write_history(&history).await
    }

    /// Screen currently on the device.
    pub async fn peek(&self) -> Result<Option<NavigationStep>> {
        Ok(self.history().await?.pop())
    }

    /// Leave the current screen and return the one before it.
    ///
    /// With fewer than two steps there is nowhere to go and history is left
    /// untouched. Otherwise only the current step is dropped; the previous one
    /// stays on the stack so that re-entering a sub-flow still has a way back.
    /// Absent keyboard/text fields of the result are filled from the defaults.
    pub async fn pop_previous_with_defaults(
        &self,
        default_keyboard: Option<KeyboardLayout>,
        default_text: Option<&str>,
    ) -> Result<Option<NavigationStep>> {
        let mut history = self.history().await?;
        if history.len() < 2 {
            return Ok(None);
        }

        if let Some(left) = history.pop() {
            log::debug!("Session {}: leaving {}", self.key, left.command);
        }
        self.write_history(&history).await?;

        Ok(history
            .last()
            .cloned()
            .map(|step| step.with_defaults(default_keyboard, default_text)))
    }

    pub async fn cancel_anchor(&self) -> Result<Option<NavigationStep>> {
        read_json(self.store, &self.key, &SessionField::CancelAnchor).await
    }

    /// Set the screen an abandoned sub-flow returns to; `None` clears it.
    pub async fn set_cancel_anchor(&self, step: Option<NavigationStep>) -> Result<()> {
        match step {
            Some(step) => {
                log::debug!("Session {}: cancel anchor -> {}", self.key, step.command);
                write_json(self.store, &self.key, &SessionField::CancelAnchor, &step).await
            }
            None => self.clear_cancel_anchor().await,
        }
    }

    pub async fn clear_cancel_anchor(&self) -> Result<()> {
        self.store
            .delete(&self.key, &SessionField::CancelAnchor)
            .await?;
        Ok(())
    }

    /// Truncate history right after the last occurrence of `command`.
    ///
    /// Returns `false` and leaves history alone when `command` is not on it.
    pub async fn rewind_history_to(&self, command: Command) -> Result<bool> {
        let mut history = self.history().await?;
        let Some(last_idx) = history.iter().rposition(|step| step.command == command) else {
            return Ok(false);
        };
        history.truncate(last_idx + 1);
        log::debug!("Session {}: rewound to {command}", self.key);
        self.write_history(&history).await?;
        Ok(true)
    }

    pub async fn navigation_state(&self) -> Result<NavigationState> {
        Ok(NavigationState {
            history: self.history().await?,
            cancel_anchor: self.cancel_anchor().await?,
        })
    }

    /// Wipe the session except navigation history and cancel anchor.
    ///
    /// The session is replaced in one write, so a failing store leaves it untouched.
    pub async fn clear_scenario_keep_history(&self) -> Result<()> {
        let mut data = self.store.get_all(&self.key).await?;
        data.retain(|field, _| field.is_navigation());
        let kept = data.len();
        self.store.set_all(&self.key, data).await?;
        log::debug!("Session {}: scenario cleared, kept {kept} fields", self.key);
        Ok(())
    }

    /// Drop the mode marker and every scenario value, keeping navigation fields.
    pub async fn clear_mode_keep_navigation(&self) -> Result<()> {
        let mut data = self.store.get_all(&self.key).await?;
        data.retain(|field, _| field.is_navigation());
        self.store.set_all(&self.key, data).await?;
        log::debug!("Session {}: mode cleared", self.key);
        Ok(())
    }

    /// Active-dialog mode marker.
    pub async fn mode(&self) -> Result<Option<String>> {
        read_json(self.store, &self.key, &SessionField::Mode).await
    }

    pub async fn set_mode(&self, mode: Option<&str>) -> Result<()> {
        match mode {
            Some(mode) => write_json(self.store, &self.key, &SessionField::Mode, mode).await,
            None => {
                self.store.delete(&self.key, &SessionField::Mode).await?;
                Ok(())
            }
        }
    }
}
