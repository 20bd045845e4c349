use serde::{Deserialize, Serialize};

use crate::{Command, KeyboardLayout};

/// One screen in a user's navigation history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NavigationStep {
    pub command: Command,
    #[serde(default)]
    pub keyboard: Option<KeyboardLayout>,
    #[serde(default)]
    pub text: Option<String>,
}

impl NavigationStep {
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            keyboard: None,
            text: None,
        }
    }

    /// Builder: set keyboard
    #[must_use]
    pub const fn keyboard(mut self, keyboard: KeyboardLayout) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Builder: set canned text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Fill absent fields from the given defaults; present fields are kept.
    #[must_use]
    pub fn with_defaults(
        mut self,
        default_keyboard: Option<KeyboardLayout>,
        default_text: Option<&str>,
    ) -> Self {
        if self.keyboard.is_none() {
            self.keyboard = default_keyboard;
        }
        if self.text.is_none() {
            self.text = default_text.map(str::to_string);
        }
        self
    }
}

/// What a handler puts on the device: a message and an optional keyboard.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Option<KeyboardLayout>,
}

impl Screen {
    #[must_use]
    pub fn new(text: impl Into<String>, keyboard: Option<KeyboardLayout>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}
