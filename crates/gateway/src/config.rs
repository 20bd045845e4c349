use dialog_message_chunker::{ChunkerConfig, DEFAULT_BOUNDARY_TAGS, DEFAULT_MESSAGE_LIMIT};
use dialog_navigation::DEFAULT_CONFIRM_WINDOW;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canned texts of the navigation affordances and fallback screens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Lexicon {
    /// Sent before the previous screen is shown again
    pub back_ok: String,
    pub back_not_possible: String,
    pub cancelled: String,
    pub select_action: String,
    pub select_role: String,
    pub back_button: String,
    pub cancel_button: String,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            back_ok: "Back".to_string(),
            back_not_possible: "Cannot go back".to_string(),
            cancelled: "Cancelled".to_string(),
            select_action: "Select an action".to_string(),
            select_role: "Select a role".to_string(),
            back_button: "⬅️ Back".to_string(),
            cancel_button: "✖️ Cancel".to_string(),
        }
    }
}

/// Reply gateway settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Hard ceiling of one outgoing message, in characters
    pub message_limit: usize,

    /// Window between the two taps of a destructive action
    pub confirm_window_secs: u64,

    /// Tag names whose closing tag is a preferred cut point
    pub boundary_tags: Vec<String>,

    pub lexicon: Lexicon,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            message_limit: DEFAULT_MESSAGE_LIMIT,
            confirm_window_secs: DEFAULT_CONFIRM_WINDOW.as_secs(),
            boundary_tags: DEFAULT_BOUNDARY_TAGS
                .iter()
                .map(|tag| (*tag).to_string())
                .collect(),
            lexicon: Lexicon::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.confirm_window_secs == 0 {
            return Err("confirm_window_secs must be > 0".to_string());
        }
        self.chunker_config().validate()
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_chars: self.message_limit,
            boundary_tags: self.boundary_tags.clone(),
        }
    }

    #[must_use]
    pub const fn confirm_window(&self) -> Duration {
        Duration::from_secs(self.confirm_window_secs)
    }
}
