use serde::{Deserialize, Serialize};

/// Hard ceiling of a single chat message, in characters.
pub const DEFAULT_MESSAGE_LIMIT: usize = 4096;

/// Inline and block elements of the chat markup dialect. A closing tag of one of
/// these is a preferred place to cut a long reply.
pub const DEFAULT_BOUNDARY_TAGS: [&str; 14] = [
    "b",
    "strong",
    "i",
    "em",
    "u",
    "ins",
    "s",
    "strike",
    "del",
    "span",
    "tg-spoiler",
    "code",
    "pre",
    "a",
];

/// Configuration for message chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters, synthetic open/close tags included
    pub max_chunk_chars: usize,

    /// Tag names whose closing tag counts as a preferred boundary
    pub boundary_tags: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MESSAGE_LIMIT,
            boundary_tags: DEFAULT_BOUNDARY_TAGS
                .iter()
                .map(|tag| (*tag).to_string())
                .collect(),
        }
    }
}

impl ChunkerConfig {
    /// Default dialect with a custom size ceiling
    #[must_use]
    pub fn with_limit(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be > 0".to_string());
        }

        if let Some(bad) = self
            .boundary_tags
            .iter()
            .find(|tag| tag.is_empty() || tag.chars().any(char::is_whitespace))
        {
            return Err(format!("boundary tag {bad:?} is not a valid tag name"));
        }

        Ok(())
    }

    pub(crate) fn is_boundary_tag(&self, name: &str) -> bool {
        self.boundary_tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(name))
    }
}
