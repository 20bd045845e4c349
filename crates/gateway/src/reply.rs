use dialog_message_chunker::MessageChunker;
use dialog_navigation::{ConfirmGuard, NavigationStack, ScenarioData, SessionKey, SessionStore};
use dialog_protocol::{KeyboardLayout, Screen};
use std::sync::Arc;

use crate::affordances::Affordances;
use crate::config::{GatewayConfig, Lexicon};
use crate::error::{GatewayError, Result};
use crate::transport::{MessageId, OutgoingMessage, Transport};

/// Per-reply choices. Unset navigation flags are derived from the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    pub keyboard: Option<KeyboardLayout>,
    pub include_back: Option<bool>,
    pub include_cancel: Option<bool>,
    pub reply_to: Option<MessageId>,
}

impl ReplyOptions {
    #[must_use]
    pub const fn keyboard(mut self, keyboard: Option<KeyboardLayout>) -> Self {
        self.keyboard = keyboard;
        self
    }

    #[must_use]
    pub const fn back(mut self, include: bool) -> Self {
        self.include_back = Some(include);
        self
    }

    #[must_use]
    pub const fn cancel(mut self, include: bool) -> Self {
        self.include_cancel = Some(include);
        self
    }

    /// No navigation buttons whatever the session looks like.
    #[must_use]
    pub const fn bare(self) -> Self {
        self.back(false).cancel(false)
    }

    #[must_use]
    pub const fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// Sends replies on behalf of screen handlers.
///
/// Every reply is split to fit the message ceiling, and each part carries the
/// same keyboard plus the back/cancel buttons the navigation state calls for.
pub struct ReplyGateway {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    chunker: MessageChunker,
    config: GatewayConfig,
}

impl ReplyGateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        config: GatewayConfig,
    ) -> Result<Self> {
        config.validate().map_err(GatewayError::InvalidConfig)?;
        let chunker = MessageChunker::new(config.chunker_config())?;
        Ok(Self {
            store,
            transport,
            chunker,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.config.lexicon
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    #[must_use]
    pub fn navigation(&self, key: SessionKey) -> NavigationStack<'_> {
        NavigationStack::new(self.store.as_ref(), key)
    }

    #[must_use]
    pub fn scenario(&self, key: SessionKey) -> ScenarioData<'_> {
        ScenarioData::new(self.store.as_ref(), key)
    }

    #[must_use]
    pub fn confirm_guard(&self) -> ConfirmGuard {
        ConfirmGuard::new(self.config.confirm_window())
    }

    /// Navigation buttons for the next reply in this session.
    pub async fn affordances(
        &self,
        key: SessionKey,
        options: &ReplyOptions,
    ) -> Result<Affordances> {
        if let (Some(back), Some(cancel)) = (options.include_back, options.include_cancel) {
            return Ok(Affordances { back, cancel });
        }
        let state = self.navigation(key).navigation_state().await?;
        Ok(Affordances::resolve(
            &state,
            options.include_back,
            options.include_cancel,
        ))
    }

    /// Send formatted text, split with the markup-safe chunker.
    pub async fn answer(
        &self,
        key: SessionKey,
        text: &str,
        options: ReplyOptions,
    ) -> Result<Vec<MessageId>> {
        let parts = self.chunker.split_markup(text);
        self.send_parts(key, parts, options).await
    }

    /// Send unformatted text, split at blank lines, line breaks or spaces.
    pub async fn answer_plain(
        &self,
        key: SessionKey,
        text: &str,
        options: ReplyOptions,
    ) -> Result<Vec<MessageId>> {
        let parts = self.chunker.split_plain(text);
        self.send_parts(key, parts, options).await
    }

    pub async fn show(&self, key: SessionKey, screen: &Screen) -> Result<Vec<MessageId>> {
        self.answer(
            key,
            &screen.text,
            ReplyOptions::default().keyboard(screen.keyboard),
        )
        .await
    }

    async fn send_parts(
        &self,
        key: SessionKey,
        parts: Vec<String>,
        options: ReplyOptions,
    ) -> Result<Vec<MessageId>> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let affordances = self.affordances(key, &options).await?;
        let total = parts.len();
        let mut ids = Vec::with_capacity(total);
        for (idx, text) in parts.into_iter().enumerate() {
            log::debug!(
                "Session {key}: sending part {}/{total} ({} chars)",
                idx + 1,
                text.chars().count()
            );
            let message = OutgoingMessage {
                chat_id: key.chat_id,
                text,
                keyboard: options.keyboard,
                affordances,
                reply_to: options.reply_to,
            };
            ids.push(self.transport.send_message(message).await?);
        }
        Ok(ids)
    }
}
