use async_trait::async_trait;
use dialog_protocol::KeyboardLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::affordances::Affordances;
use crate::error::{TransportError, TransportResult};

/// Identifier the chat service assigned to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<KeyboardLayout>,
    pub affordances: Affordances,
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    #[must_use]
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            affordances: Affordances::NONE,
            reply_to: None,
        }
    }

    /// Layout to render. Navigation buttons without a layout of their own get
    /// a navigation-only keyboard.
    #[must_use]
    pub fn effective_keyboard(&self) -> Option<KeyboardLayout> {
        match self.keyboard {
            Some(layout) => Some(layout),
            None if !self.affordances.is_empty() => Some(KeyboardLayout::NavigationOnly),
            None => None,
        }
    }
}

/// Chat service binding. Implementations are thin I/O wrappers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, message: OutgoingMessage) -> TransportResult<MessageId>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        keyboard: Option<KeyboardLayout>,
    ) -> TransportResult<()>;

    async fn delete_message(&self, chat_id: i64, message_id: MessageId) -> TransportResult<()>;

    /// Acknowledge an inline button press, optionally with a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()>;
}

/// Transport that keeps everything in memory instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    state: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    next_id: i64,
    sent: Vec<(MessageId, OutgoingMessage)>,
    deleted: Vec<MessageId>,
    callbacks: Vec<(String, Option<String>)>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages still on the device, in delivery order.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        let state = self.lock();
        state
            .sent
            .iter()
            .filter(|(id, _)| !state.deleted.contains(id))
            .map(|(_, message)| message.clone())
            .collect()
    }

    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|message| message.text).collect()
    }

    /// Drain the record, returning what was sent since the last call.
    pub fn take(&self) -> Vec<OutgoingMessage> {
        let mut state = self.lock();
        let deleted = std::mem::take(&mut state.deleted);
        std::mem::take(&mut state.sent)
            .into_iter()
            .filter(|(id, _)| !deleted.contains(id))
            .map(|(_, message)| message)
            .collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<OutgoingMessage> {
        self.sent().pop()
    }

    #[must_use]
    pub fn callbacks(&self) -> Vec<(String, Option<String>)> {
        self.lock().callbacks.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, message: OutgoingMessage) -> TransportResult<MessageId> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = MessageId(state.next_id);
        state.sent.push((id, message));
        Ok(id)
    }

    async fn edit_message(
        &self,
        _chat_id: i64,
        message_id: MessageId,
        text: &str,
        keyboard: Option<KeyboardLayout>,
    ) -> TransportResult<()> {
        let mut state = self.lock();
        let (_, message) = state
            .sent
            .iter_mut()
            .find(|(id, _)| *id == message_id)
            .ok_or(TransportError::MessageNotFound(message_id))?;
        message.text = text.to_string();
        message.keyboard = keyboard;
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, message_id: MessageId) -> TransportResult<()> {
        let mut state = self.lock();
        let known = state.sent.iter().any(|(id, _)| *id == message_id);
        if !known || state.deleted.contains(&message_id) {
            return Err(TransportError::MessageNotFound(message_id));
        }
        state.deleted.push(message_id);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        self.lock()
            .callbacks
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn navigation_buttons_get_their_own_keyboard() {
        let mut message = OutgoingMessage::new(1, "hi");
        assert_eq!(message.effective_keyboard(), None);

        message.affordances.back = true;
        assert_eq!(
            message.effective_keyboard(),
            Some(KeyboardLayout::NavigationOnly)
        );

        message.keyboard = Some(KeyboardLayout::AdminMenu);
        assert_eq!(message.effective_keyboard(), Some(KeyboardLayout::AdminMenu));
    }

    #[tokio::test]
    async fn recording_transport_tracks_edits_and_deletes() {
        let transport = RecordingTransport::new();
        let first = transport
            .send_message(OutgoingMessage::new(1, "one"))
            .await
            .unwrap();
        let second = transport
            .send_message(OutgoingMessage::new(1, "two"))
            .await
            .unwrap();
        assert_ne!(first, second);

        transport
            .edit_message(1, first, "uno", Some(KeyboardLayout::RolePicker))
            .await
            .unwrap();
        transport.delete_message(1, second).await.unwrap();

        assert_eq!(transport.texts(), vec!["uno".to_string()]);
        assert_eq!(
            transport.delete_message(1, second).await,
            Err(TransportError::MessageNotFound(second))
        );
        assert_eq!(
            transport.edit_message(1, MessageId(99), "x", None).await,
            Err(TransportError::MessageNotFound(MessageId(99)))
        );

        transport.answer_callback("cb-1", Some("Done")).await.unwrap();
        assert_eq!(
            transport.callbacks(),
            vec![("cb-1".to_string(), Some("Done".to_string()))]
        );
    }
}
