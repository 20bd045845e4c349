use async_trait::async_trait;
use dialog_gateway::{
    Lexicon, MessageId, OutgoingMessage, Transport, TransportError, TransportResult,
};
use dialog_protocol::{Command, KeyboardLayout};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Buttons of each reply keyboard, in display order.
pub fn layout_buttons(layout: KeyboardLayout) -> &'static [Command] {
    match layout {
        KeyboardLayout::RolePicker => &[Command::SubmitterRole, Command::ReviewerRole],
        KeyboardLayout::SubmitterMenu => &[
            Command::SubmitterTasks,
            Command::SubmitterAnswer,
            Command::Help,
            Command::Role,
        ],
        KeyboardLayout::ReviewerMenu => &[
            Command::ReviewerTasks,
            Command::ReviewerTaskCreate,
            Command::ReviewerTasksClear,
            Command::Help,
            Command::Role,
        ],
        KeyboardLayout::AdminMenu => &[
            Command::ReviewerTasks,
            Command::ReviewerTasksClear,
            Command::Role,
        ],
        KeyboardLayout::NavigationOnly => &[],
    }
}

/// Button labels as shown under a message.
pub fn button_labels(message: &OutgoingMessage, lexicon: &Lexicon) -> Vec<String> {
    let mut labels: Vec<String> = message
        .effective_keyboard()
        .map(layout_buttons)
        .unwrap_or_default()
        .iter()
        .map(|cmd| cmd.slash())
        .collect();
    if message.affordances.back {
        labels.push(format!("{} {}", lexicon.back_button, Command::Back.slash()));
    }
    if message.affordances.cancel {
        labels.push(format!("{} {}", lexicon.cancel_button, Command::Cancel.slash()));
    }
    labels
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'static str,
    message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buttons: Vec<String>,
}

/// Prints outgoing messages instead of delivering them.
///
/// Human mode prints the text followed by one line of buttons; JSON mode
/// prints one object per event for scripting.
pub struct ConsoleTransport<W> {
    state: Mutex<ConsoleState<W>>,
    lexicon: Lexicon,
    json: bool,
}

struct ConsoleState<W> {
    out: W,
    next_id: i64,
    live: Vec<MessageId>,
}

impl ConsoleTransport<io::Stdout> {
    pub fn stdout(lexicon: Lexicon, json: bool) -> Self {
        Self::new(io::stdout(), lexicon, json)
    }
}

impl<W: Write> ConsoleTransport<W> {
    pub fn new(out: W, lexicon: Lexicon, json: bool) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out,
                next_id: 0,
                live: Vec::new(),
            }),
            lexicon,
            json,
        }
    }

    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }

    fn emit(
        &self,
        state: &mut ConsoleState<W>,
        event: &'static str,
        message_id: MessageId,
        text: Option<&str>,
        buttons: Vec<String>,
    ) -> TransportResult<()> {
        let rendered = if self.json {
            let payload = JsonEvent {
                event,
                message_id,
                text,
                buttons,
            };
            serde_json::to_string(&payload).map_err(|err| TransportError::Io(err.to_string()))?
        } else {
            render_human(event, message_id, text, &buttons)
        };
        writeln!(state.out, "{rendered}")
            .and_then(|()| state.out.flush())
            .map_err(|err| TransportError::Io(err.to_string()))
    }
}

fn render_human(
    event: &str,
    message_id: MessageId,
    text: Option<&str>,
    buttons: &[String],
) -> String {
    let mut out = match (event, text) {
        ("send", Some(text)) => format!("[#{message_id}] {text}"),
        (_, Some(text)) => format!("[#{message_id} {event}] {text}"),
        (_, None) => format!("[#{message_id} {event}]"),
    };
    if !buttons.is_empty() {
        let row: Vec<String> = buttons.iter().map(|label| format!("[ {label} ]")).collect();
        out.push_str("\n    ");
        out.push_str(&row.join(" "));
    }
    out
}

fn lock<W>(state: &Mutex<ConsoleState<W>>) -> std::sync::MutexGuard<'_, ConsoleState<W>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl<W: Write + Send> Transport for ConsoleTransport<W> {
    async fn send_message(&self, message: OutgoingMessage) -> TransportResult<MessageId> {
        let buttons = button_labels(&message, &self.lexicon);
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = MessageId(state.next_id);
        state.live.push(id);
        self.emit(&mut state, "send", id, Some(&message.text), buttons)?;
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        keyboard: Option<KeyboardLayout>,
    ) -> TransportResult<()> {
        let mut state = lock(&self.state);
        if !state.live.contains(&message_id) {
            return Err(TransportError::MessageNotFound(message_id));
        }
        let mut edited = OutgoingMessage::new(chat_id, text);
        edited.keyboard = keyboard;
        let buttons = button_labels(&edited, &self.lexicon);
        self.emit(&mut state, "edit", message_id, Some(text), buttons)
    }

    async fn delete_message(&self, _chat_id: i64, message_id: MessageId) -> TransportResult<()> {
        let mut state = lock(&self.state);
        let Some(pos) = state.live.iter().position(|id| *id == message_id) else {
            return Err(TransportError::MessageNotFound(message_id));
        };
        state.live.remove(pos);
        self.emit(&mut state, "delete", message_id, None, Vec::new())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        log::debug!("Callback {callback_id} answered");
        let mut state = lock(&self.state);
        let Some(text) = text else {
            return Ok(());
        };
        self.emit(&mut state, "toast", MessageId(0), Some(text), Vec::new())
    }
}
