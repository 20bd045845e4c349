use anyhow::{Context, Result};
use dialog_gateway::{Navigator, ReplyGateway, ReplyOptions, RoleDirectory};
use dialog_navigation::{ConfirmOutcome, NavigationStack, SessionKey, SessionLocks};
use dialog_protocol::{Command, KeyboardLayout, UserRole};

use crate::board::{Roles, Task, TaskBoard};

mod texts {
    pub const WELCOME: &str = "Welcome! Pick the role you want to work in.";
    pub const SUBMITTER_MENU: &str = "<b>Submitter menu</b>";
    pub const REVIEWER_MENU: &str = "<b>Reviewer menu</b>";
    pub const ADMIN_ONLY: &str = "The admin panel is for admins only.";
    pub const REVIEWERS_ONLY: &str = "Only reviewers can do that. Pick a role with /reviewer.";
    pub const NO_TASKS: &str = "No tasks on the board yet.";
    pub const NO_SUCH_TASK: &str = "There is no task with that number. Try again or /cancel.";
    pub const ASK_TASK_NUMBER: &str = "Send the number of the task you are answering.";
    pub const ASK_ANSWER: &str = "Send your answer.";
    pub const ASK_TITLE: &str = "Send the task title.";
    pub const ASK_DESCRIPTION: &str = "Send the task description.";
    pub const CONFIRM_HINT: &str = "Send /submit to publish the task or /cancel to drop it.";
    pub const NOTHING_TO_SUBMIT: &str = "There is nothing to submit.";
    pub const UNKNOWN_INPUT: &str = "I did not understand that. Send /help for the list of commands.";
    pub const HELP: &str = "<b>Commands</b>\n\
        /start - pick a role\n\
        /submitter, /reviewer - switch role\n\
        /tasks - task board\n\
        /answer - answer a task\n\
        /review_tasks - tasks with answer counts\n\
        /new_task - create a task\n\
        /clear_tasks - delete every task (tap twice)\n\
        /admin - admin panel\n\
        /back, /cancel - navigation";
}

const TASK_ID_FIELD: &str = "task_id";
const TITLE_FIELD: &str = "title";
const DESCRIPTION_FIELD: &str = "description";

/// Active-dialog marker kept in the session while a wizard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    AnswerTask,
    AnswerText,
    TaskTitle,
    TaskDescription,
    TaskConfirm,
}

impl Mode {
    const ALL: [Mode; 5] = [
        Mode::AnswerTask,
        Mode::AnswerText,
        Mode::TaskTitle,
        Mode::TaskDescription,
        Mode::TaskConfirm,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::AnswerTask => "answer:task",
            Mode::AnswerText => "answer:text",
            Mode::TaskTitle => "task_create:title",
            Mode::TaskDescription => "task_create:description",
            Mode::TaskConfirm => "task_create:confirm",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == raw)
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn task_card(task: &Task) -> String {
    format!(
        "<b>#{} {}</b>\n{}",
        task.id,
        escape_html(&task.title),
        escape_html(&task.description)
    )
}

/// Routes inbound lines to screen handlers, one event per session at a time.
pub struct Dispatcher {
    gateway: ReplyGateway,
    roles: Roles,
    board: TaskBoard,
    locks: SessionLocks,
}

impl Dispatcher {
    pub fn new(gateway: ReplyGateway, roles: Roles) -> Self {
        Self {
            gateway,
            roles,
            board: TaskBoard::new(),
            locks: SessionLocks::new(),
        }
    }

    pub fn gateway(&self) -> &ReplyGateway {
        &self.gateway
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    /// Handle one inbound line. Slash commands open screens; anything else is
    /// form input for the running wizard.
    pub async fn handle(&self, key: SessionKey, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let _lease = self.locks.acquire(key).await;
        log::debug!("Session {key}: event {input:?}");

        if input.starts_with('/') {
            match Command::parse(input) {
                Some(command) => self
                    .command(key, command)
                    .await
                    .with_context(|| format!("Failed to handle {command} for {key}")),
                None => self.say(key, texts::UNKNOWN_INPUT).await,
            }
        } else {
            self.form_input(key, input)
                .await
                .with_context(|| format!("Failed to handle input for {key}"))
        }
    }

    fn nav(&self, key: SessionKey) -> NavigationStack<'_> {
        self.gateway.navigation(key)
    }

    fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.gateway, &self.roles)
    }

    async fn say(&self, key: SessionKey, text: &str) -> Result<()> {
        self.gateway
            .answer(key, text, ReplyOptions::default())
            .await?;
        Ok(())
    }

    async fn command(&self, key: SessionKey, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                self.entry(key, command, KeyboardLayout::RolePicker, texts::WELCOME)
                    .await
            }
            Command::Role => {
                let text = self.gateway.lexicon().select_role.clone();
                self.entry(key, command, KeyboardLayout::RolePicker, &text)
                    .await
            }
            Command::SubmitterRole => {
                self.roles.set_role(key.user_id, UserRole::Submitter).await;
                self.entry(key, command, KeyboardLayout::SubmitterMenu, texts::SUBMITTER_MENU)
                    .await
            }
            Command::ReviewerRole => {
                self.roles.set_role(key.user_id, UserRole::Reviewer).await;
                self.entry(key, command, KeyboardLayout::ReviewerMenu, texts::REVIEWER_MENU)
                    .await
            }
            Command::AdminPanel => self.admin_panel(key).await,
            Command::Back => {
                self.navigator().go_back(key).await?;
                Ok(())
            }
            Command::Cancel => {
                self.navigator().cancel(key).await?;
                Ok(())
            }
            Command::Help => {
                self.nav(key).register_step(command, None, None).await?;
                self.say(key, texts::HELP).await
            }
            Command::SubmitterTasks | Command::ReviewerTasks => self.task_list(key, command).await,
            Command::SubmitterAnswer => self.start_answer(key).await,
            Command::ReviewerTaskCreate => self.start_task_create(key).await,
            Command::ReviewerTasksClear => self.clear_tasks(key).await,
            Command::Submit => self.submit(key).await,
            Command::ReviewerTaskDescription => self.say(key, texts::UNKNOWN_INPUT).await,
        }
    }

    /// Top-level screen: abandons whatever wizard was running.
    async fn entry(
        &self,
        key: SessionKey,
        command: Command,
        keyboard: KeyboardLayout,
        text: &str,
    ) -> Result<()> {
        let nav = self.nav(key);
        nav.clear_mode_keep_navigation().await?;
        nav.clear_cancel_anchor().await?;
        nav.register_step(command, Some(keyboard), Some(text.to_string()))
            .await?;
        self.gateway
            .answer(key, text, ReplyOptions::default().keyboard(Some(keyboard)))
            .await?;
        Ok(())
    }

    async fn can_review(&self, user_id: i64) -> Result<bool> {
        if self.roles.is_admin(user_id).await? {
            return Ok(true);
        }
        Ok(self.roles.role(user_id).await? == Some(UserRole::Reviewer))
    }

    async fn admin_panel(&self, key: SessionKey) -> Result<()> {
        if !self.roles.is_admin(key.user_id).await? {
            log::warn!("User {} tried to open the admin panel", key.user_id);
            return self.say(key, texts::ADMIN_ONLY).await;
        }
        let count = self.board.tasks().await.len();
        let text = format!("<b>Admin panel</b>\nTasks on the board: {count}");
        self.entry(key, Command::AdminPanel, KeyboardLayout::AdminMenu, &text)
            .await
    }

    async fn task_list(&self, key: SessionKey, command: Command) -> Result<()> {
        self.nav(key).register_step(command, None, None).await?;
        let tasks = self.board.tasks().await;
        if tasks.is_empty() {
            return self.say(key, texts::NO_TASKS).await;
        }

        let mut cards = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let mut card = task_card(task);
            if command == Command::ReviewerTasks {
                let answers = self.board.answers_for(task.id).await.len();
                card.push_str(&format!("\n<i>Answers: {answers}</i>"));
            }
            cards.push(card);
        }
        self.say(key, &cards.join("\n\n")).await
    }

    /// Enter a wizard launched from the current screen.
    ///
    /// A wizard started while another one runs replaces it: the old one is
    /// abandoned and the new one returns to the same anchor.
    async fn begin_wizard(
        &self,
        key: SessionKey,
        command: Command,
        mode: Mode,
        prompt: &str,
    ) -> Result<()> {
        let nav = self.nav(key);
        let mut anchor = None;
        if let Some(running) = nav.mode().await? {
            log::debug!("Session {key}: abandoning {running} for {command}");
            nav.clear_mode_keep_navigation().await?;
            anchor = nav.cancel_anchor().await?;
            if let Some(step) = &anchor {
                nav.rewind_history_to(step.command).await?;
            }
        }
        let anchor = match anchor {
            Some(step) => Some(step),
            None => nav.peek().await?,
        };
        nav.set_cancel_anchor(anchor).await?;
        nav.register_step(command, None, Some(prompt.to_string()))
            .await?;
        nav.set_mode(Some(mode.as_str())).await?;
        self.say(key, prompt).await
    }

    /// Leave a finished wizard and return to the screen that launched it.
    async fn finish_wizard(&self, key: SessionKey, text: &str) -> Result<()> {
        let nav = self.nav(key);
        nav.clear_mode_keep_navigation().await?;
        let anchor = nav.cancel_anchor().await?;
        if let Some(anchor) = &anchor {
            nav.rewind_history_to(anchor.command).await?;
            nav.clear_cancel_anchor().await?;
        }
        let keyboard = anchor.and_then(|step| step.keyboard);
        self.gateway
            .answer(key, text, ReplyOptions::default().keyboard(keyboard))
            .await?;
        Ok(())
    }

    async fn start_answer(&self, key: SessionKey) -> Result<()> {
        if self.board.tasks().await.is_empty() {
            return self.say(key, texts::NO_TASKS).await;
        }
        self.begin_wizard(
            key,
            Command::SubmitterAnswer,
            Mode::AnswerTask,
            texts::ASK_TASK_NUMBER,
        )
        .await
    }

    async fn start_task_create(&self, key: SessionKey) -> Result<()> {
        if !self.can_review(key.user_id).await? {
            return self.say(key, texts::REVIEWERS_ONLY).await;
        }
        self.begin_wizard(
            key,
            Command::ReviewerTaskCreate,
            Mode::TaskTitle,
            texts::ASK_TITLE,
        )
        .await
    }

    async fn form_input(&self, key: SessionKey, input: &str) -> Result<()> {
        let nav = self.nav(key);
        let scenario = self.gateway.scenario(key);
        let Some(mode) = nav.mode().await?.as_deref().and_then(Mode::parse) else {
            return self.say(key, texts::UNKNOWN_INPUT).await;
        };

        match mode {
            Mode::AnswerTask => {
                let task = match input.trim_start_matches('#').parse::<u32>() {
                    Ok(id) => self.board.task(id).await,
                    Err(_) => None,
                };
                let Some(task) = task else {
                    return self.say(key, texts::NO_SUCH_TASK).await;
                };
                scenario.set(TASK_ID_FIELD, &task.id).await?;
                nav.set_mode(Some(Mode::AnswerText.as_str())).await?;
                self.say(key, &format!("{}\n\n{}", task_card(&task), texts::ASK_ANSWER))
                    .await
            }
            Mode::AnswerText => {
                let task_id: Option<u32> = scenario.get(TASK_ID_FIELD).await?;
                let saved = match task_id {
                    Some(id) => self
                        .board
                        .submit_answer(id, key.user_id, input)
                        .await
                        .then_some(id),
                    None => None,
                };
                match saved {
                    Some(id) => {
                        self.finish_wizard(key, &format!("Answer to task #{id} saved."))
                            .await
                    }
                    None => self.say(key, texts::NO_SUCH_TASK).await,
                }
            }
            Mode::TaskTitle => {
                scenario.set(TITLE_FIELD, input).await?;
                nav.register_step(
                    Command::ReviewerTaskDescription,
                    None,
                    Some(texts::ASK_DESCRIPTION.to_string()),
                )
                .await?;
                nav.set_mode(Some(Mode::TaskDescription.as_str())).await?;
                self.say(key, texts::ASK_DESCRIPTION).await
            }
            Mode::TaskDescription => {
                scenario.set(DESCRIPTION_FIELD, input).await?;
                nav.set_mode(Some(Mode::TaskConfirm.as_str())).await?;
                let title: String = scenario.get(TITLE_FIELD).await?.unwrap_or_default();
                let preview = format!(
                    "<b>{}</b>\n{}\n\n{}",
                    escape_html(&title),
                    escape_html(input),
                    texts::CONFIRM_HINT
                );
                self.say(key, &preview).await
            }
            Mode::TaskConfirm => self.say(key, texts::CONFIRM_HINT).await,
        }
    }

    async fn submit(&self, key: SessionKey) -> Result<()> {
        let mode = self.nav(key).mode().await?;
        if mode.as_deref().and_then(Mode::parse) != Some(Mode::TaskConfirm) {
            return self.say(key, texts::NOTHING_TO_SUBMIT).await;
        }

        let scenario = self.gateway.scenario(key);
        let guard = self.gateway.confirm_guard();
        match guard.check_now(&scenario, "task_create").await? {
            ConfirmOutcome::Armed => {
                let window = self.gateway.config().confirm_window_secs;
                self.say(
                    key,
                    &format!("Send /submit once more within {window} s to publish."),
                )
                .await
            }
            ConfirmOutcome::Confirmed => {
                let title: String = scenario.get(TITLE_FIELD).await?.unwrap_or_default();
                let description: String =
                    scenario.get(DESCRIPTION_FIELD).await?.unwrap_or_default();
                let task = self.board.create_task(&title, &description).await;
                self.finish_wizard(key, &format!("Task #{} created.", task.id))
                    .await
            }
        }
    }

    async fn clear_tasks(&self, key: SessionKey) -> Result<()> {
        if !self.can_review(key.user_id).await? {
            return self.say(key, texts::REVIEWERS_ONLY).await;
        }
        let scenario = self.gateway.scenario(key);
        match self
            .gateway
            .confirm_guard()
            .check_now(&scenario, "clear_tasks")
            .await?
        {
            ConfirmOutcome::Armed => {
                let window = self.gateway.config().confirm_window_secs;
                self.say(
                    key,
                    &format!("Send /clear_tasks again within {window} s to delete every task."),
                )
                .await
            }
            ConfirmOutcome::Confirmed => {
                let removed = self.board.clear().await;
                self.say(key, &format!("Deleted {removed} tasks.")).await
            }
        }
    }
}
