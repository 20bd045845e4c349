use serde::{Deserialize, Serialize};

pub mod step;

pub use step::{NavigationStep, Screen};

/// Screen identifiers understood by the dialog.
///
/// A command names the screen a handler renders; navigation history records
/// commands so that "back" and "cancel" can find their way home again.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Role,
    SubmitterRole,
    ReviewerRole,
    AdminPanel,
    Back,
    Cancel,
    Help,
    SubmitterTasks,
    SubmitterAnswer,
    ReviewerTasks,
    ReviewerTaskCreate,
    ReviewerTaskDescription,
    ReviewerTasksClear,
    Submit,
}

const ENTRY_POINTS: [Command; 5] = [
    Command::Start,
    Command::Role,
    Command::SubmitterRole,
    Command::ReviewerRole,
    Command::AdminPanel,
];

impl Command {
    pub const ALL: [Command; 15] = [
        Command::Start,
        Command::Role,
        Command::SubmitterRole,
        Command::ReviewerRole,
        Command::AdminPanel,
        Command::Back,
        Command::Cancel,
        Command::Help,
        Command::SubmitterTasks,
        Command::SubmitterAnswer,
        Command::ReviewerTasks,
        Command::ReviewerTaskCreate,
        Command::ReviewerTaskDescription,
        Command::ReviewerTasksClear,
        Command::Submit,
    ];

    /// Entry points start a new top-level flow and reset navigation history.
    #[must_use]
    pub fn is_entry_point(self) -> bool {
        ENTRY_POINTS.contains(&self)
    }

    /// Name used on the wire, without the leading slash.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Role => "role",
            Command::SubmitterRole => "submitter",
            Command::ReviewerRole => "reviewer",
            Command::AdminPanel => "admin",
            Command::Back => "back",
            Command::Cancel => "cancel",
            Command::Help => "help",
            Command::SubmitterTasks => "tasks",
            Command::SubmitterAnswer => "answer",
            Command::ReviewerTasks => "review_tasks",
            Command::ReviewerTaskCreate => "new_task",
            Command::ReviewerTaskDescription => "task_description",
            Command::ReviewerTasksClear => "clear_tasks",
            Command::Submit => "submit",
        }
    }

    /// Parse `/start`, `start` or `/start@botname` style input.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let raw = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let raw = raw.split('@').next().unwrap_or(raw);
        let lowered = raw.to_ascii_lowercase();
        Self::ALL.into_iter().find(|cmd| cmd.name() == lowered)
    }

    #[must_use]
    pub fn slash(self) -> String {
        format!("/{}", self.name())
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a reply keyboard layout. The transport owns the button catalog.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardLayout {
    RolePicker,
    SubmitterMenu,
    ReviewerMenu,
    AdminMenu,
    NavigationOnly,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Submitter,
    Reviewer,
}

impl UserRole {
    #[must_use]
    pub const fn menu(self) -> KeyboardLayout {
        match self {
            UserRole::Submitter => KeyboardLayout::SubmitterMenu,
            UserRole::Reviewer => KeyboardLayout::ReviewerMenu,
        }
    }
}
