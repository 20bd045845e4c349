//! In-memory task board and role directory backing the console screens.

use async_trait::async_trait;
use dialog_gateway::RoleDirectory;
use dialog_protocol::UserRole;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub task_id: u32,
    pub user_id: i64,
    pub text: String,
}

#[derive(Debug, Default)]
struct BoardState {
    next_id: u32,
    tasks: Vec<Task>,
    answers: Vec<Answer>,
}

#[derive(Debug, Default)]
pub struct TaskBoard {
    state: RwLock<BoardState>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_task(&self, title: &str, description: &str) -> Task {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let task = Task {
            id: state.next_id,
            title: title.to_string(),
            description: description.to_string(),
        };
        state.tasks.push(task.clone());
        log::info!("Task #{} created", task.id);
        task
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn task(&self, id: u32) -> Option<Task> {
        self.state
            .read()
            .await
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    /// Record an answer. Returns `false` when the task does not exist.
    pub async fn submit_answer(&self, task_id: u32, user_id: i64, text: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.tasks.iter().any(|task| task.id == task_id) {
            return false;
        }
        state.answers.push(Answer {
            task_id,
            user_id,
            text: text.to_string(),
        });
        true
    }

    pub async fn answers_for(&self, task_id: u32) -> Vec<Answer> {
        self.state
            .read()
            .await
            .answers
            .iter()
            .filter(|answer| answer.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Delete every task and answer. Returns the number of tasks removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.write().await;
        state.answers.clear();
        let removed = state.tasks.len();
        state.tasks.clear();
        removed
    }
}

/// Role choices per user plus a fixed admin list.
#[derive(Debug, Default)]
pub struct Roles {
    admins: HashSet<i64>,
    chosen: RwLock<HashMap<i64, UserRole>>,
}

impl Roles {
    pub fn new(admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            chosen: RwLock::default(),
        }
    }

    pub async fn set_role(&self, user_id: i64, role: UserRole) {
        self.chosen.write().await.insert(user_id, role);
    }
}

#[async_trait]
impl RoleDirectory for Roles {
    async fn is_admin(&self, user_id: i64) -> dialog_gateway::Result<bool> {
        Ok(self.admins.contains(&user_id))
    }

    async fn role(&self, user_id: i64) -> dialog_gateway::Result<Option<UserRole>> {
        Ok(self.chosen.read().await.get(&user_id).copied())
    }
}
