use async_trait::async_trait;
use dialog_navigation::SessionKey;
use dialog_protocol::{KeyboardLayout, NavigationStep, Screen, UserRole};

use crate::config::Lexicon;
use crate::error::Result;
use crate::reply::{ReplyGateway, ReplyOptions};

/// Profile lookups the fallback menu depends on. Backed by an external cache.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn is_admin(&self, user_id: i64) -> Result<bool>;

    async fn role(&self, user_id: i64) -> Result<Option<UserRole>>;
}

/// Home screen for a user with nothing to go back to.
#[must_use]
pub fn fallback_screen(is_admin: bool, role: Option<UserRole>, lexicon: &Lexicon) -> Screen {
    if is_admin {
        return Screen::new(&lexicon.select_action, Some(KeyboardLayout::AdminMenu));
    }
    match role {
        Some(role) => Screen::new(&lexicon.select_action, Some(role.menu())),
        None => Screen::new(&lexicon.select_role, Some(KeyboardLayout::RolePicker)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// The previous screen was shown again.
    Returned(NavigationStep),
    /// History had nothing to go back to.
    NotPossible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Returned to the screen that launched the abandoned sub-flow.
    Anchor(NavigationStep),
    /// No anchor; behaved like back.
    Previous(NavigationStep),
    /// Nothing on the stack; showed the role menu.
    Fallback(Screen),
}

/// Back and cancel behaviours shared by every screen.
pub struct Navigator<'a> {
    gateway: &'a ReplyGateway,
    roles: &'a dyn RoleDirectory,
}

impl<'a> Navigator<'a> {
    #[must_use]
    pub fn new(gateway: &'a ReplyGateway, roles: &'a dyn RoleDirectory) -> Self {
        Self { gateway, roles }
    }

    pub async fn go_back(&self, key: SessionKey) -> Result<BackOutcome> {
        let lexicon = self.gateway.lexicon();
        let previous = self
            .gateway
            .navigation(key)
            .pop_previous_with_defaults(None, Some(lexicon.select_action.as_str()))
            .await?;

        let Some(step) = previous else {
            log::debug!("Session {key}: back requested with no previous screen");
            self.gateway
                .answer(key, &lexicon.back_not_possible, ReplyOptions::default())
                .await?;
            return Ok(BackOutcome::NotPossible);
        };

        self.gateway
            .answer(key, &lexicon.back_ok, ReplyOptions::default())
            .await?;
        self.render_step(key, &step).await?;
        Ok(BackOutcome::Returned(step))
    }

    /// Abandon the running sub-flow.
    ///
    /// Scenario data is dropped first. The cancel anchor wins when set; without
    /// one this behaves like back, and with an empty stack the role menu is shown.
    pub async fn cancel(&self, key: SessionKey) -> Result<CancelOutcome> {
        let lexicon = self.gateway.lexicon();
        let nav = self.gateway.navigation(key);

        nav.clear_scenario_keep_history().await?;
        let anchor = nav.cancel_anchor().await?;
        self.gateway
            .answer(key, &lexicon.cancelled, ReplyOptions::default())
            .await?;

        if let Some(anchor) = anchor {
            if !nav.rewind_history_to(anchor.command).await? {
                log::warn!(
                    "Session {key}: cancel anchor {} is no longer in history",
                    anchor.command
                );
            }
            nav.clear_cancel_anchor().await?;
            self.render_step(key, &anchor).await?;
            return Ok(CancelOutcome::Anchor(anchor));
        }

        if let Some(previous) = nav
            .pop_previous_with_defaults(None, Some(lexicon.select_action.as_str()))
            .await?
        {
            self.render_step(key, &previous).await?;
            return Ok(CancelOutcome::Previous(previous));
        }

        let screen = self.fallback(key.user_id).await?;
        self.gateway.show(key, &screen).await?;
        Ok(CancelOutcome::Fallback(screen))
    }

    async fn fallback(&self, user_id: i64) -> Result<Screen> {
        let lexicon = self.gateway.lexicon();
        if self.roles.is_admin(user_id).await? {
            return Ok(fallback_screen(true, None, lexicon));
        }
        let role = self.roles.role(user_id).await?;
        Ok(fallback_screen(false, role, lexicon))
    }

    async fn render_step(&self, key: SessionKey, step: &NavigationStep) -> Result<()> {
        let text = step
            .text
            .as_deref()
            .unwrap_or(self.gateway.lexicon().select_action.as_str());
        self.gateway
            .answer(key, text, ReplyOptions::default().keyboard(step.keyboard))
            .await?;
        Ok(())
    }
}
