use dialog_navigation::NavigationState;
use serde::{Deserialize, Serialize};

/// Navigation buttons attached to an outgoing message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affordances {
    pub back: bool,
    pub cancel: bool,
}

impl Affordances {
    pub const NONE: Self = Self {
        back: false,
        cancel: false,
    };

    /// Buttons implied by the shape of the navigation state.
    ///
    /// An active sub-flow (cancel anchor set) offers cancel only. Otherwise
    /// back is offered as soon as there is a previous screen.
    #[must_use]
    pub fn from_state(state: &NavigationState) -> Self {
        if state.cancel_anchor.is_some() {
            Self {
                back: false,
                cancel: true,
            }
        } else {
            Self {
                back: state.history.len() >= 2,
                cancel: false,
            }
        }
    }

    /// Explicit choices win per flag; `None` falls back to [`Self::from_state`].
    #[must_use]
    pub fn resolve(
        state: &NavigationState,
        include_back: Option<bool>,
        include_cancel: Option<bool>,
    ) -> Self {
        let auto = Self::from_state(state);
        Self {
            back: include_back.unwrap_or(auto.back),
            cancel: include_cancel.unwrap_or(auto.cancel),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.back && !self.cancel
    }
}
