//! Logout confirmation.
//!
//! The dialog is its own two-state machine, kept apart from session state so
//! a dismissed dialog can never be mistaken for a completed logout. The only
//! way to obtain a [`LogoutConfirmed`] is to confirm a pending dialog, and
//! [`SessionController::logout`](crate::session::SessionController::logout)
//! requires one.

pub const LOGOUT_DIALOG_TITLE: &str = "Logout";
pub const LOGOUT_DIALOG_PROMPT: &str = "Are you sure you want to logout?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Idle,
    PendingConfirmation,
}

/// Proof that the user confirmed the logout dialog
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a confirmed logout does nothing until passed to SessionController::logout"]
pub struct LogoutConfirmed {
    _private: (),
}

#[derive(Debug, Default)]
pub struct ConfirmationDialog {
    state: DialogState,
}

impl ConfirmationDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == DialogState::PendingConfirmation
    }

    /// Logout button pressed
    pub fn request(&mut self) {
        self.state = DialogState::PendingConfirmation;
    }

    /// Dismiss without effect. Returns whether a pending dialog was closed.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_visible();
        self.state = DialogState::Idle;
        was_pending
    }

    /// Confirm a pending dialog. Ignored while idle.
    pub fn confirm(&mut self) -> Option<LogoutConfirmed> {
        if !self.is_visible() {
            return None;
        }
        self.state = DialogState::Idle;
        Some(LogoutConfirmed { _private: () })
    }
}
