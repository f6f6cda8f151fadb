//! Session lifecycle: the state machine that owns every auth transition.
//!
//! `SessionController` is the only writer of session state and of the
//! persisted token. Screens observe state through `subscribe` and dispatch
//! intents (login, logout, view profile); they never touch storage or the
//! network themselves.

pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{SessionState, SessionStatus, StateTag};
