//! Auto Parts core - account and session lifecycle for the Auto Parts app.
//!
//! Front ends drive a single [`SessionController`], which owns the session
//! state machine, talks to the backend through [`AuthClient`] and persists the
//! bearer token through a [`SessionStore`]. [`NavigationGate`] decides which
//! screens the current state admits.

pub mod api;
pub mod auth;
pub mod config;
pub mod dialog;
pub mod models;
pub mod navigation;
pub mod session;
pub mod utils;

pub use api::{AuthClient, AuthError};
pub use auth::{open_store, SessionStore, StorageError};
pub use config::{Config, SessionBackend};
pub use dialog::{ConfirmationDialog, DialogState, LogoutConfirmed};
pub use models::{Credentials, NewAccount, Profile, Token};
pub use navigation::{Admission, Navigation, NavigationGate, ProfileView, Screen};
pub use session::{SessionController, SessionState, SessionStatus, StateTag};
