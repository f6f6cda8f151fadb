//! Data models for account and session entities.
//!
//! - `Credentials`, `NewAccount`: form input submitted to the auth endpoints
//! - `Token`: the opaque bearer credential issued at login
//! - `Profile`: user-identifying data fetched with a valid token

pub mod account;
pub mod profile;

pub use account::{Credentials, NewAccount};
pub use profile::{Profile, Token};
