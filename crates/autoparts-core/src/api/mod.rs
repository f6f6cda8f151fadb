//! REST client module for the Auto Parts backend.
//!
//! This module provides the `AuthClient` for the login, register and
//! profile endpoints. The profile endpoint uses bearer token
//! authentication with the token obtained at login.

pub mod client;
pub mod error;

pub use client::AuthClient;
pub use error::AuthError;
