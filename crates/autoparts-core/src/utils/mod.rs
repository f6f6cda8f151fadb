//! Utility functions for input validation and log-safe string formatting.

pub mod format;
pub mod validate;

// Re-export commonly used functions at module level
pub use format::{redact, truncate_body};
pub use validate::{is_valid_email, is_valid_password, is_valid_username};
