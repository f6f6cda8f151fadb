//! Field-level checks applied to form input before anything is sent.

/// Maximum length for username input.
/// Matches the login form's field limit.
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

fn fits_field(value: &str, max_len: usize) -> bool {
    value.chars().count() <= max_len && value.chars().all(is_valid_input_char)
}

/// Check that a username fits the field and has no control characters.
/// Emptiness is checked separately so the caller can report it distinctly.
pub fn is_valid_username(username: &str) -> bool {
    fits_field(username, MAX_USERNAME_LENGTH)
}

/// Check that a password fits the field and has no control characters
pub fn is_valid_password(password: &str) -> bool {
    fits_field(password, MAX_PASSWORD_LENGTH)
}

/// Syntactic email check: one `@`, a non-empty local part, and a dotted domain
/// whose dot is neither first nor last. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}
