/// Maximum length for response bodies placed in error messages and log lines
pub const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Number of leading characters kept when redacting a secret
const REDACT_VISIBLE_CHARS: usize = 4;

/// Truncate a response body to avoid logging excessive data
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
    format!("{}... (truncated, {} total bytes)", truncated, body.len())
}

/// Render a secret for logs: the first few characters, then an ellipsis.
/// Short secrets are hidden entirely.
pub fn redact(secret: &str) -> String {
    if secret.chars().count() <= REDACT_VISIBLE_CHARS * 2 {
        return "…".to_string();
    }
    let visible: String = secret.chars().take(REDACT_VISIBLE_CHARS).collect();
    format!("{}…", visible)
}
