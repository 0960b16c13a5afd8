//! Translation of Facebook Graph API error codes into user-facing messages.
//!
//! Pure lookups only; nothing here changes how a failure is propagated.

/// Known Graph API error codes and their user-facing descriptions.
const FACEBOOK_ERROR_TABLE: &[(&str, &str)] = &[
    ("100", "Invalid parameter"),
    ("190", "Invalid access token"),
    ("200", "Permission denied"),
    ("613", "Rate limit exceeded"),
    ("803", "Some of the aliases you requested do not exist"),
    ("1487742", "User request limit reached"),
    ("80004", "There have been too many calls to this ad-account"),
];

/// Graph API codes the platform uses for throttling.
const THROTTLING_CODES: &[&str] = &["4", "17", "32", "613", "80004", "1487742"];

/// Maps a platform error code and message to the most specific description.
///
/// Lookup order: exact code from the table, then substring patterns on the
/// message (case-insensitive), then the raw message.
pub fn describe_facebook_error(code: Option<&str>, message: &str) -> String {
    if let Some(code) = code {
        if let Some((_, description)) = FACEBOOK_ERROR_TABLE.iter().find(|(c, _)| *c == code) {
            return (*description).to_string();
        }
    }

    let lowered = message.to_lowercase();

    if lowered.contains("rate limit") {
        return "API rate limit exceeded. Please wait before making more requests.".to_string();
    }
    if lowered.contains("access token") {
        return "Invalid or expired access token. Please check your API credentials.".to_string();
    }
    if lowered.contains("permission") {
        return "Insufficient permissions to perform this action.".to_string();
    }
    if lowered.contains("not found") {
        return "The requested resource was not found.".to_string();
    }

    message.to_string()
}

/// Whether a platform error code signals throttling on the platform side.
pub fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}
