use chrono::{DateTime, Utc};

pub const MAX_FOLDER_NAME_LEN: usize = 100;

/// Make `name` safe as a single storage path segment.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_` and the result is cut to
/// `MAX_FOLDER_NAME_LEN` characters; dots are replaced too, so `.` and `..`
/// cannot come out. `None` for an empty name.
pub fn sanitize_folder_name(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FOLDER_NAME_LEN)
        .collect();

    if sanitized.is_empty() {
        return None;
    }
    Some(sanitized)
}

/// `<root>_<reference>_<unix millis>`, sanitized
pub fn claim_folder_name(root: &str, reference: &str, at: DateTime<Utc>) -> Option<String> {
    sanitize_folder_name(&format!("{root}_{reference}_{}", at.timestamp_millis()))
}
