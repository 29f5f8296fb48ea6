//! Rejects request paths that could make glob rules and the router disagree about which
//! resource is addressed, e.g. `/static/../articles`.

/// Percent-encodings of characters that change path structure.
const FORBIDDEN_ENCODINGS: &[&str] = &["%2e", "%2f", "%5c", "%3b", "%00", "%25"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FirewallError {
    #[error("Path is not absolute")]
    NotAbsolute,

    #[error("Path contains a '.' or '..' segment")]
    DotSegment,

    #[error("Path contains an empty segment")]
    EmptySegment,

    #[error("Path contains forbidden character {0:?}")]
    ForbiddenCharacter(char),

    #[error("Path contains forbidden encoding '{0}'")]
    ForbiddenEncoding(String),
}

/// Checks the raw (still percent-encoded) request path.
pub fn check_path(path: &str) -> Result<(), FirewallError> {
    if !path.starts_with('/') {
        return Err(FirewallError::NotAbsolute);
    }

    if let Some(c) = path.chars().find(|c| matches!(c, '\\' | ';' | '\0') || c.is_control()) {
        return Err(FirewallError::ForbiddenCharacter(c));
    }

    let lowered = path.to_ascii_lowercase();
    if let Some(encoding) = FORBIDDEN_ENCODINGS.iter().find(|e| lowered.contains(*e)) {
        return Err(FirewallError::ForbiddenEncoding(encoding.to_string()));
    }

    // A trailing slash is fine; empty segments elsewhere ("//") are not.
    let segments: Vec<&str> = path[1..].split('/').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            "." | ".." => return Err(FirewallError::DotSegment),
            "" if i != last => return Err(FirewallError::EmptySegment),
            _ => {}
        }
    }

    Ok(())
}
