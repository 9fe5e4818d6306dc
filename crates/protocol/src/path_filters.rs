/// Normalizes a repository-relative path specifier.
///
/// Backslashes become `/`, leading `./` segments are stripped and surrounding slashes trimmed.
/// Returns `None` for specifiers that would leave the repository root (absolute paths or `..`
/// components) and for empty specifiers.
pub fn normalize_rel_path(raw: &str) -> Option<String> {
    let raw = raw.trim().replace('\\', "/");
    if raw.starts_with('/') || has_drive_prefix(&raw) {
        return None;
    }

    let mut value = raw.as_str();
    while let Some(rest) = value.strip_prefix("./") {
        value = rest;
    }
    let value = value.trim_matches('/');
    if value.is_empty() || value == "." {
        return None;
    }

    if value.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(value.to_string())
}

/// True when the specifier asks for a shallow directory listing (`src/`).
pub fn is_dir_specifier(raw: &str) -> bool {
    let raw = raw.trim();
    raw.ends_with('/') || raw.ends_with('\\')
}

/// Pack filenames served over HTTP must be a single, non-hidden path segment made of
/// `[A-Za-z0-9._@-]`.
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') {
        return false;
    }
    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'@'))
}

fn has_drive_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
