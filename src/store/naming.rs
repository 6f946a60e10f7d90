//! Naming rules for shares, directories and files.

use uuid::Uuid;

use crate::store::error::StoreError;

/// Checks a share name against the service naming rules.
///
/// Share names are 1 to 63 characters of lowercase letters, digits and
/// hyphens, start and end with a letter or digit, and never contain two
/// hyphens in a row.
///
/// # Errors
///
/// Returns [`StoreError::InvalidName`] naming the violated rule.
pub fn validate_share_name(name: &str) -> Result<(), StoreError> {
    if !(1..=63).contains(&name.len()) {
        return Err(invalid(name, "share names are 1 to 63 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            name,
            "share names use only lowercase letters, digits and hyphens",
        ));
    }
    let first_ok = name.chars().next().is_some_and(|c| c != '-');
    let last_ok = name.chars().next_back().is_some_and(|c| c != '-');
    if !first_ok || !last_ok {
        return Err(invalid(
            name,
            "share names start and end with a letter or digit",
        ));
    }
    if name.contains("--") {
        return Err(invalid(
            name,
            "share names do not contain consecutive hyphens",
        ));
    }
    Ok(())
}

/// Checks a directory or file name.
///
/// Component names are 1 to 255 characters, contain no path separators or
/// control characters, and are not the reserved names `.` or `..`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidName`] naming the violated rule.
pub fn validate_component_name(name: &str) -> Result<(), StoreError> {
    if !(1..=255).contains(&name.len()) {
        return Err(invalid(name, "names are 1 to 255 characters long"));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(invalid(
            name,
            "names contain no path separators or control characters",
        ));
    }
    if name == "." || name == ".." {
        return Err(invalid(name, "'.' and '..' are reserved"));
    }
    Ok(())
}

/// Appends a random lowercase suffix to `prefix`, giving each run its own
/// resource names so concurrent runs never collide.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

fn invalid(name: &str, rule: &'static str) -> StoreError {
    StoreError::InvalidName {
        name: name.to_owned(),
        rule,
    }
}
