use std::sync::OnceLock;

use regex::Regex;

use crate::errno::Errno;

/// Name of the writable directory inside each context's own subtree.
pub const WRITE_DIR: &str = "write";

fn drive_letter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]:").expect("drive letter regex must compile"))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// A non-empty relative path without parent-directory segments.
pub fn is_simple_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    if drive_letter_pattern().is_match(path) {
        return false;
    }
    !segments(path).any(|segment| segment == "..")
}

pub fn safe_read_path(path: &str) -> bool {
    is_simple_path(path)
}

pub fn write_prefix(context_name: &str) -> String {
    format!("{}/{}", context_name, WRITE_DIR)
}

/// Writes are only allowed inside `<active>/write`; without an active
/// context nothing is writable.
pub fn safe_write_path(active_context: Option<&str>, path: &str) -> bool {
    let Some(name) = active_context else {
        return false;
    };
    if !is_simple_path(name) || !is_simple_path(path) {
        return false;
    }
    let normalized = path.replace('\\', "/");
    let prefix = write_prefix(name);
    match normalized.strip_prefix(&prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// A validated `fopen`-style mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
}

impl OpenMode {
    pub fn writes(&self) -> bool {
        self.write || self.append
    }
}

/// Accepts the characters of `rwabt+` in any case, led by `r`, `w` or `a`.
pub fn parse_open_mode(mode: &str) -> Result<OpenMode, Errno> {
    let lower = mode.to_ascii_lowercase();
    if lower.is_empty() || lower.chars().any(|ch| !"rwabt+".contains(ch)) {
        return Err(Errno::Inval);
    }
    let update = lower.contains('+');
    match lower.chars().next() {
        Some('r') => Ok(OpenMode {
            read: true,
            write: update,
            append: false,
            truncate: false,
            create: false,
        }),
        Some('w') => Ok(OpenMode {
            read: update,
            write: true,
            append: false,
            truncate: true,
            create: true,
        }),
        Some('a') => Ok(OpenMode {
            read: update,
            write: false,
            append: true,
            truncate: false,
            create: true,
        }),
        _ => Err(Errno::Inval),
    }
}
