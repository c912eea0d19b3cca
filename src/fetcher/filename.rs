//! Derived filenames for cached artifacts

/// Characters kept when sanitizing a reference basename
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '%')
}

/// Derives the cache filename for a resource reference
///
/// Takes the basename of the reference (everything after the last `/`) and
/// keeps only ASCII letters, digits, `-`, `_`, `.` and `%`. The mapping is
/// deterministic. Distinct references that sanitize to the same name share one
/// cached artifact; that collision is accepted rather than re-resolved.
///
/// Returns `None` when nothing usable remains (empty, `.` or `..`).
///
/// # Example
///
/// ```
/// use directory_harvest::fetcher::derive_filename;
///
/// let name = derive_filename("https://img.example.edu/photos/Jane Doe (1).jpg");
/// assert_eq!(name.as_deref(), Some("JaneDoe1.jpg"));
/// ```
pub fn derive_filename(reference: &str) -> Option<String> {
    let basename = reference.rsplit('/').next().unwrap_or(reference);
    let sanitized: String = basename.chars().filter(|&c| is_allowed(c)).collect();

    match sanitized.as_str() {
        "" | "." | ".." => None,
        _ => Some(sanitized),
    }
}
