//! Display name decomposition
//!
//! Directory names follow a "Last, First Middle" convention. The first
//! whitespace token is the last name (its comma dropped) and the second is
//! the first name. Anything that does not fit leaves the missing part absent.

/// Last and first name derived from a display name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameParts {
    pub last: Option<String>,
    pub first: Option<String>,
}

/// Splits a display name into last and first name
///
/// # Example
///
/// ```
/// use directory_harvest::enrich::decompose_name;
///
/// let parts = decompose_name("Smith, Jane A.");
/// assert_eq!(parts.last.as_deref(), Some("Smith"));
/// assert_eq!(parts.first.as_deref(), Some("Jane"));
///
/// let single = decompose_name("Cher");
/// assert_eq!(single.last.as_deref(), Some("Cher"));
/// assert!(single.first.is_none());
/// ```
pub fn decompose_name(display_name: &str) -> NameParts {
    let mut tokens = display_name
        .split_whitespace()
        .map(|token| token.replace(',', ""))
        .filter(|token| !token.is_empty());

    NameParts {
        last: tokens.next(),
        first: tokens.next(),
    }
}
