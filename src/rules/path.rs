//! Path normalization and lookup keys.

/// Normalize a path for indexing or matching.
///
/// Trailing separators are stripped; the root stays `/`. Paths are never
/// shortened: a cut inside a component would make the stub equal to an
/// unrelated prefix.
pub fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Prefixes of a normalized path at component boundaries, longest first.
///
/// `/data/local/tmp` yields `/data/local/tmp`, `/data/local`, `/data`, `/`.
pub fn ancestors(normalized: &str) -> impl Iterator<Item = &str> {
    let mut next = (!normalized.is_empty()).then_some(normalized);
    std::iter::from_fn(move || {
        let current = next?;
        next = match current.rfind('/') {
            _ if current == "/" => None,
            Some(0) => Some("/"),
            Some(i) => Some(&current[..i]),
            None => None,
        };
        Some(current)
    })
}
