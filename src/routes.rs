//! Route patterns that stay reachable after sign-out.

/// Public pages a signed-out visitor may stay on.
pub const PUBLIC_ROUTES: [&str; 5] = [
    "/",
    "/campaigns",
    "/campaigns/[slug]",
    "/institutions",
    "/institutions/[slug]",
];

/// Returns the path portion of `route`, without query, fragment or trailing slash.
fn path_of(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    let path = route[..end].trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('[') && segment.ends_with(']')
}

/// Matches a concrete route against a pattern where `[name]` segments match
/// exactly one non-empty path segment.
#[must_use]
pub fn matches(pattern: &str, route: &str) -> bool {
    let pattern = path_of(pattern);
    let route = path_of(route);

    let mut pattern_segments = pattern.split('/');
    let mut route_segments = route.split('/');

    loop {
        match (pattern_segments.next(), route_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                if is_param(expected) {
                    if actual.is_empty() {
                        return false;
                    }
                } else if expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Returns true if `route` matches any pattern in `patterns`.
#[must_use]
pub fn is_public<S: AsRef<str>>(patterns: &[S], route: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| matches(pattern.as_ref(), route))
}
