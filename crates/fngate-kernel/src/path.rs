//! Gateway path template → router path translation.
//!
//! Gateway declarations write variables as brace-wrapped segments
//! (`users/{id}`) relative to an optional URL prefix.  The hosting router
//! (axum 0.8 / matchit) uses the same `{name}` token for captures but gives
//! braces in *literal* segments a special meaning, so literal braces must be
//! doubled.  Greedy gateway variables (`{proxy+}`) map onto the router's
//! catch-all `{*proxy}`.
//!
//! ```rust
//! use fngate_kernel::path::translate;
//!
//! assert_eq!(translate("", "users/{id}/posts/{postId}"), "/users/{id}/posts/{postId}");
//! assert_eq!(translate("api", "files/{proxy+}"), "/api/files/{*proxy}");
//! assert_eq!(translate("api/", "home/"), "/api/home");
//! ```

const SEPARATOR: char = '/';

/// Join `prefix` and `raw_path` into a normalized display path.
///
/// * a non-empty prefix ends with exactly one separator;
/// * the result starts with exactly one separator;
/// * trailing separators are removed, `/` being the shortest result.
pub fn normalize(prefix: &str, raw_path: &str) -> String {
    let mut path = String::with_capacity(prefix.len() + raw_path.len() + 2);

    let prefix = prefix.trim_end_matches(SEPARATOR);
    if !prefix.is_empty() {
        path.push_str(prefix);
        path.push(SEPARATOR);
        // The prefix already supplies the joining separator.
        path.push_str(raw_path.trim_start_matches(SEPARATOR));
    } else {
        path.push_str(raw_path);
    }

    let body = path
        .trim_start_matches(SEPARATOR)
        .trim_end_matches(SEPARATOR);
    let mut normalized = String::with_capacity(body.len() + 1);
    normalized.push(SEPARATOR);
    normalized.push_str(body);
    normalized
}

/// Translate a gateway template into a router-matchable path.
///
/// Every `{name}` segment becomes exactly one named parameter; every other
/// segment is kept literally (with braces escaped).  Pure and infallible.
pub fn translate(prefix: &str, raw_path: &str) -> String {
    let normalized = normalize(prefix, raw_path);
    let segments: Vec<&str> = normalized.split(SEPARATOR).collect();
    let last = segments.len() - 1;

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| translate_segment(segment, i == last))
        .collect::<Vec<_>>()
        .join("/")
}

fn translate_segment(segment: &str, is_last: bool) -> String {
    if let Some(name) = param_name(segment) {
        if let Some(greedy) = name.strip_suffix('+') {
            if is_last && is_valid_name(greedy) {
                return format!("{{*{greedy}}}");
            }
        } else if is_valid_name(name) {
            return format!("{{{name}}}");
        }
    }
    escape_literal(segment)
}

/// The inner text of a `{...}` segment, if the whole segment is wrapped.
fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('*')
        && !name.contains(['{', '}', '+', SEPARATOR])
}

fn escape_literal(segment: &str) -> String {
    segment.replace('{', "{{").replace('}', "}}")
}
