//! Glob matching for include/exclude patterns.
//!
//! Implemented by hand rather than with a glob library so the semantics stay
//! exact: `**` may appear mid-pattern and consumes zero or more whole path
//! segments, while `*` never crosses a `/`. Both inputs use `/`-separated
//! segments; callers normalize backslashes before matching.

use regex::Regex;

/// Match a relative path against a glob pattern.
///
/// Supported syntax:
/// - `**` as a whole segment matches zero or more path segments
/// - `*` inside a segment matches any run of characters within that segment
/// - any other segment must match literally
pub fn matches(relative_path: &str, pattern: &str) -> bool {
    let path_segments: Vec<&str> = relative_path.split('/').collect();
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    match_segments(&path_segments, &pattern_segments)
}

fn match_segments(path: &[&str], pattern: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(&"**"), _) => {
            // Branch: the `**` consumes nothing, or it consumes one path
            // segment and stays pending. Covers a/b, a/x/b, a/x/y/b for
            // the pattern a/**/b.
            if match_segments(path, &pattern[1..]) {
                return true;
            }
            match path.first() {
                Some(_) => match_segments(&path[1..], pattern),
                None => false,
            }
        }
        (Some(_), None) => false,
        (Some(&seg), Some(&part)) => {
            if segment_matches(part, seg) {
                match_segments(&path[1..], &pattern[1..])
            } else {
                false
            }
        }
    }
}

/// Match a single path segment against a single pattern segment.
fn segment_matches(part: &str, segment: &str) -> bool {
    if !segment.contains('*') {
        return part == segment;
    }
    // Compile `*` to `.*`, escaping everything else, anchored to the segment.
    let mut re = String::from("^");
    for ch in segment.chars() {
        if ch == '*' {
            re.push_str(".*");
        } else {
            re.push_str(&regex::escape(&ch.to_string()));
        }
    }
    re.push('$');
    match Regex::new(&re) {
        Ok(re) => re.is_match(part),
        Err(_) => false,
    }
}
