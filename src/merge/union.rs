//! Line-set union for ignore-style files.

use std::collections::HashSet;

/// Lines from `incoming` that `existing` does not already contain.
///
/// Order follows `incoming`; duplicates within `incoming` are dropped.
/// Lines compare equal when they match after trimming a trailing `\r`.
pub fn missing_lines<'a>(existing: &str, incoming: &'a str) -> Vec<&'a str> {
    let mut seen: HashSet<&str> = existing.lines().map(normalize).collect();
    let mut missing = Vec::new();

    for line in incoming.lines() {
        let key = normalize(line);
        if seen.insert(key) {
            missing.push(key);
        }
    }

    missing
}

/// Union `incoming` into `existing`.
///
/// Returns `None` when every incoming line is already present, so callers
/// can leave the file untouched. Otherwise the original text is kept as is
/// and the missing lines are appended, one per line, ending with a newline.
pub fn union_lines(existing: &str, incoming: &str) -> Option<String> {
    let missing = missing_lines(existing, incoming);
    if missing.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(existing.len() + incoming.len());
    out.push_str(existing);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for line in missing {
        out.push_str(line);
        out.push('\n');
    }
    Some(out)
}

fn normalize(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
