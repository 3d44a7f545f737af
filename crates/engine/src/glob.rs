//! Page qualification against the user's URL pattern list.

use avc_config::Settings;

/// Match a simple `*` glob against an input.
///
/// The pattern is split on `*` and every literal part must occur in the
/// input, left to right. Each search starts where the previous part was
/// found (not where it ended), so parts may overlap. A pattern whose literal
/// text is longer than the input never matches.
#[must_use]
pub fn glob_matches(pattern: &str, input: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    let literal_len: usize = parts.iter().map(|p| p.len()).sum();
    if literal_len > input.len() {
        return false;
    }

    let mut index = 0;
    for part in parts {
        match input.get(index..).and_then(|rest| rest.find(part)) {
            Some(offset) => index += offset,
            None => return false,
        }
    }
    true
}

/// Whether any pattern in the list matches the URL.
#[must_use]
pub fn in_pattern_list(patterns: &[String], url: &str) -> bool {
    patterns.iter().any(|pattern| glob_matches(pattern, url))
}

/// Whether the engine should run on this page.
///
/// In whitelist mode only listed pages qualify; otherwise every page except
/// the listed ones does.
#[must_use]
pub fn page_qualifies(settings: &Settings, url: &str) -> bool {
    settings.whitelist_mode == in_pattern_list(&settings.blacklist, url)
}
