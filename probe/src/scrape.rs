// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Helpers for pulling values out of tool output.

use regex::Regex;

/// First line matching `pattern`.
pub(crate) fn find_line<'a>(lines: &'a [String], pattern: &Regex) -> Option<&'a str> {
    lines
        .iter()
        .map(String::as_str)
        .find(|line| pattern.is_match(line))
}

/// First capture group of `pattern` in `text`, trimmed; `None` if it does not match or the
/// capture is empty.
pub(crate) fn capture(pattern: &Regex, text: &str) -> Option<String> {
    let value = pattern.captures(text)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// [`capture`] applied to the first line matching `search`.
pub(crate) fn capture_in(lines: &[String], search: &Regex, pattern: &Regex) -> Option<String> {
    capture(pattern, find_line(lines, search)?)
}

/// Trimmed content, `None` when empty.
pub(crate) fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Build a regex from a literal pattern.
macro_rules! pattern {
    ($name:ident = $re:literal) => {
        static $name: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
            regex::Regex::new($re).expect(concat!("invalid pattern ", $re))
        });
    };
}

pub(crate) use pattern;
