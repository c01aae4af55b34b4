// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pxe-template: the pure-function bootloader-config template renderer
//! (`spec.md` §4.B). No I/O beyond reading the template file — rendering
//! can be tested without ever creating a FIFO.

mod property_map;

pub use property_map::PropertyMap;
pub use pxe_core::AppendBag;

use std::path::Path;
use thiserror::Error;

const APPEND_KEYWORD: &str = "append";
const HOST_SHORT_NAME_KEY: &str = "hn";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("template {path} is not valid UTF-8")]
    NotUtf8 { path: String },
}

/// Parse whitespace-separated `key`/`key=value` tokens, the same grammar
/// `append` lines use.
pub fn parse_tokens(s: &str) -> AppendBag {
    AppendBag::parse_tokens(s)
}

/// Render `path` against `properties` and `append`, per `spec.md` §4.B.
///
/// `host_short_name` is used as a fallback `hn` value: if neither the
/// template's own `append` line nor `append` itself supplies `hn`, it is
/// added last, after the caller's keys.
pub fn render(
    path: &Path,
    properties: &PropertyMap,
    append: &AppendBag,
    host_short_name: &str,
) -> Result<String, TemplateError> {
    let bytes = std::fs::read(path).map_err(|source| TemplateError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| TemplateError::NotUtf8 {
        path: path.display().to_string(),
    })?;

    let mut out = String::new();
    for line in text.lines() {
        let substituted = substitute_properties(line, properties);
        let trimmed_start = substituted.trim_start();
        if is_append_line(trimmed_start) {
            let remainder = &trimmed_start[APPEND_KEYWORD.len()..];
            let mut effective = AppendBag::parse_tokens(remainder);
            effective.merge_over(append);
            if !effective.contains(HOST_SHORT_NAME_KEY) {
                effective.set(HOST_SHORT_NAME_KEY, host_short_name);
            }
            out.push_str(APPEND_KEYWORD);
            let tokens = effective.render_tokens();
            if !tokens.is_empty() {
                out.push(' ');
                out.push_str(&tokens);
            }
        } else {
            out.push_str(substituted.trim_end());
        }
        out.push('\n');
    }
    Ok(out)
}

fn is_append_line(trimmed_start: &str) -> bool {
    trimmed_start == APPEND_KEYWORD
        || trimmed_start
            .strip_prefix(APPEND_KEYWORD)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// Replace every `%propertyId%` occurrence in `line` with its value from
/// `properties` (empty string if absent). Unterminated `%` sequences are
/// left as-is.
fn substitute_properties(line: &str, properties: &PropertyMap) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find('%') {
        let Some(end_offset) = rest[start + 1..].find('%') else {
            out.push_str(rest);
            return out;
        };
        let end = start + 1 + end_offset;
        out.push_str(&rest[..start]);
        let property_id = &rest[start + 1..end];
        out.push_str(properties.get(property_id).unwrap_or(""));
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
