// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `append` bag: an insertion-ordered `key[=value]` mapping that
//! becomes the bootloader's `append` directive.
//!
//! Backed by `indexmap::IndexMap` rather than a hand-rolled
//! `Vec<(String, String)>` + lookup — the daemon already depends on
//! `indexmap` elsewhere in the corpus for exactly this "ordered map with
//! O(1) lookup" shape.

use indexmap::IndexMap;

/// Ordered `key -> value` bag. An empty value means "bare flag, no
/// `=value`" per `spec.md` §3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendBag(IndexMap<String, String>);

impl AppendBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`. Overwriting an existing key keeps its
    /// original position (matches `IndexMap::insert` semantics), which is
    /// what gives "later wins, first-appearance order" its order half.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merge `other` over `self`: `other`'s values win on key collision,
    /// but any key only in `self` keeps its original position and any new
    /// key from `other` is appended after existing keys, in `other`'s
    /// order.
    pub fn merge_over(&mut self, other: &AppendBag) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    /// Render as the space-separated token list that follows the `append`
    /// keyword: bare `key` when the value is empty, `key=value` otherwise.
    pub fn render_tokens(&self) -> String {
        self.iter()
            .map(|(k, v)| if v.is_empty() { k.to_string() } else { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse whitespace-separated `key` or `key=value` tokens into a bag.
    ///
    /// Shared by the template renderer (parsing a template's own `append`
    /// defaults) and the boot-config updater (parsing the
    /// `opsi-linux-bootimage.append` config-state value) — both need
    /// identical tokenising rules.
    pub fn parse_tokens(s: &str) -> Self {
        let mut bag = Self::new();
        for tok in s.split_whitespace() {
            match tok.split_once('=') {
                Some((k, v)) => bag.set(k, v),
                None => bag.set(tok, ""),
            }
        }
        bag
    }
}

#[cfg(test)]
#[path = "append_tests.rs"]
mod tests;
