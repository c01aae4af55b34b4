// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrapper for values that must never appear in plaintext in a log or
//! status line — chiefly the host key (`pckey`). Its `Debug`/`Display`
//! impls are redacted; the only way to get the raw value is
//! [`Confidential::expose`], so a reviewer can grep for `.expose(` to
//! audit every place plaintext leaves the wrapper.

use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct Confidential<T>(T);

impl<T> Confidential<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Extract the raw value. Callers must not pass the result to a logger.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Confidential<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Confidential(***)")
    }
}

impl<T> fmt::Display for Confidential<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
#[path = "confidential_tests.rs"]
mod tests;
