// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identity: the canonical `HostId` newtype and the subset of host
//! attributes the boot-config updater needs (MAC, IPv4, host key).

use thiserror::Error;

use crate::confidential::Confidential;

crate::define_id! {
    /// Canonical, fully-qualified host identifier (e.g. `h1.example.org`).
    ///
    /// Host IDs coming from outside the process (control-channel commands,
    /// backend responses) must go through [`HostId::canonicalize`], which
    /// lower-cases the input, validates DNS-label shape, and rejects the
    /// empty string. `new()` is still available for constructing IDs that
    /// are already known-canonical, e.g. in tests.
    pub struct HostId;
}

/// Errors from [`HostId::canonicalize`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostCanonicalizeError {
    #[error("host id must not be empty")]
    Empty,
    #[error("host id label must not be empty: {0:?}")]
    EmptyLabel(String),
    #[error("host id label is not a valid DNS label: {0:?}")]
    InvalidLabel(String),
}

impl HostId {
    /// Canonicalise a raw host identifier: lower-case, validate DNS-label
    /// shape per label, reject the empty string.
    pub fn canonicalize(raw: &str) -> Result<Self, HostCanonicalizeError> {
        if raw.is_empty() {
            return Err(HostCanonicalizeError::Empty);
        }
        let lower = raw.to_ascii_lowercase();
        for label in lower.split('.') {
            if label.is_empty() {
                return Err(HostCanonicalizeError::EmptyLabel(lower.clone()));
            }
            if !is_dns_label(label) {
                return Err(HostCanonicalizeError::InvalidLabel(label.to_string()));
            }
        }
        Ok(Self::new(lower))
    }

    /// Short hostname: everything before the first dot.
    pub fn short_name(&self) -> &str {
        self.as_str().split('.').next().unwrap_or(self.as_str())
    }

    /// Domain suffix: everything after the first dot, or empty if the host
    /// id has no dot.
    pub fn domain(&self) -> &str {
        self.as_str()
            .split_once('.')
            .map(|(_, rest)| rest)
            .unwrap_or("")
    }
}

/// A DNS label: 1-63 chars, alphanumeric or hyphen, no leading/trailing
/// hyphen.
fn is_dns_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

/// Everything the updater needs to know about a host from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRecord {
    pub mac: Option<String>,
    pub ipv4: Option<String>,
    pub host_key: Option<Confidential<String>>,
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
