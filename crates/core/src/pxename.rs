// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derivation of the per-host PXE config file name (`spec.md` §3).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PxeNameError {
    #[error("host has neither a MAC address nor an IPv4 address")]
    NoAddress,
    #[error("malformed MAC address: {0:?}")]
    MalformedMac(String),
    #[error("malformed IPv4 address: {0:?}")]
    MalformedIpv4(String),
}

/// Derive the PXE config file name for a host: MAC takes precedence over
/// IPv4; if neither is present, this is a fatal "no address for host"
/// condition for the updater.
pub fn pxe_config_name(mac: Option<&str>, ipv4: Option<&str>) -> Result<String, PxeNameError> {
    if let Some(mac) = mac {
        return Ok(format!("01-{}", mac_to_pxe(mac)?));
    }
    if let Some(ipv4) = ipv4 {
        return Ok(ipv4_to_pxe(ipv4)?);
    }
    Err(PxeNameError::NoAddress)
}

/// `AA:BB:CC:DD:EE:FF` -> `aa-bb-cc-dd-ee-ff`.
fn mac_to_pxe(mac: &str) -> Result<String, PxeNameError> {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 || parts.iter().any(|p| p.len() != 2 || !p.chars().all(|c| c.is_ascii_hexdigit())) {
        return Err(PxeNameError::MalformedMac(mac.to_string()));
    }
    Ok(parts.join("-").to_ascii_lowercase())
}

/// `192.168.1.10` -> `C0A8010A`.
fn ipv4_to_pxe(ipv4: &str) -> Result<String, PxeNameError> {
    let octets: Vec<&str> = ipv4.split('.').collect();
    if octets.len() != 4 {
        return Err(PxeNameError::MalformedIpv4(ipv4.to_string()));
    }
    let mut out = String::with_capacity(8);
    for octet in octets {
        let n: u8 = octet
            .parse()
            .map_err(|_| PxeNameError::MalformedIpv4(ipv4.to_string()))?;
        out.push_str(&format!("{n:02X}"));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "pxename_tests.rs"]
mod tests;
