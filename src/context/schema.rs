// SPDX-License-Identifier: MIT

//! Variable type definitions

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

static MAC_ADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}$").expect("valid regex"));

static SHA256: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("valid regex"));

/// A single playbook variable
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Variable {
    /// Declared type of the variable
    #[serde(alias = "type")]
    pub var_type: VariableType,
    /// Current value
    #[serde(alias = "value", default)]
    pub var_value: Value,
}

/// Supported CACAO variable types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VariableType {
    String,
    Uuid,
    Integer,
    Long,
    MacAddr,
    Ipv4Addr,
    Ipv6Addr,
    Uri,
    Sha256Hash,
    Hexstring,
    Dictionary,
}

impl Variable {
    pub fn new(var_type: VariableType, var_value: Value) -> Self {
        Self {
            var_type,
            var_value,
        }
    }
}

impl VariableType {
    /// Check whether `value` is a well-formed value of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            VariableType::Integer | VariableType::Long => value.is_i64() || value.is_u64(),
            VariableType::Dictionary => value.is_object(),
            _ => match value.as_str() {
                Some(s) => self.accepts_str(s),
                None => false,
            },
        }
    }

    fn accepts_str(&self, s: &str) -> bool {
        match self {
            VariableType::String => true,
            VariableType::Uuid => uuid::Uuid::parse_str(s).is_ok(),
            VariableType::MacAddr => MAC_ADDR.is_match(s),
            VariableType::Ipv4Addr => with_prefix(s, 32, |a| a.parse::<Ipv4Addr>().is_ok()),
            VariableType::Ipv6Addr => with_prefix(s, 128, |a| a.parse::<Ipv6Addr>().is_ok()),
            VariableType::Uri => url::Url::parse(s).is_ok(),
            VariableType::Sha256Hash => SHA256.is_match(s),
            VariableType::Hexstring => hex::decode(s).is_ok(),
            VariableType::Integer | VariableType::Long | VariableType::Dictionary => false,
        }
    }
}

/// Address with an optional `/prefix` no longer than `max_prefix`
fn with_prefix(s: &str, max_prefix: u8, addr_ok: impl Fn(&str) -> bool) -> bool {
    match s.split_once('/') {
        Some((addr, prefix)) => {
            addr_ok(addr) && prefix.parse::<u8>().is_ok_and(|p| p <= max_prefix)
        }
        None => addr_ok(s),
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableType::String => "string",
            VariableType::Uuid => "uuid",
            VariableType::Integer => "integer",
            VariableType::Long => "long",
            VariableType::MacAddr => "mac-addr",
            VariableType::Ipv4Addr => "ipv4-addr",
            VariableType::Ipv6Addr => "ipv6-addr",
            VariableType::Uri => "uri",
            VariableType::Sha256Hash => "sha256-hash",
            VariableType::Hexstring => "hexstring",
            VariableType::Dictionary => "dictionary",
        };
        write!(f, "{}", name)
    }
}
