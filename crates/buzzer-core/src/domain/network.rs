//! The /24 address range swept by discovery.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First usable host number in a /24.
pub const FIRST_HOST: u8 = 1;
/// Last usable host number in a /24 (255 is the broadcast address).
pub const LAST_HOST: u8 = 254;

/// Error returned when a network prefix cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkPrefixError {
    #[error("network prefix must have three octets (e.g. 192.168.1), got {0:?}")]
    WrongOctetCount(String),
    #[error("invalid octet {octet:?} in network prefix")]
    InvalidOctet { octet: String },
    #[error("only /24 prefixes are supported, got /{0}")]
    UnsupportedLength(String),
}

/// The first three octets of a /24 network, e.g. `192.168.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkPrefix([u8; 3]);

impl NetworkPrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Address of host `n` inside this network.
    pub fn host(&self, n: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, n)
    }

    /// Every usable host address, `.1` through `.254`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        (FIRST_HOST..=LAST_HOST).map(move |n| self.host(n))
    }
}

impl Default for NetworkPrefix {
    fn default() -> Self {
        Self::new(192, 168, 1)
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

/// Accepts `"a.b.c"`, `"a.b.c.0"`, and `"a.b.c.0/24"`.
impl FromStr for NetworkPrefix {
    type Err = NetworkPrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let base = match trimmed.split_once('/') {
            Some((base, "24")) => base,
            Some((_, len)) => return Err(NetworkPrefixError::UnsupportedLength(len.to_string())),
            None => trimmed,
        };

        let parts: Vec<&str> = base.split('.').collect();
        let octets = match parts.len() {
            3 => &parts[..],
            // A host part is tolerated and ignored.
            4 => &parts[..3],
            _ => return Err(NetworkPrefixError::WrongOctetCount(s.to_string())),
        };

        let mut out = [0u8; 3];
        for (slot, octet) in out.iter_mut().zip(octets) {
            *slot = octet.parse().map_err(|_| NetworkPrefixError::InvalidOctet {
                octet: (*octet).to_string(),
            })?;
        }
        Ok(Self(out))
    }
}

impl TryFrom<String> for NetworkPrefix {
    type Error = NetworkPrefixError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkPrefix> for String {
    fn from(value: NetworkPrefix) -> Self {
        value.to_string()
    }
}
