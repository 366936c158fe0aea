//! BSSID (access point MAC address) parsing and normalization.
//!
//! Scanners and configuration files disagree on MAC formatting, so every
//! BSSID is reduced to its six raw octets before comparison. Accepted forms:
//!
//! - `aa:bb:cc:dd:ee:ff` (colon separated, any case)
//! - `AA-BB-CC-DD-EE-FF` (dash separated)
//! - `aabb.ccdd.eeff` (dotted groups)
//! - `aabbccddeeff` (bare hex)

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a string is not a recognizable MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid BSSID '{input}': {reason}")]
pub struct BssidParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// A 48-bit access point identifier.
///
/// Displays in canonical lowercase colon-hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bssid([u8; 6]);

impl Bssid {
    /// Create a BSSID from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for Bssid {
    type Err = BssidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason| BssidParseError {
            input: s.to_string(),
            reason,
        };

        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(error("non-hex character"));
        }
        if hex.len() != 12 {
            return Err(error("expected 12 hex digits"));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| error("non-hex character"))?;
        }

        Ok(Self(octets))
    }
}

impl TryFrom<String> for Bssid {
    type Error = BssidParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}
