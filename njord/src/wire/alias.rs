//! TAIP identifier aliasing.
//!
//! A sink may override the identifier written into `;ID=`:
//!
//! - `"42"` - fixed identifier, written verbatim
//! - `"+2"` / `"-1"` - signed delta applied to the unit's base identifier
//!
//! The base identifier is the unit id reported by the gateway, falling back
//! to the configured default.

use std::fmt;
use std::str::FromStr;

use super::error::EncodingError;

/// Largest identifier the 4-digit ID field can carry.
pub const MAX_TAIP_ID: u32 = 9999;

/// Per-sink identifier override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaipAlias {
    /// Use this identifier regardless of the unit.
    Fixed(u32),
    /// Add this delta to the unit's base identifier.
    Offset(i32),
}

impl TaipAlias {
    /// Resolve the identifier for one rendering.
    ///
    /// Offsets clamp to `0..=9999`; fixed values and bare bases must already fit.
    pub fn resolve(alias: Option<&TaipAlias>, base: u32) -> Result<u32, EncodingError> {
        match alias {
            Some(TaipAlias::Fixed(id)) => check_range(i64::from(*id)),
            Some(TaipAlias::Offset(delta)) => {
                let shifted = i64::from(base) + i64::from(*delta);
                Ok(shifted.clamp(0, i64::from(MAX_TAIP_ID)) as u32)
            }
            None => check_range(i64::from(base)),
        }
    }
}

fn check_range(id: i64) -> Result<u32, EncodingError> {
    if (0..=i64::from(MAX_TAIP_ID)).contains(&id) {
        Ok(id as u32)
    } else {
        Err(EncodingError::IdentifierOutOfRange(id))
    }
}

impl FromStr for TaipAlias {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |reason| EncodingError::InvalidAlias {
            input: s.to_string(),
            reason,
        };

        let (signed, digits) = match input.as_bytes().first() {
            Some(b'+') | Some(b'-') => (true, &input[1..]),
            Some(_) => (false, input),
            None => return Err(invalid("empty alias")),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected digits"));
        }

        if signed {
            let delta: i32 = input.parse().map_err(|_| invalid("delta too large"))?;
            Ok(TaipAlias::Offset(delta))
        } else {
            let id: u32 = digits.parse().map_err(|_| invalid("identifier too large"))?;
            if id > MAX_TAIP_ID {
                return Err(invalid("identifier does not fit in 4 digits"));
            }
            Ok(TaipAlias::Fixed(id))
        }
    }
}

impl fmt::Display for TaipAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaipAlias::Fixed(id) => write!(f, "{}", id),
            TaipAlias::Offset(delta) => write!(f, "{:+}", delta),
        }
    }
}
