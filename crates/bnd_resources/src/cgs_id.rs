//! Packed base-40 string identifiers
//!
//! Up to 12 characters from a 40 symbol alphabet are packed into a `u64`, most significant
//! character first and right padded with spaces:
//!
//! | Digit    | Character |
//! |----------|-----------|
//! | 0        | space     |
//! | 1        | `-`       |
//! | 2        | `/`       |
//! | 3..=12   | `0`-`9`   |
//! | 13..=38  | `A`-`Z`   |
//! | 39       | `_`       |

use std::fmt;

use binrw::{BinRead, BinWrite};

use crate::error::{Error, Result};

/// Number of characters an identifier can hold
pub const MAX_LENGTH: usize = 12;

const RADIX: u64 = 40;

/// Packed identifier
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CgsId(pub u64);

fn digit(c: char) -> Option<u64> {
    match c.to_ascii_uppercase() {
        ' ' => Some(0),
        '-' => Some(1),
        '/' => Some(2),
        c @ '0'..='9' => Some(3 + (c as u64 - '0' as u64)),
        c @ 'A'..='Z' => Some(13 + (c as u64 - 'A' as u64)),
        '_' => Some(39),
        _ => None,
    }
}

fn symbol(digit: u64) -> char {
    match digit {
        0 => ' ',
        1 => '-',
        2 => '/',
        3..=12 => (b'0' + (digit - 3) as u8) as char,
        13..=38 => (b'A' + (digit - 13) as u8) as char,
        39 => '_',
        _ => '?',
    }
}

impl CgsId {
    pub const NONE: CgsId = CgsId(0);

    /// Pack a string, lower case letters are folded to upper case
    pub fn encode(value: &str) -> Result<CgsId> {
        if value.chars().count() > MAX_LENGTH {
            return Err(Error::InvalidIdentifier {
                value: value.to_string(),
                reason: "longer than 12 characters",
            });
        }

        let mut packed = 0u64;
        let mut length = 0;
        for c in value.chars() {
            let digit = digit(c).ok_or_else(|| Error::InvalidIdentifier {
                value: value.to_string(),
                reason: "unsupported character",
            })?;
            packed = packed * RADIX + digit;
            length += 1;
        }

        for _ in length..MAX_LENGTH {
            packed *= RADIX;
        }

        Ok(CgsId(packed))
    }

    /// Unpack into a string without the trailing padding
    ///
    /// Values that no encoder can produce show `?` for the digits outside the alphabet.
    pub fn decode(self) -> String {
        let mut digits = [0u64; MAX_LENGTH];
        let mut rest = self.0;
        for slot in digits.iter_mut().rev() {
            *slot = rest % RADIX;
            rest /= RADIX;
        }
        // anything left over belongs to the leading character
        digits[0] += rest * RADIX;

        let decoded: String = digits.iter().map(|&d| symbol(d)).collect();
        decoded.trim_end_matches(' ').to_string()
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether every digit is inside the alphabet, values past 40^12 are not
    pub const fn is_representable(self) -> bool {
        self.0 < RADIX.pow(MAX_LENGTH as u32)
    }
}

impl fmt::Display for CgsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}

impl From<u64> for CgsId {
    fn from(value: u64) -> Self {
        CgsId(value)
    }
}

impl From<CgsId> for u64 {
    fn from(value: CgsId) -> Self {
        value.0
    }
}

impl std::str::FromStr for CgsId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CgsId::encode(s)
    }
}

#[cfg(feature = "serde")]
mod serde {
    use std::fmt;

    use serde::{
        de::{self, Visitor},
        Deserialize, Serialize,
    };

    use super::CgsId;

    /// Marks the packed value of an identifier that has no string form
    const RAW_PREFIX: &str = "#0x";

    impl Serialize for CgsId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            if self.is_representable() {
                serializer.serialize_str(&self.decode())
            } else {
                serializer.serialize_str(&format!("{RAW_PREFIX}{:016x}", self.0))
            }
        }
    }

    struct CgsIdVisitor;

    impl<'de> Visitor<'de> for CgsIdVisitor {
        type Value = CgsId;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an identifier of up to 12 characters or its packed value")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            match value.strip_prefix(RAW_PREFIX) {
                Some(hex) => u64::from_str_radix(hex, 16).map(CgsId).map_err(E::custom),
                None => CgsId::encode(value).map_err(E::custom),
            }
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(CgsId(value))
        }
    }

    impl<'de> Deserialize<'de> for CgsId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(CgsIdVisitor)
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::cgs_id::CgsId;
    use crate::error::{Error, Result};

    #[test]
    fn encode_known_values() -> Result<()> {
        assert_eq!(CgsId::encode("")?, CgsId(0));
        assert_eq!(CgsId::encode("_")?, CgsId(39 * 40u64.pow(11)));
        assert_eq!(CgsId::encode("A")?, CgsId(13 * 40u64.pow(11)));
        assert_eq!(
            CgsId::encode("AB")?,
            CgsId(13 * 40u64.pow(11) + 14 * 40u64.pow(10))
        );
        assert_eq!(
            CgsId::encode("           0")?,
            CgsId(3)
        );

        Ok(())
    }

    #[test]
    fn lower_case_folds() -> Result<()> {
        assert_eq!(CgsId::encode("pus_dodge")?, CgsId::encode("PUS_DODGE")?);
        assert_eq!(CgsId::encode("pus_dodge")?.decode(), "PUS_DODGE");

        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        for value in ["", "A", "VEH_CARBBX", "ABCDEFGHIJKL", "0123456789-/", "X  Y", "__________"] {
            assert_eq!(CgsId::encode(value)?.decode(), value);
        }

        // trailing spaces are padding
        assert_eq!(CgsId::encode("AB  ")?.decode(), "AB");
        assert_eq!(CgsId::encode("AB  ")?, CgsId::encode("AB")?);

        Ok(())
    }

    #[test]
    fn invalid_input() {
        assert!(matches!(
            CgsId::encode("THIRTEEN_CHAR"),
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            CgsId::encode("A.B"),
            Err(Error::InvalidIdentifier {
                reason: "unsupported character",
                ..
            })
        ));
        assert!(CgsId::encode("É").is_err());
    }

    #[test]
    fn display_and_parse() -> Result<()> {
        let id: CgsId = "veh_carbbx".parse()?;
        assert_eq!(id.to_string(), "VEH_CARBBX");
        assert!(!id.is_none());
        assert!(CgsId::NONE.is_none());
        assert_eq!(CgsId::NONE.to_string(), "");

        Ok(())
    }

    #[test]
    fn values_outside_the_alphabet() {
        assert_eq!(CgsId(u64::MAX).decode().chars().count(), 12);
        assert!(CgsId(u64::MAX).decode().starts_with('?'));
        assert!(!CgsId(u64::MAX).is_representable());
        assert!(CgsId(40u64.pow(12) - 1).is_representable());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unrepresentable_values_survive_json() {
        let id = CgsId(u64::MAX - 5);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"#0xfffffffffffffffa\"");

        let parsed: CgsId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        let edge = CgsId(40u64.pow(12));
        let parsed: CgsId = serde_json::from_str(&serde_json::to_string(&edge).unwrap()).unwrap();
        assert_eq!(parsed, edge);

        assert!(serde_json::from_str::<CgsId>("\"#0xnothex\"").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_the_string() -> Result<()> {
        let id = CgsId::encode("JUNKYARD_1")?;
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"JUNKYARD_1\"");

        let parsed: CgsId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        let packed: CgsId = serde_json::from_str("3").unwrap();
        assert_eq!(packed, CgsId(3));

        Ok(())
    }
}
