use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Threshold above which a blob counts as "large".
///
/// Parsed from a decimal magnitude with an optional `K`/`M`/`G` suffix
/// (case-insensitive, decimal multipliers).
///
/// ```
/// use sequester_types::SizeCutoff;
///
/// assert_eq!("1M".parse::<SizeCutoff>().unwrap().bytes(), 1_000_000);
/// assert_eq!("3k".parse::<SizeCutoff>().unwrap().bytes(), 3_000);
/// assert_eq!("500".parse::<SizeCutoff>().unwrap().bytes(), 500);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeCutoff(u64);

impl SizeCutoff {
    pub const DEFAULT_BYTES: u64 = 1_000_000;

    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }
}

impl Default for SizeCutoff {
    fn default() -> Self {
        Self(Self::DEFAULT_BYTES)
    }
}

impl fmt::Display for SizeCutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SizeCutoff {
    type Err = TypeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidSize {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let s = input.trim();
        let (digits, multiplier) = match s.as_bytes().last() {
            None => return Err(invalid("empty")),
            Some(b'k' | b'K') => (&s[..s.len() - 1], 1_000u64),
            Some(b'm' | b'M') => (&s[..s.len() - 1], 1_000_000),
            Some(b'g' | b'G') => (&s[..s.len() - 1], 1_000_000_000),
            Some(_) => (s, 1),
        };

        if digits.is_empty() {
            return Err(invalid("missing magnitude"));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("magnitude must be a decimal integer"));
        }

        let magnitude: u64 = digits.parse().map_err(|_| invalid("magnitude too large"))?;
        magnitude
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| invalid("size overflows 64 bits"))
    }
}

impl Serialize for SizeCutoff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for SizeCutoff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(s: &str) -> u64 {
        s.parse::<SizeCutoff>().unwrap().bytes()
    }

    #[test]
    fn documented_examples() {
        assert_eq!(parse("1M"), 1_000_000);
        assert_eq!(parse("500"), 500);
        assert_eq!(parse("2G"), 2_000_000_000);
        assert_eq!(parse("3k"), 3_000);
    }

    #[test]
    fn suffixes_are_case_insensitive() {
        assert_eq!(parse("7K"), parse("7k"));
        assert_eq!(parse("7M"), parse("7m"));
        assert_eq!(parse("7G"), parse("7g"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse(" 10M "), 10_000_000);
    }

    #[test]
    fn default_is_one_megabyte() {
        assert_eq!(SizeCutoff::default().bytes(), 1_000_000);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "M", "1.5M", "-1", "1T", "1 M", "ten"] {
            assert!(bad.parse::<SizeCutoff>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        let err = "18446744073709551615G".parse::<SizeCutoff>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidSize { .. }));
    }

    #[test]
    fn deserializes_from_string_or_number() {
        #[derive(Deserialize)]
        struct Holder {
            cutoff: SizeCutoff,
        }
        let a: Holder = serde_json::from_str(r#"{"cutoff":"2m"}"#).unwrap();
        assert_eq!(a.cutoff.bytes(), 2_000_000);
        let b: Holder = serde_json::from_str(r#"{"cutoff":1234}"#).unwrap();
        assert_eq!(b.cutoff.bytes(), 1234);
    }

    proptest! {
        #[test]
        fn suffix_scales_magnitude(n in 0u64..1_000_000, idx in 0usize..3) {
            let (suffix, mult) = [("k", 1_000u64), ("m", 1_000_000), ("g", 1_000_000_000)][idx];
            prop_assert_eq!(parse(&format!("{n}{suffix}")), n * mult);
            prop_assert_eq!(parse(&format!("{n}{}", suffix.to_uppercase())), n * mult);
        }

        #[test]
        fn plain_digits_parse_verbatim(n in any::<u64>()) {
            prop_assert_eq!(parse(&n.to_string()), n);
        }
    }
}
