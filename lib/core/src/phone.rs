//! E.164 phone numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of digits E.164 allows after the `+`.
const MAX_DIGITS: usize = 15;

/// Error returned when a string is not an E.164 number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhoneNumberError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParsePhoneNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not in E.164 format (e.g., +14157774444)",
            self.input
        )
    }
}

impl std::error::Error for ParsePhoneNumberError {}

/// A phone number in E.164 format: `+`, a non-zero country digit, and at
/// most fifteen digits in total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Returns the number including the leading `+`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `input` is a valid E.164 number.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        let Some(digits) = input.strip_prefix('+') else {
            return false;
        };
        let bytes = digits.as_bytes();
        (2..=MAX_DIGITS).contains(&bytes.len())
            && bytes[0] != b'0'
            && bytes.iter().all(u8::is_ascii_digit)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = ParsePhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ParsePhoneNumberError {
                input: s.to_string(),
            })
        }
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ParsePhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_e164() {
        for ok in ["+14157774444", "+442071838750", "+12"] {
            assert!(PhoneNumber::is_valid(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "14157774444",
            "+04157774444",
            "+1",
            "+1415777444412345",
            "+1 415 777 4444",
            "+1-415-777-4444",
        ] {
            assert!(!PhoneNumber::is_valid(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn parse_trims_whitespace() {
        let number: PhoneNumber = " +14157774444 ".parse().expect("valid");
        assert_eq!(number.as_str(), "+14157774444");
    }

    #[test]
    fn parse_error_mentions_format() {
        let err = "555-1234".parse::<PhoneNumber>().unwrap_err();
        assert!(err.to_string().contains("E.164"));
        assert_eq!(err.input, "555-1234");
    }
}
