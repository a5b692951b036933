#![forbid(unsafe_code)]
//! Flip-base64: the 64-symbol numeral system used for namei path segments.
//!
//! Digits are written least-significant first and never reversed, so
//! `encode(64)` is `"+="` (digit 0, then digit 1) with the case-sensitive
//! alphabet.

use afsvol_types::ParseError;
use serde::{Deserialize, Serialize};

const SENSITIVE_ALPHABET: &[u8; 64] =
    b"+=0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// Upper-case letters are replaced by punctuation so no two digits differ
/// only by case.
const INSENSITIVE_ALPHABET: &[u8; 64] =
    b"!\"#$%&()*+,-0123456789:;<=>?@[]^_`abcdefghijklmnopqrstuvwxyz{|}~";

const DIGIT_BITS: u32 = 6;
const DIGIT_MASK: u64 = 0x3F;
/// ceil(64 / 6)
const MAX_DIGITS: usize = 11;

/// Case sensitivity of the filesystem holding the namei tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipBase64 {
    alphabet: &'static [u8; 64],
}

impl Default for FlipBase64 {
    fn default() -> Self {
        Self::new(CaseSensitivity::default())
    }
}

impl FlipBase64 {
    #[must_use]
    pub fn new(case: CaseSensitivity) -> Self {
        let alphabet = match case {
            CaseSensitivity::Sensitive => SENSITIVE_ALPHABET,
            CaseSensitivity::Insensitive => INSENSITIVE_ALPHABET,
        };
        Self { alphabet }
    }

    #[must_use]
    pub fn alphabet(self) -> &'static str {
        // Both alphabets are ASCII.
        std::str::from_utf8(self.alphabet).unwrap_or_default()
    }

    /// Encode a signed value; negative values are outside the domain.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NegativeValue`] for `value < 0`.
    pub fn encode(self, value: i64) -> Result<String, ParseError> {
        let unsigned = u64::try_from(value).map_err(|_| ParseError::NegativeValue(value))?;
        Ok(self.encode_u64(unsigned))
    }

    #[must_use]
    pub fn encode_u64(self, mut value: u64) -> String {
        if value == 0 {
            return char::from(self.alphabet[0]).to_string();
        }
        let mut out = String::with_capacity(MAX_DIGITS);
        while value != 0 {
            #[allow(clippy::cast_possible_truncation)] // masked to 6 bits
            let digit = (value & DIGIT_MASK) as usize;
            out.push(char::from(self.alphabet[digit]));
            value >>= DIGIT_BITS;
        }
        out
    }

    /// Inverse of [`FlipBase64::encode_u64`].
    ///
    /// # Errors
    ///
    /// [`ParseError::EmptyDigits`], [`ParseError::InvalidDigit`] for a
    /// character outside the alphabet, or [`ParseError::DigitOverflow`] when
    /// the value does not fit 64 bits.
    pub fn decode(self, digits: &str) -> Result<u64, ParseError> {
        if digits.is_empty() {
            return Err(ParseError::EmptyDigits);
        }
        let values = digits
            .chars()
            .map(|ch| self.digit_value(ch).ok_or(ParseError::InvalidDigit(ch)))
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() > MAX_DIGITS {
            return Err(ParseError::DigitOverflow(digits.to_owned()));
        }

        let mut value = 0_u64;
        for (position, digit) in values.into_iter().enumerate() {
            let shift = u32::try_from(position)
                .ok()
                .and_then(|p| p.checked_mul(DIGIT_BITS))
                .ok_or_else(|| ParseError::DigitOverflow(digits.to_owned()))?;
            let shifted = digit
                .checked_shl(shift)
                .filter(|s| s >> shift == digit)
                .ok_or_else(|| ParseError::DigitOverflow(digits.to_owned()))?;
            value |= shifted;
        }
        Ok(value)
    }

    fn digit_value(self, ch: char) -> Option<u64> {
        let byte = u8::try_from(ch).ok()?;
        self.alphabet
            .iter()
            .position(|b| *b == byte)
            .and_then(|p| u64::try_from(p).ok())
    }
}
