//! Brazilian company registration number (CNPJ).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Cnpj`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CnpjError {
    /// Input contains something other than digits and `.`, `/`, `-` separators.
    #[error("cnpj may only contain digits and . / - separators")]
    InvalidCharacter,
    /// Wrong number of digits.
    #[error("cnpj must have 14 digits (got {0})")]
    WrongLength(usize),
    /// All digits identical (e.g. `00000000000000`), rejected by the registry.
    #[error("cnpj cannot be a repeated digit sequence")]
    RepeatedDigits,
    /// Check digits do not match.
    #[error("cnpj check digits do not match")]
    BadCheckDigits,
}

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// A validated CNPJ, stored as its 14 bare digits.
///
/// Wholesale clients are identified by CNPJ. Parsing accepts both the bare
/// and the punctuated form; `Display` always renders the punctuated form.
///
/// ```
/// use phonestore_core::Cnpj;
///
/// let cnpj = Cnpj::parse("11.222.333/0001-81").unwrap();
/// assert_eq!(cnpj.digits(), "11222333000181");
/// assert_eq!(cnpj.to_string(), "11.222.333/0001-81");
/// assert!(Cnpj::parse("11.222.333/0001-80").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse a CNPJ, validating its check digits.
    ///
    /// # Errors
    ///
    /// Returns a [`CnpjError`] describing the first problem found.
    pub fn parse(s: &str) -> Result<Self, CnpjError> {
        let mut digits = Vec::with_capacity(14);
        for ch in s.trim().chars() {
            match ch {
                '0'..='9' => digits.push(ch.to_digit(10).unwrap_or(0)),
                '.' | '/' | '-' => {}
                _ => return Err(CnpjError::InvalidCharacter),
            }
        }

        if digits.len() != 14 {
            return Err(CnpjError::WrongLength(digits.len()));
        }

        if digits.windows(2).all(|w| w.first() == w.get(1)) {
            return Err(CnpjError::RepeatedDigits);
        }

        let first = check_digit(&digits, &FIRST_WEIGHTS);
        let second = check_digit(&digits, &SECOND_WEIGHTS);
        if digits.get(12) != Some(&first) || digits.get(13) != Some(&second) {
            return Err(CnpjError::BadCheckDigits);
        }

        Ok(Self(digits.iter().map(u32::to_string).collect()))
    }

    /// The 14 bare digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        match (d.get(0..2), d.get(2..5), d.get(5..8), d.get(8..12), d.get(12..14)) {
            (Some(a), Some(b), Some(c), Some(branch), Some(dv)) => {
                write!(f, "{a}.{b}.{c}/{branch}-{dv}")
            }
            _ => f.write_str(d),
        }
    }
}

impl TryFrom<String> for Cnpj {
    type Error = CnpjError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cnpj> for String {
    fn from(cnpj: Cnpj) -> Self {
        cnpj.0
    }
}

impl std::str::FromStr for Cnpj {
    type Err = CnpjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
