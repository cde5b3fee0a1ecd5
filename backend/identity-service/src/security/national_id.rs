/// National ID (CPF) checksum validation and normalization
///
/// A CPF is 11 digits: a 9-digit base followed by two check digits. Each
/// check digit is a weighted sum mod 11 (weights 10..2 for the first,
/// 11..2 for the second); a remainder below 2 yields 0, anything else
/// yields `11 - remainder`.
use crate::error::{IdentityError, Result};
use serde::{Deserialize, Serialize};

const LEN: usize = 11;

/// A checksum-valid national ID in canonical 11-digit form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    /// Normalize and validate in one step
    pub fn parse(raw: &str) -> Result<Self> {
        if validate_national_id(raw) {
            Ok(Self(normalize_national_id(raw)))
        } else {
            Err(IdentityError::Validation("invalid national ID".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `000.000.000-00`
    pub fn formatted(&self) -> String {
        format_national_id(&self.0)
    }

    /// Trailing digits only, for logs
    pub fn masked(&self) -> String {
        format!("*******{}", &self.0[LEN - 4..])
    }
}

impl TryFrom<String> for NationalId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip every non-digit character
pub fn normalize_national_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Display format; input that does not normalize to 11 digits is returned stripped
pub fn format_national_id(raw: &str) -> String {
    let id = normalize_national_id(raw);
    if id.len() != LEN {
        return id;
    }
    format!("{}.{}.{}-{}", &id[..3], &id[3..6], &id[6..9], &id[9..])
}

/// Checksum validation. Pure and deterministic.
pub fn validate_national_id(raw: &str) -> bool {
    let id = normalize_national_id(raw);
    if id.len() != LEN {
        return false;
    }

    let digits: Vec<u32> = id.chars().filter_map(|c| c.to_digit(10)).collect();

    // Repeated-digit sequences satisfy the checksum but are never issued
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weights run from `len + 1` down to 2
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();

    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}
