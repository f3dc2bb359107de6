//! Stable diagnostic codes such as `E302` or `W313`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a code belongs to the fatal `E` range or the advisory `W` range.
///
/// Advisory codes may still be emitted at [`Severity::Note`](crate::Severity)
/// when nothing is wrong with the design.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Schedule construction failed.
    Error,
    /// The schedule was built, but something deserves a look.
    Warning,
}

impl Category {
    /// The letter that starts a rendered code.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'E' => Some(Category::Error),
            'W' => Some(Category::Warning),
            _ => None,
        }
    }
}

/// A category plus a number, rendered as the prefix and three digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

/// A string that is not a diagnostic code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a diagnostic code (expected e.g. `E302`)")]
pub struct ParseCodeError(pub String);

impl FromStr for DiagnosticCode {
    type Err = ParseCodeError;

    /// Parses the rendered form back.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCodeError(s.to_string());
        let mut chars = s.chars();
        let category = chars
            .next()
            .and_then(Category::from_prefix)
            .ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse().map_err(|_| invalid())?;
        Ok(Self::new(category, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_three_digits() {
        assert_eq!(DiagnosticCode::new(Category::Error, 302).to_string(), "E302");
        assert_eq!(DiagnosticCode::new(Category::Warning, 7).to_string(), "W007");
    }

    #[test]
    fn parses_rendered_form() {
        let code: DiagnosticCode = "W313".parse().unwrap();
        assert_eq!(code, DiagnosticCode::new(Category::Warning, 313));
        assert_eq!("E007".parse::<DiagnosticCode>().unwrap().number, 7);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "E", "X302", "E30", "E3021", "e302", "E3x2"] {
            assert!(bad.parse::<DiagnosticCode>().is_err(), "{bad}");
        }
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Error, 301);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
