//! Values carried between pipeline stages

use std::fmt;

/// A single value flowing through a pipeline.
///
/// Exactly two shapes are valid. Stages that hash an item first normalize it
/// with [`Item::into_data`], which renders integers in decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Int(i64),
    Str(String),
}

impl Item {
    /// Normalize to the string form used as hash input.
    pub fn into_data(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Str(s) => s,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Item {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Item {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_normalizes_to_decimal() {
        assert_eq!(Item::Int(42).into_data(), "42");
        assert_eq!(Item::Int(-7).into_data(), "-7");
        assert_eq!(Item::Int(0).into_data(), "0");
    }

    #[test]
    fn str_passes_through() {
        assert_eq!(Item::from("abc").into_data(), "abc");
    }

    #[test]
    fn display_matches_data() {
        assert_eq!(Item::from(17).to_string(), "17");
        assert_eq!(Item::from("hello").to_string(), "hello");
    }
}
