use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};

use crate::errors::{EstimatorError, Result};

/// JLPT level, ordered from the hardest ([`JlptLevel::N1`]) to the easiest ([`JlptLevel::N5`]).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Decode, Encode)]
pub enum JlptLevel {
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl JlptLevel {
    pub const ALL: [Self; 5] = [Self::N1, Self::N2, Self::N3, Self::N4, Self::N5];

    /// Digit of the level, also used as the class id of the linear solver.
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Inverse of [`JlptLevel::number`].
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::N1),
            2 => Some(Self::N2),
            3 => Some(Self::N3),
            4 => Some(Self::N4),
            5 => Some(Self::N5),
            _ => None,
        }
    }

    /// Position of the level in [`JlptLevel::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for JlptLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "N{}", self.number())
    }
}

impl FromStr for JlptLevel {
    type Err = EstimatorError;

    /// Parses `N3`, `n3`, `3` and their full-width forms.
    fn from_str(s: &str) -> Result<Self> {
        // Folds full-width ASCII variants (U+FF01..U+FF5E) to ASCII.
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
                _ => c,
            })
            .collect();
        let digits = normalized
            .strip_prefix(['N', 'n'])
            .unwrap_or(&normalized);
        digits
            .parse::<u8>()
            .ok()
            .filter(|_| digits.len() == 1)
            .and_then(Self::from_number)
            .ok_or_else(|| {
                EstimatorError::invalid_argument("level", format!("unknown JLPT level: {s:?}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        for s in ["N3", "n3", "3", " N3 ", "Ｎ３", "ｎ3"] {
            assert_eq!(JlptLevel::N3, s.parse().unwrap(), "{s}");
        }
        assert_eq!(JlptLevel::N1, "N1".parse().unwrap());
        assert_eq!(JlptLevel::N5, "5".parse().unwrap());
    }

    #[test]
    fn test_parse_invalid_level() {
        for s in ["", "N", "N0", "N6", "N33", "+3", "level3", "N 3"] {
            assert!(s.parse::<JlptLevel>().is_err(), "{s}");
        }
    }

    #[test]
    fn test_level_order() {
        assert!(JlptLevel::N1 < JlptLevel::N5);
        for (i, level) in JlptLevel::ALL.iter().enumerate() {
            assert_eq!(i, level.index());
            assert_eq!(Some(*level), JlptLevel::from_number(level.number()));
            assert_eq!(*level, level.to_string().parse().unwrap());
        }
    }
}
