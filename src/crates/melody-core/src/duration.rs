use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use crate::error::DurationError;

/// Exact note length measured in quarter notes
///
/// Kept as a reduced rational so that "is this a whole number of time steps"
/// is an integer question rather than a float comparison. A dotted eighth is
/// `3/4`, a half note is `2`, an eighth-note triplet is `1/3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DurationRepr", into = "String")]
pub struct Duration {
    numerator: u32,
    denominator: u32,
}

impl Duration {
    /// A sixteenth note, the default grid step
    pub const SIXTEENTH: Duration = Duration { numerator: 1, denominator: 4 };
    pub const QUARTER: Duration = Duration { numerator: 1, denominator: 1 };

    /// Create a reduced duration of `numerator / denominator` quarter notes
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, DurationError> {
        if denominator == 0 {
            return Err(DurationError::ZeroDenominator);
        }
        let g = gcd(numerator as u64, denominator as u64).max(1) as u32;
        Ok(Duration {
            numerator: numerator / g,
            denominator: denominator / g,
        })
    }

    /// Whole number of quarter notes
    pub fn from_quarters(quarters: u32) -> Self {
        Duration {
            numerator: quarters,
            denominator: 1,
        }
    }

    /// Duration of `ticks` at the given MIDI resolution
    pub fn from_ticks(ticks: u32, ticks_per_quarter: u16) -> Result<Self, DurationError> {
        Self::new(ticks, ticks_per_quarter as u32)
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Length in quarter notes as a float, for display and MIDI timing
    pub fn quarters(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// How many whole `step`s make up this duration.
    ///
    /// Returns `None` when the duration is zero or not an exact multiple of
    /// `step`.
    pub fn steps_of(&self, step: Duration) -> Option<usize> {
        if self.is_zero() || step.is_zero() {
            return None;
        }
        let lhs = self.numerator as u64 * step.denominator as u64;
        let rhs = self.denominator as u64 * step.numerator as u64;
        if lhs % rhs == 0 {
            usize::try_from(lhs / rhs).ok()
        } else {
            None
        }
    }

    /// `self - other`, `None` if `other` is longer
    pub fn checked_sub(self, other: Duration) -> Option<Duration> {
        let den = self.denominator as u64 * other.denominator as u64;
        let lhs = self.numerator as u64 * other.denominator as u64;
        let rhs = other.numerator as u64 * self.denominator as u64;
        let num = lhs.checked_sub(rhs)?;
        let g = gcd(num, den).max(1);
        Some(Duration {
            numerator: (num / g) as u32,
            denominator: (den / g) as u32,
        })
    }

    /// Convert to MIDI ticks, `None` if the duration falls between ticks
    pub fn to_ticks(&self, ticks_per_quarter: u32) -> Option<u32> {
        let scaled = self.numerator as u64 * ticks_per_quarter as u64;
        if scaled % self.denominator as u64 != 0 {
            return None;
        }
        u32::try_from(scaled / self.denominator as u64).ok()
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    /// Accepts `"3/4"`, `"0.75"` and `"2"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DurationError::Invalid(s.to_string());

        if let Some((num, den)) = s.split_once('/') {
            let num: u32 = num.trim().parse().map_err(|_| invalid())?;
            let den: u32 = den.trim().parse().map_err(|_| invalid())?;
            return Duration::new(num, den);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 9 {
            return Err(DurationError::Overflow(s.to_string()));
        }

        let scale = 10u64.pow(frac.len() as u32);
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let frac: u64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| invalid())? };
        let numerator = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(frac))
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;

        let g = gcd(numerator, scale).max(1);
        let numerator = u32::try_from(numerator / g).map_err(|_| DurationError::Overflow(s.to_string()))?;
        Duration::new(numerator, (scale / g) as u32)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let den = self.denominator as u64 * other.denominator as u64;
        let num = self.numerator as u64 * other.denominator as u64
            + other.numerator as u64 * self.denominator as u64;
        let g = gcd(num, den).max(1);
        Duration {
            numerator: (num / g) as u32,
            denominator: (den / g) as u32,
        }
    }
}

/// Repeat a duration `n` times, e.g. one grid step per hold token
impl Mul<usize> for Duration {
    type Output = Self;

    fn mul(self, n: usize) -> Self {
        let num = self.numerator as u64 * n as u64;
        let g = gcd(num, self.denominator as u64).max(1);
        Duration {
            numerator: (num / g) as u32,
            denominator: (self.denominator as u64 / g) as u32,
        }
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as u64 * other.denominator as u64;
        let rhs = other.numerator as u64 * self.denominator as u64;
        lhs.cmp(&rhs)
    }
}

/// Config files may spell durations as numbers (`0.25`) or strings (`"1/4"`)
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<DurationRepr> for Duration {
    type Error = DurationError;

    fn try_from(repr: DurationRepr) -> Result<Self, Self::Error> {
        match repr {
            DurationRepr::Number(n) => {
                if !n.is_finite() || n < 0.0 {
                    return Err(DurationError::Invalid(n.to_string()));
                }
                n.to_string().parse()
            }
            DurationRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Duration> for String {
    fn from(d: Duration) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_reduces() {
        let d = Duration::new(4, 8).unwrap();
        assert_eq!(d.numerator(), 1);
        assert_eq!(d.denominator(), 2);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(Duration::new(1, 0), Err(DurationError::ZeroDenominator));
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("3/4".parse::<Duration>().unwrap(), Duration::new(3, 4).unwrap());
        assert_eq!("0.75".parse::<Duration>().unwrap(), Duration::new(3, 4).unwrap());
        assert_eq!("1.5".parse::<Duration>().unwrap(), Duration::new(3, 2).unwrap());
        assert_eq!("4".parse::<Duration>().unwrap(), Duration::from_quarters(4));
        assert_eq!(".25".parse::<Duration>().unwrap(), Duration::SIXTEENTH);
        assert!("abc".parse::<Duration>().is_err());
        assert!("-1".parse::<Duration>().is_err());
        assert!("".parse::<Duration>().is_err());
    }

    #[test]
    fn test_steps_of() {
        let step = Duration::SIXTEENTH;
        assert_eq!(Duration::QUARTER.steps_of(step), Some(4));
        assert_eq!(Duration::new(3, 4).unwrap().steps_of(step), Some(3));
        assert_eq!(Duration::new(1, 3).unwrap().steps_of(step), None);
        assert_eq!(Duration::new(1, 8).unwrap().steps_of(step), None);
        assert_eq!(Duration::new(0, 1).unwrap().steps_of(step), None);
    }

    #[test]
    fn test_arithmetic_and_order() {
        let a = Duration::new(1, 2).unwrap();
        let b = Duration::new(1, 4).unwrap();
        assert_eq!(a + b, Duration::new(3, 4).unwrap());
        assert_eq!(b * 6, Duration::new(3, 2).unwrap());
        assert!(b < a);
        assert_eq!(a.checked_sub(b), Some(b));
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn test_ticks() {
        assert_eq!(Duration::SIXTEENTH.to_ticks(480), Some(120));
        assert_eq!(Duration::new(1, 3).unwrap().to_ticks(480), Some(160));
        assert_eq!(Duration::new(1, 7).unwrap().to_ticks(480), None);
        assert_eq!(Duration::from_ticks(240, 480).unwrap(), Duration::new(1, 2).unwrap());
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_num: Duration = serde_json::from_str("0.25").unwrap();
        let from_str: Duration = serde_json::from_str("\"1/4\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"1/4\"");
    }
}
