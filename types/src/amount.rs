//! USDC amount type.
//!
//! Amounts are fixed-point integers in micro-units (6 decimals, matching the
//! token's on-chain precision) to avoid floating-point errors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// An amount of USDC, stored as micro-units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsdcAmount(u64);

impl UsdcAmount {
    pub const ZERO: Self = Self(0);

    /// Number of fractional decimal digits.
    pub const DECIMALS: u32 = 6;

    /// Micro-units per whole USDC.
    pub const UNIT: u64 = 1_000_000;

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn micros(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal string such as `"5"`, `"0.10"` or `"49.99"`.
    ///
    /// At most six fractional digits are accepted; signs and exponents are not.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let s_trim = s.trim();
        let (whole, frac) = match s_trim.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s_trim, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(invalid());
        }

        let whole_units: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut frac_units: u64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };
        frac_units *= 10u64.pow(Self::DECIMALS - frac.len() as u32);

        whole_units
            .checked_mul(Self::UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Convert a JSON-style float, rounding to the nearest micro-unit.
    pub fn from_f64(value: f64) -> Result<Self, TypesError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TypesError::InvalidAmount(value.to_string()));
        }
        let micros = (value * Self::UNIT as f64).round();
        if micros > u64::MAX as f64 {
            return Err(TypesError::InvalidAmount(value.to_string()));
        }
        Ok(Self(micros as u64))
    }

    /// Lossy float view for JSON responses.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::UNIT as f64
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for UsdcAmount {
    /// Renders with at least two decimals: `5.00`, `0.10`, `1.234567`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::UNIT;
        let frac = format!("{:06}", self.0 % Self::UNIT);
        let trimmed = frac.trim_end_matches('0');
        let shown = if trimmed.len() < 2 { &frac[..2] } else { trimmed };
        write!(f, "{whole}.{shown}")
    }
}
