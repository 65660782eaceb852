//! Monetary amounts in minor currency units.
//!
//! [`Cents`] is a newtype around `i64` so that prices cannot be confused
//! with quantities or square meters. All arithmetic is checked; conversion
//! to euros only happens in the display helpers at the bottom of this file.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of money in euro cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw cent value.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw cent value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition. `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked multiplication by a quantity. `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Divides by `divisor` rounding half away from zero.
    ///
    /// Returns `None` when `divisor` is zero.
    #[must_use]
    pub fn div_round(self, divisor: u32) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        let d = i64::from(divisor);
        let q = self.0 / d;
        let r = self.0 % d;
        let adjust = if r.abs() * 2 >= d { self.0.signum() } else { 0 };
        Some(Self(q + adjust))
    }

    /// Converts a decimal euro amount to cents, rounding to the nearest cent.
    ///
    /// Returns `None` for non-finite values or values out of `i64` range.
    #[must_use]
    pub fn from_euros_f64(euros: f64) -> Option<Self> {
        if !euros.is_finite() {
            return None;
        }
        let cents = (euros * 100.0).round();
        if !(-9.0e18..=9.0e18).contains(&cents) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let value = cents as i64;
        Some(Self(value))
    }

    /// Parses a decimal euro string (`"177000"`, `"1,250.50"`, `"€ 887"`)
    /// into cents without going through floating point.
    ///
    /// Accepts an optional leading `-`, currency symbols, spaces and `,`
    /// thousands separators. At most two fractional digits are allowed.
    #[must_use]
    pub fn parse_euros(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, '€' | '$' | ',' | ' ' | '\u{a0}'))
            .collect();
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        let cents = whole_value.checked_mul(100)?.checked_add(frac_value)?;
        Some(Self(if negative { -cents } else { cents }))
    }

    /// Renders the amount in major units with two decimals, e.g. `"1770.50"`.
    #[must_use]
    pub fn to_major_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_eur(*self))
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Formats an amount the way the configurator shows prices: whole euros,
/// `.` as thousands separator, trailing euro sign (`"177.000 €"`).
#[must_use]
pub fn format_eur(amount: Cents) -> String {
    let rounded = amount.div_round(100).unwrap_or(Cents::ZERO).get();
    let sign = if rounded < 0 { "-" } else { "" };
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped} €")
}

/// Annual interest rate used for the financing estimate.
pub const FINANCING_ANNUAL_RATE: f64 = 0.035;

/// Default financing term in months.
pub const FINANCING_MONTHS: u32 = 240;

/// Monthly annuity payment for `total` over `months` at
/// [`FINANCING_ANNUAL_RATE`], rounded to whole cents.
///
/// Display-only: the result never feeds back into a stored price.
#[must_use]
pub fn monthly_payment(total: Cents, months: u32) -> Cents {
    if months == 0 {
        return total;
    }
    let rate = FINANCING_ANNUAL_RATE / 12.0;
    #[allow(clippy::cast_possible_wrap)]
    let factor = (1.0 + rate).powi(months as i32);
    #[allow(clippy::cast_precision_loss)]
    let principal = total.get() as f64;
    let payment = principal * (rate * factor) / (factor - 1.0);
    #[allow(clippy::cast_possible_truncation)]
    let cents = payment.round() as i64;
    Cents::new(cents)
}
