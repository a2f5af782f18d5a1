//! Coercion of amount-like cells (`"1,234,567"`) into numbers.

/// Thousands separator removed before parsing.
const THOUSANDS_SEPARATOR: char = ',';

/// Anything that can be coerced into an `f64` amount.
///
/// Numeric inputs pass through unchanged (non-finite floats count as
/// missing); text is stripped of thousands separators and parsed.
pub trait NumericInput {
    fn coerce_numeric(self) -> Option<f64>;
}

impl NumericInput for f64 {
    fn coerce_numeric(self) -> Option<f64> {
        self.is_finite().then_some(self)
    }
}

impl NumericInput for i64 {
    fn coerce_numeric(self) -> Option<f64> {
        Some(self as f64)
    }
}

impl NumericInput for i32 {
    fn coerce_numeric(self) -> Option<f64> {
        Some(f64::from(self))
    }
}

impl NumericInput for &str {
    fn coerce_numeric(self) -> Option<f64> {
        let stripped: String = self
            .trim()
            .chars()
            .filter(|&c| c != THOUSANDS_SEPARATOR)
            .collect();
        if stripped.is_empty() {
            return None;
        }
        // `f64::from_str` accepts "inf" and "NaN"; neither is an amount.
        stripped.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl NumericInput for &String {
    fn coerce_numeric(self) -> Option<f64> {
        self.as_str().coerce_numeric()
    }
}

// ── NumericCoercer ────────────────────────────────────────────────────────────

/// Stateless converter for amount, area and floor cells.
pub struct NumericCoercer;

impl NumericCoercer {
    /// Convert `raw` to a number, or `None` when it cannot be read as one.
    pub fn coerce<T: NumericInput>(raw: T) -> Option<f64> {
        raw.coerce_numeric()
    }

    /// Like [`coerce`](Self::coerce) but only accepts whole numbers that fit
    /// an `i32` (floor numbers such as `"12"` or `"12.0"`).
    pub fn coerce_integer<T: NumericInput>(raw: T) -> Option<i32> {
        let value = raw.coerce_numeric()?;
        if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
            return None;
        }
        Some(value as i32)
    }
}
