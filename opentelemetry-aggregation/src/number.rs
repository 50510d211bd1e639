use std::fmt;

/// The numeric types measurements can be recorded as.
///
/// Implemented for `i64`, `u64` and `f64`.
pub trait Number:
    PartialOrd
    + fmt::Debug
    + fmt::Display
    + Clone
    + Copy
    + PartialEq
    + Default
    + Send
    + Sync
    + 'static
{
    /// The smallest representable value, used to seed running maxima.
    fn min() -> Self;

    /// The largest representable value, used to seed running minima.
    fn max() -> Self;

    /// Converts the value to an `f64`.
    fn into_float(self) -> f64;

    /// Returns `self + rhs`, wrapping around at the bounds of integer types.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Returns `self - previous`.
    ///
    /// Unsigned values saturate at zero and signed values wrap, so computing
    /// the difference between two snapshots never panics.
    fn delta(self, previous: Self) -> Self;

    /// Returns `true` for NaN, which is never a valid measurement.
    fn is_nan(self) -> bool {
        false
    }

    /// Returns `true` if the value is strictly below zero.
    fn is_negative(self) -> bool;
}

impl Number for i64 {
    fn min() -> Self {
        i64::MIN
    }

    fn max() -> Self {
        i64::MAX
    }

    fn into_float(self) -> f64 {
        // May have precision loss at high values
        self as f64
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        i64::wrapping_add(self, rhs)
    }

    fn delta(self, previous: Self) -> Self {
        self.wrapping_sub(previous)
    }

    fn is_negative(self) -> bool {
        self < 0
    }
}

impl Number for u64 {
    fn min() -> Self {
        u64::MIN
    }

    fn max() -> Self {
        u64::MAX
    }

    fn into_float(self) -> f64 {
        // May have precision loss at high values
        self as f64
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        u64::wrapping_add(self, rhs)
    }

    fn delta(self, previous: Self) -> Self {
        self.saturating_sub(previous)
    }

    fn is_negative(self) -> bool {
        false
    }
}

impl Number for f64 {
    fn min() -> Self {
        f64::NEG_INFINITY
    }

    fn max() -> Self {
        f64::INFINITY
    }

    fn into_float(self) -> f64 {
        self
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn delta(self, previous: Self) -> Self {
        self - previous
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }

    fn is_negative(self) -> bool {
        self < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::Number;
    use rstest::rstest;

    #[rstest]
    #[case(10, 4, 6)]
    #[case(4, 10, 0)]
    #[case(u64::MAX, 0, u64::MAX)]
    fn unsigned_delta_saturates(#[case] current: u64, #[case] previous: u64, #[case] want: u64) {
        assert_eq!(current.delta(previous), want);
    }

    #[test]
    fn signed_delta_can_be_negative() {
        assert_eq!(4_i64.delta(10), -6);
        assert_eq!(i64::MIN.delta(1), i64::MAX);
    }

    #[test]
    fn integer_addition_wraps() {
        assert_eq!(Number::wrapping_add(i64::MAX, 1), i64::MIN);
        assert_eq!(Number::wrapping_add(u64::MAX, 2), 1);
        assert_eq!(Number::wrapping_add(1.5_f64, 2.0), 3.5);
    }

    #[test]
    fn float_helpers() {
        assert!(Number::is_nan(f64::NAN));
        assert!(!Number::is_nan(1.5_f64));
        assert!(Number::is_negative(-0.5_f64));
        assert_eq!(<f64 as Number>::min(), f64::NEG_INFINITY);
        assert_eq!(2.5_f64.delta(1.0), 1.5);
    }
}
