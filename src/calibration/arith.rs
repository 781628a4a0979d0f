//! Overflow-safe pixel arithmetic.

/// Unsigned pixel types that support subtraction clamped at zero.
pub trait ClampedSub: Copy {
    fn subtract_clamped(self, rhs: Self) -> Self;
}

macro_rules! impl_clamped_sub {
    ($($t:ty),*) => {
        $(
            impl ClampedSub for $t {
                #[inline]
                fn subtract_clamped(self, rhs: Self) -> Self {
                    // Wider signed intermediate so the difference can go negative without wrapping.
                    let diff = i64::from(self) - i64::from(rhs);
                    if diff < 0 { 0 } else { diff as $t }
                }
            }
        )*
    };
}

impl_clamped_sub!(u8, u16, u32);

/// Returns `max(a - b, 0)` without unsigned wraparound.
#[inline]
pub fn subtract_clamped<T: ClampedSub>(a: T, b: T) -> T {
    a.subtract_clamped(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtract_clamped_scenarios() {
        assert_eq!(subtract_clamped(5u16, 10u16), 0);
        assert_eq!(subtract_clamped(10u16, 5u16), 5);
        assert_eq!(subtract_clamped(7u16, 7u16), 0);
    }

    #[test]
    fn test_subtract_clamped_extremes() {
        assert_eq!(subtract_clamped(0u16, u16::MAX), 0);
        assert_eq!(subtract_clamped(u16::MAX, 0u16), u16::MAX);
        assert_eq!(subtract_clamped(0u32, u32::MAX), 0);
        assert_eq!(subtract_clamped(u32::MAX, 1u32), u32::MAX - 1);
        assert_eq!(subtract_clamped(3u8, 200u8), 0);
    }

    #[test]
    fn test_subtract_clamped_matches_difference_when_ordered() {
        for a in (0u16..=4000).step_by(97) {
            for b in (0u16..=4000).step_by(89) {
                let got = subtract_clamped(a, b);
                if a >= b {
                    assert_eq!(got, a - b);
                } else {
                    assert_eq!(got, 0);
                }
            }
        }
    }
}
