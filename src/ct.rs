//! Constant-time comparison.

use subtle::ConstantTimeEq;

/// Equality whose running time does not depend on where `a` and `b` first
/// differ. Lengths are treated as public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_and_unequal() {
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(&[7u8; 32], &[7u8; 32]));

        let mut other = [7u8; 32];
        other[31] ^= 1;
        assert!(!constant_time_eq(&[7u8; 32], &other));
        other = [7u8; 32];
        other[0] ^= 0x80;
        assert!(!constant_time_eq(&[7u8; 32], &other));
    }

    #[test]
    fn length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"\0"));
    }
}
