//! Rolling hash used for cache key suffixes.
//!
//! djb2 variant: seed 5381, `h = (h * 33) ^ unit` over UTF-16 code units,
//! wrapped to 32 bits and rendered unsigned in base 36.

const SEED: u32 = 5381;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hashes `input` and returns the base-36 digest.
pub fn hash(input: &str) -> String {
    let h = input
        .encode_utf16()
        .fold(SEED, |h, unit| h.wrapping_mul(33) ^ u32::from(unit));
    to_base36(h)
}

fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_seed() {
        // 5381 = 4*36^2 + 5*36 + 17
        assert_eq!(hash(""), "45h");
    }

    #[test]
    fn test_single_char() {
        // (5381 * 33) ^ 97 = 177573 ^ 97 = 177604
        assert_eq!(hash("a"), to_base36(177_604));
    }

    #[test]
    fn test_base36_rendering() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }

    #[test]
    fn test_deterministic_and_sensitive() {
        assert_eq!(hash("[{\"id\":1}]"), hash("[{\"id\":1}]"));
        assert_ne!(hash("[{\"id\":1}]"), hash("[{\"id\":2}]"));
    }
}
