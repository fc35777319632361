//! Scaled numeric VARIANT payloads converted to `f64`.

/// `VT_CY`: a signed 64-bit integer scaled by 10,000.
pub fn currency_to_f64(int64: i64) -> f64 {
    int64 as f64 / 10_000.0
}

/// `VT_DECIMAL`: a 96-bit magnitude split into `hi32`/`lo64`, divided by
/// `10^scale`, negative when bit 7 of `sign` is set.
pub fn decimal_to_f64(hi32: u32, lo64: u64, scale: u8, sign: u8) -> f64 {
    let magnitude = ((hi32 as u128) << 64) | lo64 as u128;
    let value = magnitude as f64 / 10f64.powi(scale as i32);
    if sign & 0x80 != 0 {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency() {
        assert_eq!(currency_to_f64(12_345_000), 1234.5);
        assert_eq!(currency_to_f64(-5), -0.0005);
        assert_eq!(currency_to_f64(0), 0.0);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(decimal_to_f64(0, 12345, 2, 0), 123.45);
        assert_eq!(decimal_to_f64(0, 7, 0, 0x80), -7.0);
        assert_eq!(decimal_to_f64(1, 0, 0, 0), 18_446_744_073_709_551_616.0);
    }
}
