//! Fixed-point helpers for weights (centigrams) and money (cents).
//!
//! Detection thresholds run on `i32` centigrams (1 cg = 0.01 g); ledger amounts
//! are stored as `i64` centigrams and cents so totals are exact integer sums.

/// Quantize grams to integer centigrams, rounding to nearest (ties away from
/// zero) and clamping to the `i32` range. Non-finite values map to 0.
#[inline]
pub fn quantize_to_cg_i32(x_g: f32) -> i32 {
    if !x_g.is_finite() {
        return 0;
    }
    let scaled = (f64::from(x_g) * 100.0).round();
    if scaled >= f64::from(i32::MAX) {
        i32::MAX
    } else if scaled <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        scaled as i32
    }
}

/// Round a decimal amount (grams or currency units) to hundredths as `i64`.
/// Non-finite values map to 0; out-of-range values saturate.
#[inline]
pub fn to_hundredths(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    // `as` saturates for out-of-range floats
    (x * 100.0).round() as i64
}

/// Inverse of [`to_hundredths`].
#[inline]
pub fn from_hundredths(v: i64) -> f64 {
    v as f64 / 100.0
}

/// Round to two decimal places, ties away from zero.
#[inline]
pub fn round2(x: f64) -> f64 {
    from_hundredths(to_hundredths(x))
}

/// Absolute difference of two i32 values as u32 without overflow.
///
/// Uses 64-bit intermediates to avoid overflow during subtraction.
/// For any `i32` inputs, `|a - b| <= u32::MAX`, so the cast is always lossless.
#[inline]
pub fn abs_diff_i32_u32(a: i32, b: i32) -> u32 {
    let mag = ((a as i64) - (b as i64)).unsigned_abs();
    debug_assert!(
        mag <= u32::MAX as u64,
        "abs_diff_i32_u32: magnitude out of u32 range: {mag}"
    );
    mag as u32
}
