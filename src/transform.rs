//! Scalar inverse transforms for residual reconstruction.
//!
//! These are the portable reference kernels; the vectorized variants behind
//! the dispatch table must reproduce their output byte for byte.

/// 16 bit fixed point version of cos(PI/8) * sqrt(2) - 1
const CONST1: i64 = 20091;
/// 16 bit fixed point version of sin(PI/8) * sqrt(2)
const CONST2: i64 = 35468;

/// Bytes per scanline of the reconstruction working buffer.
///
/// Transforms address their destination as `off + x + y * BPS`. The value is
/// fixed: macroblocks are reconstructed in a 32-byte-stride working buffer
/// and copied out by the caller.
pub const BPS: usize = 32;

/// `x * (20091 + 65536) >> 16`, with the `+x` term folded out of the shift.
#[inline(always)]
fn mul1(a: i64) -> i64 {
    a + ((a * CONST1) >> 16)
}

/// `x * 35468 >> 16`
#[inline(always)]
fn mul2(a: i64) -> i64 {
    (a * CONST2) >> 16
}

// Clippy suggests the clamp method, but it seems to optimize worse as of
// rustc 1.82.0 nightly.
#[allow(clippy::manual_clamp)]
#[inline(always)]
fn add_clamped(px: &mut u8, residual: i64) {
    *px = (i64::from(*px) + residual).max(0).min(255) as u8;
}

/// Inverse transform of one or two adjacent 4x4 blocks, residual added onto
/// the prediction already resident in `dst`.
///
/// With `do_two`, `coeffs[16..32]` is transformed into the block at
/// `off + 4` — pure batching of two independent blocks.
pub(crate) fn transform(coeffs: &[i16], dst: &mut [u8], off: usize, do_two: bool) {
    idct4x4_add(coeffs[..16].try_into().unwrap(), dst, off);
    if do_two {
        idct4x4_add(coeffs[16..32].try_into().unwrap(), dst, off + 4);
    }
}

/// Inverse 4x4 transform of a single coefficient block.
///
/// Separable two-pass butterfly, columns then rows. The second pass folds a
/// `+4` rounding bias into the DC term; every output is `>> 3`, added to the
/// prediction sample and saturated to `[0, 255]`.
pub(crate) fn idct4x4_add(coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    // The intermediate results may overflow 32 bits, so we stretch the type.
    fn fetch(coeffs: &[i16; 16], idx: usize) -> i64 {
        i64::from(coeffs[idx])
    }

    // One bounds check up front covers every row slice below.
    assert!(off + 3 * BPS + 4 <= dst.len());

    let mut tmp = [0i64; 16];

    for i in 0usize..4 {
        let a = fetch(coeffs, i) + fetch(coeffs, 8 + i);
        let b = fetch(coeffs, i) - fetch(coeffs, 8 + i);
        let c = mul2(fetch(coeffs, 4 + i)) - mul1(fetch(coeffs, 12 + i));
        let d = mul1(fetch(coeffs, 4 + i)) + mul2(fetch(coeffs, 12 + i));

        tmp[i] = a + d;
        tmp[4 + i] = b + c;
        tmp[8 + i] = b - c;
        tmp[12 + i] = a - d;
    }

    for (y, row) in tmp.chunks_exact(4).enumerate() {
        let dc = row[0] + 4;
        let a = dc + row[2];
        let b = dc - row[2];
        let c = mul2(row[1]) - mul1(row[3]);
        let d = mul1(row[1]) + mul2(row[3]);

        let line = &mut dst[off + y * BPS..][..4];
        add_clamped(&mut line[0], (a + d) >> 3);
        add_clamped(&mut line[1], (b + c) >> 3);
        add_clamped(&mut line[2], (b - c) >> 3);
        add_clamped(&mut line[3], (a - d) >> 3);
    }
}

/// DC-only inverse transform: adds `(coeffs[0] + 4) >> 3` to all 16 pixels.
///
/// Used when a block has no AC coefficients; identical to [`idct4x4_add`]
/// with all AC terms zero.
pub(crate) fn idct4x4_dc_add(coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    let dc = (i64::from(coeffs[0]) + 4) >> 3;
    for y in 0usize..4 {
        for px in &mut dst[off + y * BPS..][..4] {
            add_clamped(px, dc);
        }
    }
}

/// Sparse inverse transform for blocks whose only nonzero coefficients are
/// the DC and positions 1 and 4.
///
/// The caller guarantees coefficients 2, 3 and 5..=15 are zero; under that
/// precondition the output is identical to [`idct4x4_add`]. The `+4` bias is
/// folded into the DC term, so the final shift needs no rounder.
pub(crate) fn idct4x4_ac3_add(coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    debug_assert!(
        coeffs[2..4].iter().chain(&coeffs[5..]).all(|&c| c == 0),
        "ac3 fast path requires AC only in coefficients 1 and 4"
    );

    let a = i64::from(coeffs[0]) + 4;
    let c1 = mul2(i64::from(coeffs[1]));
    let d1 = mul1(i64::from(coeffs[1]));
    let c4 = mul2(i64::from(coeffs[4]));
    let d4 = mul1(i64::from(coeffs[4]));

    for (y, dc) in [a + d4, a + c4, a - c4, a - d4].into_iter().enumerate() {
        let line = &mut dst[off + y * BPS..][..4];
        add_clamped(&mut line[0], (dc + d1) >> 3);
        add_clamped(&mut line[1], (dc + c1) >> 3);
        add_clamped(&mut line[2], (dc - c1) >> 3);
        add_clamped(&mut line[3], (dc - d1) >> 3);
    }
}

/// Inverse Walsh-Hadamard transform of a macroblock's 16 luma DC terms.
///
/// Pure add/subtract butterfly over rows then columns, `(x + 3) >> 3` on the
/// way out (the `+3` rounder is format-mandated and intentionally differs
/// from the inverse transform's `+4`). Each result is scattered to
/// `out[16 * k]`: slot 0 of the k-th luma coefficient block, which the
/// per-block transforms then consume as their DC.
pub(crate) fn iwht4x4(coeffs: &[i16; 16], out: &mut [i16]) {
    assert!(out.len() > 16 * 15);

    let mut tmp = [0i32; 16];

    for i in 0usize..4 {
        let a1 = i32::from(coeffs[i]) + i32::from(coeffs[12 + i]);
        let b1 = i32::from(coeffs[4 + i]) + i32::from(coeffs[8 + i]);
        let c1 = i32::from(coeffs[4 + i]) - i32::from(coeffs[8 + i]);
        let d1 = i32::from(coeffs[i]) - i32::from(coeffs[12 + i]);

        tmp[i] = a1 + b1;
        tmp[4 + i] = c1 + d1;
        tmp[8 + i] = a1 - b1;
        tmp[12 + i] = d1 - c1;
    }

    for (y, row) in tmp.chunks_exact(4).enumerate() {
        let a1 = row[0] + row[3];
        let b1 = row[1] + row[2];
        let c1 = row[1] - row[2];
        let d1 = row[0] - row[3];

        out[(y * 4) * 16] = clamp_coeff((a1 + b1 + 3) >> 3);
        out[(y * 4 + 1) * 16] = clamp_coeff((c1 + d1 + 3) >> 3);
        out[(y * 4 + 2) * 16] = clamp_coeff((a1 - b1 + 3) >> 3);
        out[(y * 4 + 3) * 16] = clamp_coeff((d1 - c1 + 3) >> 3);
    }
}

// Coded DC terms never leave i16 range, but saturating keeps adversarial
// inputs from wrapping.
#[inline(always)]
fn clamp_coeff(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
