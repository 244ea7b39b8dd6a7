//! SSE2 simple deblocking filter.
//!
//! Filters all 16 positions of an edge in one shot. The vertical-edge
//! (horizontal-filter) variant gathers 16 rows of 4 bytes into column
//! vectors with a byte transpose, applies the same lane-wise filter, and
//! scatters the columns back.
//!
//! Uses archmage for safe SIMD intrinsics with token-based CPU feature
//! verification.

use archmage::{arcane, rite, X64V3Token};
use core::arch::x86_64::*;
use safe_unaligned_simd::x86_64 as simd_mem;

/// Filter mask: 0xFF in every lane where
/// `2 * |p0 - q0| + |p1 - q1| / 2 <= thresh` (saturating).
#[rite]
fn needs_filter_16(
    _token: X64V3Token,
    p1: __m128i,
    p0: __m128i,
    q0: __m128i,
    q1: __m128i,
    thresh: u8,
) -> __m128i {
    let t = _mm_set1_epi8(thresh as i8);

    let abs_p0_q0 = _mm_or_si128(_mm_subs_epu8(p0, q0), _mm_subs_epu8(q0, p0));
    let abs_p1_q1 = _mm_or_si128(_mm_subs_epu8(p1, q1), _mm_subs_epu8(q1, p1));

    let doubled = _mm_adds_epu8(abs_p0_q0, abs_p0_q0);
    // Per-byte >> 1; the 16-bit shift leaks the neighbour's low bit into
    // bit 7, masked off here.
    let halved = _mm_and_si128(_mm_srli_epi16(abs_p1_q1, 1), _mm_set1_epi8(0x7f));
    let sum = _mm_adds_epu8(doubled, halved);

    // sum <= t  <=>  saturating(sum - t) == 0
    let exceeds = _mm_subs_epu8(sum, t);
    _mm_cmpeq_epi8(exceeds, _mm_setzero_si128())
}

/// Arithmetic per-byte `>> 3` (no such instruction; widen, shift, repack).
#[rite]
fn sra3_epi8(_token: X64V3Token, v: __m128i) -> __m128i {
    let lo = _mm_srai_epi16(_mm_unpacklo_epi8(v, v), 11);
    let hi = _mm_srai_epi16(_mm_unpackhi_epi8(v, v), 11);
    _mm_packs_epi16(lo, hi)
}

/// Apply the simple filter to 16 edge positions held in column vectors.
/// Updates `p0` and `q0` in place; positions failing the mask are untouched.
#[rite]
fn filter_edge_16(
    _token: X64V3Token,
    p1: __m128i,
    p0: &mut __m128i,
    q0: &mut __m128i,
    q1: __m128i,
    thresh: u8,
) {
    let mask = needs_filter_16(_token, p1, *p0, *q0, q1, thresh);

    // Signed space (bias off 128), then the staged saturating delta:
    // clamp(clamp(clamp(clamp(p1 - q1) + t) + t) + t) with t = clamp(q0 - p0).
    let sign = _mm_set1_epi8(-128i8);
    let p1s = _mm_xor_si128(p1, sign);
    let mut p0s = _mm_xor_si128(*p0, sign);
    let mut q0s = _mm_xor_si128(*q0, sign);
    let q1s = _mm_xor_si128(q1, sign);

    let step = _mm_subs_epi8(q0s, p0s);
    let mut delta = _mm_subs_epi8(p1s, q1s);
    delta = _mm_adds_epi8(delta, step);
    delta = _mm_adds_epi8(delta, step);
    delta = _mm_adds_epi8(delta, step);
    delta = _mm_and_si128(delta, mask);

    // f1 = clamp(delta + 3) >> 3 onto p0, f2 = clamp(delta + 4) >> 3 off q0.
    let f1 = sra3_epi8(_token, _mm_adds_epi8(delta, _mm_set1_epi8(3)));
    let f2 = sra3_epi8(_token, _mm_adds_epi8(delta, _mm_set1_epi8(4)));
    p0s = _mm_adds_epi8(p0s, f1);
    q0s = _mm_subs_epi8(q0s, f2);

    *p0 = _mm_xor_si128(p0s, sign);
    *q0 = _mm_xor_si128(q0s, sign);
}

/// Simple filter across the horizontal edge above `off`, 16 columns at once.
#[arcane]
pub(crate) fn simple_v_filter16(
    _token: X64V3Token,
    buf: &mut [u8],
    off: usize,
    stride: usize,
    thresh: u8,
) {
    assert!(off >= 2 * stride && off + stride + 16 <= buf.len());

    let p1 =
        simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&buf[off - 2 * stride..][..16]).unwrap());
    let mut p0 =
        simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&buf[off - stride..][..16]).unwrap());
    let mut q0 = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&buf[off..][..16]).unwrap());
    let q1 = simd_mem::_mm_loadu_si128(<&[u8; 16]>::try_from(&buf[off + stride..][..16]).unwrap());

    filter_edge_16(_token, p1, &mut p0, &mut q0, q1, thresh);

    simd_mem::_mm_storeu_si128(
        <&mut [u8; 16]>::try_from(&mut buf[off - stride..][..16]).unwrap(),
        p0,
    );
    simd_mem::_mm_storeu_si128(<&mut [u8; 16]>::try_from(&mut buf[off..][..16]).unwrap(), q0);
}

/// Simple filter across the vertical edge left of `off`, 16 rows at once.
#[arcane]
pub(crate) fn simple_h_filter16(
    _token: X64V3Token,
    buf: &mut [u8],
    off: usize,
    stride: usize,
    thresh: u8,
) {
    assert!(off >= 2 && off + 15 * stride + 2 <= buf.len());

    // Gather [p1 p0 q0 q1] from each of the 16 rows.
    let mut rows = [_mm_setzero_si128(); 16];
    for (i, row) in rows.iter_mut().enumerate() {
        let start = off + i * stride - 2;
        let bytes: [u8; 4] = buf[start..start + 4].try_into().unwrap();
        *row = _mm_cvtsi32_si128(i32::from_ne_bytes(bytes));
    }

    let (p1, mut p0, mut q0, q1) = transpose_16x4(_token, &rows);

    filter_edge_16(_token, p1, &mut p0, &mut q0, q1, thresh);

    let packed = transpose_4x16(_token, p1, p0, q0, q1);
    for (i, &val) in packed.iter().enumerate() {
        let start = off + i * stride - 2;
        buf[start..start + 4].copy_from_slice(&val.to_ne_bytes());
    }
}

/// Simple filter over the three interior horizontal edges of a macroblock.
#[arcane]
pub(crate) fn simple_v_filter16i(
    _token: X64V3Token,
    buf: &mut [u8],
    off: usize,
    stride: usize,
    thresh: u8,
) {
    for k in 1..4 {
        simple_v_filter16(_token, buf, off + 4 * k * stride, stride, thresh);
    }
}

/// Simple filter over the three interior vertical edges of a macroblock.
#[arcane]
pub(crate) fn simple_h_filter16i(
    _token: X64V3Token,
    buf: &mut [u8],
    off: usize,
    stride: usize,
    thresh: u8,
) {
    for k in 1..4 {
        simple_h_filter16(_token, buf, off + 4 * k, stride, thresh);
    }
}

/// Transpose 16 rows of 4 bytes into 4 column vectors of 16 bytes.
#[rite]
fn transpose_16x4(
    _token: X64V3Token,
    rows: &[__m128i; 16],
) -> (__m128i, __m128i, __m128i, __m128i) {
    let x0 = _mm_unpacklo_epi8(rows[0], rows[1]);
    let x1 = _mm_unpacklo_epi8(rows[2], rows[3]);
    let x2 = _mm_unpacklo_epi8(rows[4], rows[5]);
    let x3 = _mm_unpacklo_epi8(rows[6], rows[7]);
    let x4 = _mm_unpacklo_epi8(rows[8], rows[9]);
    let x5 = _mm_unpacklo_epi8(rows[10], rows[11]);
    let x6 = _mm_unpacklo_epi8(rows[12], rows[13]);
    let x7 = _mm_unpacklo_epi8(rows[14], rows[15]);

    // 4-row groups per column
    let y0 = _mm_unpacklo_epi16(x0, x1);
    let y1 = _mm_unpacklo_epi16(x2, x3);
    let y2 = _mm_unpacklo_epi16(x4, x5);
    let y3 = _mm_unpacklo_epi16(x6, x7);

    // 8-row halves
    let z0 = _mm_unpacklo_epi32(y0, y1); // p1, p0 rows 0-7
    let z1 = _mm_unpackhi_epi32(y0, y1); // q0, q1 rows 0-7
    let z2 = _mm_unpacklo_epi32(y2, y3); // p1, p0 rows 8-15
    let z3 = _mm_unpackhi_epi32(y2, y3); // q0, q1 rows 8-15

    (
        _mm_unpacklo_epi64(z0, z2),
        _mm_unpackhi_epi64(z0, z2),
        _mm_unpacklo_epi64(z1, z3),
        _mm_unpackhi_epi64(z1, z3),
    )
}

/// Transpose 4 column vectors back into 16 per-row dwords of
/// `[p1 p0 q0 q1]`.
#[rite]
fn transpose_4x16(
    _token: X64V3Token,
    p1: __m128i,
    p0: __m128i,
    q0: __m128i,
    q1: __m128i,
) -> [i32; 16] {
    let p_lo = _mm_unpacklo_epi8(p1, p0);
    let p_hi = _mm_unpackhi_epi8(p1, p0);
    let q_lo = _mm_unpacklo_epi8(q0, q1);
    let q_hi = _mm_unpackhi_epi8(q0, q1);

    let w0 = _mm_unpacklo_epi16(p_lo, q_lo); // rows 0-3
    let w1 = _mm_unpackhi_epi16(p_lo, q_lo); // rows 4-7
    let w2 = _mm_unpacklo_epi16(p_hi, q_hi); // rows 8-11
    let w3 = _mm_unpackhi_epi16(p_hi, q_hi); // rows 12-15

    [
        _mm_extract_epi32(w0, 0),
        _mm_extract_epi32(w0, 1),
        _mm_extract_epi32(w0, 2),
        _mm_extract_epi32(w0, 3),
        _mm_extract_epi32(w1, 0),
        _mm_extract_epi32(w1, 1),
        _mm_extract_epi32(w1, 2),
        _mm_extract_epi32(w1, 3),
        _mm_extract_epi32(w2, 0),
        _mm_extract_epi32(w2, 1),
        _mm_extract_epi32(w2, 2),
        _mm_extract_epi32(w2, 3),
        _mm_extract_epi32(w3, 0),
        _mm_extract_epi32(w3, 1),
        _mm_extract_epi32(w3, 2),
        _mm_extract_epi32(w3, 3),
    ]
}
