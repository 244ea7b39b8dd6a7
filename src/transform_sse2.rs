//! SSE2 inverse transform kernels.
//!
//! Works in i16 lanes like libwebp: one 4x4 block occupies two registers
//! (rows 0-1 and rows 2-3), the column pass runs as vector butterflies
//! between row vectors, and a transpose between passes keeps the layout.
//! The `x * K >> 16` products use `_mm_mulhi_epi16` with the constants
//! shifted into i16 range: `mulhi(x, 20091) = mul1(x) - x` and
//! `mulhi(x, 35468 - 65536) = mul2(x) - x`, with the `x` terms restored
//! through the butterfly sums.
//!
//! Uses archmage for safe SIMD intrinsics with token-based CPU feature
//! verification.

use archmage::{arcane, rite, X64V3Token};
use core::arch::x86_64::*;
use safe_unaligned_simd::x86_64 as simd_mem;

use crate::transform::BPS;

/// Inverse transform of one or two adjacent 4x4 blocks, fused with the
/// add-to-prediction store. Matches `transform::transform` byte for byte for
/// coefficients in the format's quantization range.
#[arcane]
pub(crate) fn transform(
    _token: X64V3Token,
    coeffs: &[i16],
    dst: &mut [u8],
    off: usize,
    do_two: bool,
) {
    idct4x4_add(_token, coeffs[..16].try_into().unwrap(), dst, off);
    if do_two {
        idct4x4_add(_token, coeffs[16..32].try_into().unwrap(), dst, off + 4);
    }
}

/// DC-only inverse transform fused with the add-to-prediction store.
#[arcane]
pub(crate) fn transform_dc(_token: X64V3Token, coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    assert!(off + 3 * BPS + 4 <= dst.len());

    let dc = (i32::from(coeffs[0]) + 4) >> 3;
    let dc_vec = _mm_set1_epi16(dc as i16);
    let zero = _mm_setzero_si128();

    for y in 0..4 {
        let pos = off + y * BPS;
        let pred: [u8; 4] = dst[pos..pos + 4].try_into().unwrap();
        let pred = _mm_cvtsi32_si128(i32::from_ne_bytes(pred));
        let pred = _mm_unpacklo_epi8(pred, zero);
        let sum = _mm_add_epi16(pred, dc_vec);
        let packed = _mm_packus_epi16(sum, sum);
        dst[pos..pos + 4].copy_from_slice(&(_mm_cvtsi128_si32(packed) as u32).to_ne_bytes());
    }
}

#[rite]
fn idct4x4_add(_token: X64V3Token, coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    assert!(off + 3 * BPS + 4 <= dst.len());

    // K1 = 20091 + 65536, K2 = 35468; both shifted into i16 for mulhi.
    let k1k2 = _mm_set_epi16(-30068, -30068, -30068, -30068, 20091, 20091, 20091, 20091);
    let k2k1 = _mm_set_epi16(20091, 20091, 20091, 20091, -30068, -30068, -30068, -30068);
    // The +4 rounder lands on the DC row only (low half of t01).
    let round_dc = _mm_set_epi16(0, 0, 0, 0, 4, 4, 4, 4);

    let in01 = simd_mem::_mm_loadu_si128(<&[i16; 8]>::try_from(&coeffs[0..8]).unwrap());
    let in23 = simd_mem::_mm_loadu_si128(<&[i16; 8]>::try_from(&coeffs[8..16]).unwrap());

    let (t01, t23) = idct_pass(_token, in01, in23, k1k2, k2k1, None);
    let (res01, res23) = idct_pass(_token, t01, t23, k1k2, k2k1, Some(round_dc));

    add_residual_row(_token, dst, off, res01);
    add_residual_row(_token, dst, off + BPS, _mm_unpackhi_epi64(res01, res01));
    add_residual_row(_token, dst, off + 2 * BPS, res23);
    add_residual_row(_token, dst, off + 3 * BPS, _mm_unpackhi_epi64(res23, res23));
}

/// One butterfly pass over two packed row pairs, transposing on the way out.
///
/// `round` is `None` for the column pass; the row pass supplies the DC
/// rounder and finishes with the `>> 3`.
#[rite]
fn idct_pass(
    _token: X64V3Token,
    in01: __m128i,
    in23: __m128i,
    k1k2: __m128i,
    k2k1: __m128i,
    round: Option<__m128i>,
) -> (__m128i, __m128i) {
    let in1 = _mm_unpackhi_epi64(in01, in01);
    let in3 = _mm_unpackhi_epi64(in23, in23);

    let in01 = match round {
        Some(r) => _mm_add_epi16(in01, r),
        None => in01,
    };

    // a = in0 + in2, b = in0 - in2 (lane-wise, one lane per column)
    let a_d3 = _mm_add_epi16(in01, in23);
    let b_c3 = _mm_sub_epi16(in01, in23);

    // c = mul2(in1) - mul1(in3), d = mul1(in1) + mul2(in3); mulhi leaves the
    // products short one `x`, restored from the plain sums/differences.
    let c1d1 = _mm_mulhi_epi16(in1, k2k1);
    let c2d2 = _mm_mulhi_epi16(in3, k1k2);
    let c3 = _mm_unpackhi_epi64(b_c3, b_c3);
    let c4 = _mm_sub_epi16(c1d1, c2d2);
    let c = _mm_add_epi16(c3, c4);
    let d4u = _mm_add_epi16(c1d1, c2d2);
    let du = _mm_add_epi16(a_d3, d4u);
    let d = _mm_unpackhi_epi64(du, du);

    // Rows (a+d, b+c) and (b-c, a-d), then shift and transpose.
    let comb_ab = _mm_unpacklo_epi64(a_d3, b_c3);
    let comb_dc = _mm_unpacklo_epi64(d, c);

    let mut tmp01 = _mm_add_epi16(comb_ab, comb_dc);
    let mut tmp32 = _mm_sub_epi16(comb_ab, comb_dc);

    if round.is_some() {
        tmp01 = _mm_srai_epi16(tmp01, 3);
        tmp32 = _mm_srai_epi16(tmp32, 3);
    }

    let tmp23 = _mm_shuffle_epi32(tmp32, 0b01_00_11_10);

    let transpose_0 = _mm_unpacklo_epi16(tmp01, tmp23);
    let transpose_1 = _mm_unpackhi_epi16(tmp01, tmp23);

    let out01 = _mm_unpacklo_epi16(transpose_0, transpose_1);
    let out23 = _mm_unpackhi_epi16(transpose_0, transpose_1);

    (out01, out23)
}

/// Add the low 4 i16 residual lanes to 4 prediction bytes, saturating.
#[rite]
fn add_residual_row(_token: X64V3Token, dst: &mut [u8], pos: usize, residual: __m128i) {
    let zero = _mm_setzero_si128();
    let pred: [u8; 4] = dst[pos..pos + 4].try_into().unwrap();
    let pred = _mm_cvtsi32_si128(i32::from_ne_bytes(pred));
    let pred = _mm_unpacklo_epi8(pred, zero);
    let sum = _mm_add_epi16(pred, residual);
    let packed = _mm_packus_epi16(sum, sum);
    dst[pos..pos + 4].copy_from_slice(&(_mm_cvtsi128_si32(packed) as u32).to_ne_bytes());
}
