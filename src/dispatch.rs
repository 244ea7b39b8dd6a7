//! Runtime selection of reconstruction kernels.
//!
//! A [`ReconTable`] maps each operation to a concrete implementation. The
//! scalar table is always available; [`ReconTable::detect`] probes processor
//! capability once and swaps in vectorized kernels where supported. Under
//! `std`, [`init`] wraps detection in a guarded one-time initializer so the
//! table is built at most once per process and is immutable (and freely
//! shared across decode threads) afterwards.

use crate::{loop_filter, transform};

/// Inverse transform of one (or, with the flag set, two adjacent) 4x4
/// coefficient blocks, residual added onto the prediction in `dst` at `off`.
/// Two-block calls read `coeffs[16..32]` for the block at `off + 4`.
pub type TransformFn = fn(coeffs: &[i16], dst: &mut [u8], off: usize, do_two: bool);

/// Single-block transform fast path (DC-only, or AC confined to
/// coefficients 1 and 4).
pub type TransformBlockFn = fn(coeffs: &[i16; 16], dst: &mut [u8], off: usize);

/// Inverse Walsh-Hadamard transform of 16 luma DC terms, scattered to
/// `out[16 * k]`.
pub type TransformWhtFn = fn(coeffs: &[i16; 16], out: &mut [i16]);

/// Simple loop filter over a 16-sample edge; `off` addresses the first `q0`
/// sample and `thresh` is the edge limit.
pub type FilterFn = fn(buf: &mut [u8], off: usize, stride: usize, thresh: u8);

/// The reconstruction operation table.
///
/// Every slot is a plain function pointer, so a table value is `Copy`,
/// `Send` and `Sync`; once built it is never mutated.
#[derive(Clone, Copy)]
pub struct ReconTable {
    /// General inverse transform (§14.4 of the format), one or two blocks.
    pub transform: TransformFn,
    /// DC-only fast path; requires all AC coefficients zero.
    pub transform_dc: TransformBlockFn,
    /// Sparse fast path; requires AC only in coefficients 1 and 4.
    pub transform_ac3: TransformBlockFn,
    /// Inverse Walsh-Hadamard transform of the luma DC block (§14.3).
    pub transform_wht: TransformWhtFn,
    /// Simple filter, horizontal edge, 16 columns.
    pub simple_v_filter16: FilterFn,
    /// Simple filter, vertical edge, 16 rows.
    pub simple_h_filter16: FilterFn,
    /// Simple filter over the three interior horizontal sub-block edges.
    pub simple_v_filter16i: FilterFn,
    /// Simple filter over the three interior vertical sub-block edges.
    pub simple_h_filter16i: FilterFn,
}

impl ReconTable {
    /// The portable reference kernels. Always available; defines the
    /// bit-exact behavior every other table must match.
    pub const SCALAR: ReconTable = ReconTable {
        transform: transform::transform,
        transform_dc: transform::idct4x4_dc_add,
        transform_ac3: transform::idct4x4_ac3_add,
        transform_wht: transform::iwht4x4,
        simple_v_filter16: loop_filter::simple_v_filter16,
        simple_h_filter16: loop_filter::simple_h_filter16,
        simple_v_filter16i: loop_filter::simple_v_filter16i,
        simple_h_filter16i: loop_filter::simple_h_filter16i,
    };

    /// Probe processor capability and return the best table for it.
    ///
    /// Operations with no vectorized variant (the WHT and the AC3 sparse
    /// path) keep their scalar kernels in every table.
    pub fn detect() -> ReconTable {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        {
            use archmage::{SimdToken, X64V3Token};
            if X64V3Token::summon().is_some() {
                return ReconTable {
                    transform: simd::transform,
                    transform_dc: simd::transform_dc,
                    simple_v_filter16: simd::simple_v_filter16,
                    simple_h_filter16: simd::simple_h_filter16,
                    simple_v_filter16i: simd::simple_v_filter16i,
                    simple_h_filter16i: simd::simple_h_filter16i,
                    ..Self::SCALAR
                };
            }
        }
        Self::SCALAR
    }
}

/// Function-pointer-compatible wrappers around the SSE2 kernels.
///
/// Each wrapper re-summons the token; summoning is a cached capability read,
/// and the scalar fallback keeps every slot total even if a table value is
/// smuggled onto a machine it was not detected on.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod simd {
    use archmage::{SimdToken, X64V3Token};

    use crate::{loop_filter, loop_filter_sse2, transform, transform_sse2};

    pub(super) fn transform(coeffs: &[i16], dst: &mut [u8], off: usize, do_two: bool) {
        if let Some(token) = X64V3Token::summon() {
            transform_sse2::transform(token, coeffs, dst, off, do_two);
        } else {
            transform::transform(coeffs, dst, off, do_two);
        }
    }

    pub(super) fn transform_dc(coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
        if let Some(token) = X64V3Token::summon() {
            transform_sse2::transform_dc(token, coeffs, dst, off);
        } else {
            transform::idct4x4_dc_add(coeffs, dst, off);
        }
    }

    pub(super) fn simple_v_filter16(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
        if let Some(token) = X64V3Token::summon() {
            loop_filter_sse2::simple_v_filter16(token, buf, off, stride, thresh);
        } else {
            loop_filter::simple_v_filter16(buf, off, stride, thresh);
        }
    }

    pub(super) fn simple_h_filter16(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
        if let Some(token) = X64V3Token::summon() {
            loop_filter_sse2::simple_h_filter16(token, buf, off, stride, thresh);
        } else {
            loop_filter::simple_h_filter16(buf, off, stride, thresh);
        }
    }

    pub(super) fn simple_v_filter16i(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
        if let Some(token) = X64V3Token::summon() {
            loop_filter_sse2::simple_v_filter16i(token, buf, off, stride, thresh);
        } else {
            loop_filter::simple_v_filter16i(buf, off, stride, thresh);
        }
    }

    pub(super) fn simple_h_filter16i(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
        if let Some(token) = X64V3Token::summon() {
            loop_filter_sse2::simple_h_filter16i(token, buf, off, stride, thresh);
        } else {
            loop_filter::simple_h_filter16i(buf, off, stride, thresh);
        }
    }
}

/// Initialize (at most once) and return the process-wide kernel table.
///
/// Idempotent: every call returns the same `'static` table, and the
/// `OnceLock` guarantees the build happens-before any read through the
/// returned reference, so no locking is needed on the hot path. Safe to call
/// from any number of threads.
#[cfg(feature = "std")]
pub fn init() -> &'static ReconTable {
    static TABLE: std::sync::OnceLock<ReconTable> = std::sync::OnceLock::new();
    TABLE.get_or_init(ReconTable::detect)
}
