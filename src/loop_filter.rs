//! Scalar simple deblocking filter.
//!
//! The simple filter only ever touches the two pixels straddling an edge
//! (`p0` and `q0`), and only where the adaptive mask passes. Each of the 16
//! positions along an edge is filtered independently, which is what makes
//! the vectorized variants possible.

#[inline]
fn c(val: i32) -> i32 {
    val.clamp(-128, 127)
}

// unsigned to signed
#[inline]
fn u2s(val: u8) -> i32 {
    i32::from(val) - 128
}

// signed to unsigned
#[inline]
fn s2u(val: i32) -> u8 {
    (c(val) + 128) as u8
}

/// Filter mask: `2 * |p0 - q0| + |p1 - q1| / 2 <= thresh` in unsigned
/// saturating 8-bit arithmetic.
#[inline]
fn needs_filter(p1: u8, p0: u8, q0: u8, q1: u8, thresh: u8) -> bool {
    let d0 = p0.abs_diff(q0);
    let d1 = p1.abs_diff(q1);
    d0.saturating_add(d0).saturating_add(d1 >> 1) <= thresh
}

/// Adjust `p0` and `q0` across the edge.
///
/// The delta is accumulated in stages, each addition saturated to signed
/// 8-bit range on its own; collapsing the three `q0 - p0` terms into one
/// wide multiply changes the result near the extremes.
#[inline]
fn filter2(p1: u8, p0: u8, q0: u8, q1: u8) -> (u8, u8) {
    let step = c(u2s(q0) - u2s(p0));
    let mut delta = c(u2s(p1) - u2s(q1));
    delta = c(delta + step);
    delta = c(delta + step);
    delta = c(delta + step);

    let f1 = c(delta + 3) >> 3;
    let f2 = c(delta + 4) >> 3;

    (s2u(u2s(p0) + f1), s2u(u2s(q0) - f2))
}

/// Simple filter across the horizontal edge above `off`, 16 columns wide.
///
/// `off` addresses the first `q0` sample (the row just below the edge).
pub(crate) fn simple_v_filter16(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
    assert!(off >= 2 * stride && off + stride + 16 <= buf.len());

    for x in 0..16 {
        let p = off + x;
        let p1 = buf[p - 2 * stride];
        let p0 = buf[p - stride];
        let q0 = buf[p];
        let q1 = buf[p + stride];
        if needs_filter(p1, p0, q0, q1, thresh) {
            let (new_p0, new_q0) = filter2(p1, p0, q0, q1);
            buf[p - stride] = new_p0;
            buf[p] = new_q0;
        }
    }
}

/// Simple filter across the vertical edge left of `off`, 16 rows tall.
///
/// `off` addresses the first `q0` sample (the column just right of the
/// edge).
pub(crate) fn simple_h_filter16(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
    assert!(off >= 2 && off + 15 * stride + 2 <= buf.len());

    for y in 0..16 {
        let p = off + y * stride;
        let p1 = buf[p - 2];
        let p0 = buf[p - 1];
        let q0 = buf[p];
        let q1 = buf[p + 1];
        if needs_filter(p1, p0, q0, q1, thresh) {
            let (new_p0, new_q0) = filter2(p1, p0, q0, q1);
            buf[p - 1] = new_p0;
            buf[p] = new_q0;
        }
    }
}

/// Simple filter over the three interior horizontal edges of a macroblock
/// (rows +4, +8 and +12 below `off`). The outer macroblock edge is filtered
/// separately by the caller.
pub(crate) fn simple_v_filter16i(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
    for k in 1..4 {
        simple_v_filter16(buf, off + 4 * k * stride, stride, thresh);
    }
}

/// Simple filter over the three interior vertical edges of a macroblock
/// (columns +4, +8 and +12 right of `off`).
pub(crate) fn simple_h_filter16i(buf: &mut [u8], off: usize, stride: usize, thresh: u8) {
    for k in 1..4 {
        simple_h_filter16(buf, off + 4 * k, stride, thresh);
    }
}
