//! End-to-end properties of the reconstruction operations, checked through
//! the public table surface only.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zenvp8::{init, ReconTable, BPS};

/// Independent wide-integer model of the inverse transform: straight
/// transcription of the two-pass butterfly, kept deliberately naive.
fn reference_residuals(coeffs: &[i16; 16]) -> [i64; 16] {
    const K1: i64 = 20091 + (1 << 16);
    const K2: i64 = 35468;
    let mul = |a: i64, k: i64| (a * k) >> 16;

    let mut cols = [[0i64; 4]; 4];
    for x in 0..4 {
        let i0 = i64::from(coeffs[x]);
        let i1 = i64::from(coeffs[4 + x]);
        let i2 = i64::from(coeffs[8 + x]);
        let i3 = i64::from(coeffs[12 + x]);
        let a = i0 + i2;
        let b = i0 - i2;
        let c = mul(i1, K2) - mul(i3, K1);
        let d = mul(i1, K1) + mul(i3, K2);
        cols[0][x] = a + d;
        cols[1][x] = b + c;
        cols[2][x] = b - c;
        cols[3][x] = a - d;
    }

    let mut out = [0i64; 16];
    for y in 0..4 {
        let [i0, i1, i2, i3] = cols[y];
        let a = i0 + i2;
        let b = i0 - i2;
        let c = mul(i1, K2) - mul(i3, K1);
        let d = mul(i1, K1) + mul(i3, K2);
        out[y * 4] = (a + d + 4) >> 3;
        out[y * 4 + 1] = (b + c + 4) >> 3;
        out[y * 4 + 2] = (b - c + 4) >> 3;
        out[y * 4 + 3] = (a - d + 4) >> 3;
    }
    out
}

fn apply_reference(coeffs: &[i16; 16], dst: &mut [u8], off: usize) {
    let residuals = reference_residuals(coeffs);
    for y in 0..4 {
        for x in 0..4 {
            let px = &mut dst[off + y * BPS + x];
            *px = (i64::from(*px) + residuals[y * 4 + x]).clamp(0, 255) as u8;
        }
    }
}

fn random_prediction(rng: &mut StdRng) -> Vec<u8> {
    (0..BPS * 4).map(|_| rng.gen()).collect()
}

#[test]
fn transform_is_bit_exact_with_the_wide_reference() {
    let mut rng = StdRng::seed_from_u64(0x1d5e_ed01);
    let dsp = ReconTable::SCALAR;

    for _ in 0..10_000 {
        let mut coeffs = [0i16; 16];
        for c in coeffs.iter_mut() {
            *c = rng.gen(); // full i16 range, beyond what a bitstream can code
        }

        let mut expected = random_prediction(&mut rng);
        let mut actual = expected.clone();
        apply_reference(&coeffs, &mut expected, 0);
        (dsp.transform)(&coeffs, &mut actual, 0, false);
        assert_eq!(expected, actual, "coeffs = {coeffs:?}");
    }
}

#[test]
fn dc_fast_path_is_equivalent_to_the_full_transform() {
    let mut rng = StdRng::seed_from_u64(0x1d5e_ed02);
    let dsp = ReconTable::SCALAR;

    for dc in [i16::MIN, -2048, -1, 0, 1, 88, 2047, i16::MAX] {
        let mut coeffs = [0i16; 16];
        coeffs[0] = dc;

        let mut full = random_prediction(&mut rng);
        let mut fast = full.clone();
        (dsp.transform)(&coeffs, &mut full, 0, false);
        (dsp.transform_dc)(&coeffs, &mut fast, 0);
        assert_eq!(full, fast, "dc = {dc}");
    }
}

#[test]
fn ac3_fast_path_is_equivalent_to_the_full_transform() {
    let mut rng = StdRng::seed_from_u64(0x1d5e_ed03);
    let dsp = ReconTable::SCALAR;
    let sample = [i16::MIN + 1, -32767, -2048, -5, 0, 3, 901, 2047, 32767];

    for &dc in &sample {
        for &c1 in &sample {
            for &c4 in &sample {
                let mut coeffs = [0i16; 16];
                coeffs[0] = dc;
                coeffs[1] = c1;
                coeffs[4] = c4;

                let mut full = random_prediction(&mut rng);
                let mut fast = full.clone();
                (dsp.transform)(&coeffs, &mut full, 0, false);
                (dsp.transform_ac3)(&coeffs, &mut fast, 0);
                assert_eq!(full, fast, "dc = {dc}, c1 = {c1}, c4 = {c4}");
            }
        }
    }
}

#[test]
fn wht_feeds_dc_terms_that_reconstruct_the_macroblock() {
    let dsp = ReconTable::SCALAR;

    // All-zero DC block: every scattered DC is zero, so the 16 per-block
    // DC transforms leave the prediction untouched.
    let mut blocks = [0i16; 16 * 16];
    (dsp.transform_wht)(&[0i16; 16], &mut blocks);
    let mut pixels = vec![77u8; BPS * 4];
    for k in 0..16 {
        let block: &[i16; 16] = blocks[k * 16..][..16].try_into().unwrap();
        (dsp.transform_dc)(block, &mut pixels, (k % 4) * 4);
    }
    assert!(pixels.iter().all(|&p| p == 77));

    // A lone group DC of 64 becomes (64 + 3) >> 3 = 8 in every block, which
    // the DC transform turns into a uniform +1.
    let mut group = [0i16; 16];
    group[0] = 64;
    let mut blocks = [0i16; 16 * 16];
    (dsp.transform_wht)(&group, &mut blocks);

    let mut pixels = vec![128u8; BPS * 16];
    for k in 0..16 {
        let block: &[i16; 16] = blocks[k * 16..][..16].try_into().unwrap();
        let off = (k / 4) * 4 * BPS + (k % 4) * 4;
        (dsp.transform_dc)(block, &mut pixels, off);
    }
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(pixels[y * BPS + x], 129, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn filters_leave_the_buffer_alone_when_the_mask_fails() {
    let dsp = ReconTable::SCALAR;
    const STRIDE: usize = 64;

    // Hard step of 100 across the edge: the mask cannot pass at thresh 10.
    let mut buf = vec![0u8; 8 * STRIDE];
    for (y, row) in buf.chunks_exact_mut(STRIDE).enumerate() {
        row.fill(if y < 4 { 50 } else { 150 });
    }
    let before = buf.clone();
    (dsp.simple_v_filter16)(&mut buf, 4 * STRIDE, STRIDE, 10);
    assert_eq!(buf, before);

    // Threshold zero on arbitrary content is always the identity.
    let mut rng = StdRng::seed_from_u64(0x1d5e_ed04);
    let mut buf: Vec<u8> = (0..20 * STRIDE).map(|_| rng.gen()).collect();
    let before = buf.clone();
    (dsp.simple_v_filter16)(&mut buf, 4 * STRIDE, STRIDE, 0);
    (dsp.simple_h_filter16)(&mut buf, 4, STRIDE, 0);
    (dsp.simple_v_filter16i)(&mut buf, 0, STRIDE, 0);
    (dsp.simple_h_filter16i)(&mut buf, 2, STRIDE, 0);
    assert_eq!(buf, before);
}

#[test]
fn extreme_coefficients_never_escape_pixel_range_or_panic() {
    let dsp = ReconTable::SCALAR;

    for coeffs in [[i16::MAX; 16], [i16::MIN; 16]] {
        for fill in [0u8, 128, 255] {
            let mut pixels = vec![fill; BPS * 4];
            (dsp.transform)(&coeffs, &mut pixels, 0, false);
            let mut pixels = vec![fill; BPS * 4];
            (dsp.transform_dc)(&coeffs, &mut pixels, 0);
            let mut pixels = vec![fill; BPS * 4];
            let mut sparse = [0i16; 16];
            sparse[0] = coeffs[0];
            sparse[1] = coeffs[1];
            sparse[4] = coeffs[4];
            (dsp.transform_ac3)(&sparse, &mut pixels, 0);
            // Output is u8 by construction; reaching here means no
            // wraparound panic in debug builds.
        }
    }
}

#[test]
fn flat_prediction_and_small_dc_reconstruct_exactly() {
    let dsp = ReconTable::SCALAR;

    let mut pixels = vec![128u8; BPS * 4];
    (dsp.transform)(&[0i16; 16], &mut pixels, 0, false);
    assert!(pixels.iter().all(|&p| p == 128));

    let mut coeffs = [0i16; 16];
    coeffs[0] = 8;
    (dsp.transform)(&coeffs, &mut pixels, 0, false);
    for y in 0..4 {
        assert_eq!(&pixels[y * BPS..][..4], &[129, 129, 129, 129]);
    }
}

#[test]
fn detected_table_matches_scalar_table() {
    let detected = ReconTable::detect();
    let scalar = ReconTable::SCALAR;
    let mut rng = StdRng::seed_from_u64(0x1d5e_ed05);

    // Transforms, over the coded coefficient range.
    for _ in 0..2_000 {
        let mut coeffs = [0i16; 32];
        for c in coeffs.iter_mut() {
            *c = rng.gen_range(-2048..=2047);
        }

        let mut a = random_prediction(&mut rng);
        let mut b = a.clone();
        (scalar.transform)(&coeffs, &mut a, 0, true);
        (detected.transform)(&coeffs, &mut b, 0, true);
        assert_eq!(a, b);

        let dc_block: &[i16; 16] = coeffs[..16].try_into().unwrap();
        let mut a = random_prediction(&mut rng);
        let mut b = a.clone();
        (scalar.transform_dc)(dc_block, &mut a, 0);
        (detected.transform_dc)(dc_block, &mut b, 0);
        assert_eq!(a, b);
    }

    // Filters, over arbitrary pixel content and the threshold range.
    const STRIDE: usize = 48;
    for round in 0..256u32 {
        let thresh = round as u8;
        let mut a: Vec<u8> = (0..20 * STRIDE).map(|_| rng.gen()).collect();
        let mut b = a.clone();
        (scalar.simple_v_filter16)(&mut a, 4 * STRIDE, STRIDE, thresh);
        (detected.simple_v_filter16)(&mut b, 4 * STRIDE, STRIDE, thresh);
        (scalar.simple_h_filter16)(&mut a, 8, STRIDE, thresh);
        (detected.simple_h_filter16)(&mut b, 8, STRIDE, thresh);
        (scalar.simple_v_filter16i)(&mut a, STRIDE, STRIDE, thresh);
        (detected.simple_v_filter16i)(&mut b, STRIDE, STRIDE, thresh);
        (scalar.simple_h_filter16i)(&mut a, 4, STRIDE, thresh);
        (detected.simple_h_filter16i)(&mut b, 4, STRIDE, thresh);
        assert_eq!(a, b, "thresh = {thresh}");
    }
}

#[test]
fn init_returns_one_table_per_process() {
    assert!(std::ptr::eq(init(), init()));
}
