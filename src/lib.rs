//! VP8 pixel reconstruction primitives.
//!
//! This crate implements the reconstruction stage of a VP8 decoder: it turns
//! dequantized residual coefficients plus an existing prediction into final
//! pixels, and smooths block boundaries with the simple in-loop deblocking
//! filter. Entropy decoding, dequantization, prediction and frame buffer
//! management live in the surrounding decoder; this crate only ever mutates
//! bounded sub-regions of caller-owned buffers and never allocates.
//!
//! # Operations
//!
//! All operations are exposed through [`ReconTable`], a table of plain
//! function pointers selected once per process:
//!
//! - `transform` — inverse 4x4 transform, residual added onto the prediction
//!   in place (optionally two adjacent blocks per call)
//! - `transform_dc` / `transform_ac3` — fast paths for blocks with no AC,
//!   or AC only in coefficients 1 and 4
//! - `transform_wht` — inverse Walsh-Hadamard transform over a macroblock's
//!   16 luma DC terms, scattered back into the coefficient blocks
//! - `simple_v_filter16` / `simple_h_filter16` — simple deblocking across a
//!   16-sample horizontal or vertical edge, plus `*16i` variants covering
//!   the three interior sub-block edges of a macroblock
//!
//! ```rust
//! use zenvp8::{init, BPS};
//!
//! let dsp = init();
//! let coeffs = [8i16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
//! let mut pixels = vec![128u8; BPS * 4];
//! (dsp.transform_dc)(&coeffs, &mut pixels, 0);
//! assert_eq!(pixels[0], 129); // 128 + ((8 + 4) >> 3)
//! ```
//!
//! # Features
//!
//! - `std` (default): enables [`init`], the guarded one-time table
//!   initializer. Without `std`, build a table with
//!   [`ReconTable::detect`] (or use [`ReconTable::SCALAR`]) and store it
//!   yourself.
//! - `simd` (default): enables the vectorized x86_64 kernels. The scalar
//!   kernels are always present and define correctness; every vector kernel
//!   is required to match them byte for byte.
//!
//! # Safety
//!
//! This crate uses `#![forbid(unsafe_code)]`. When the `simd` feature is
//! enabled we rely on the [`archmage`] crate for safe SIMD intrinsics: the
//! `#[arcane]` proc macro generates the unsafe blocks internally and the
//! soundness of the SIMD code rests on archmage's token model. Unaligned
//! loads and stores go through `safe_unaligned_simd`.
//!
//! [`archmage`]: https://docs.rs/archmage

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dispatch;
mod loop_filter;
mod transform;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod loop_filter_sse2;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod transform_sse2;

pub use dispatch::{FilterFn, ReconTable, TransformBlockFn, TransformFn, TransformWhtFn};
pub use transform::BPS;

#[cfg(feature = "std")]
pub use dispatch::init;
