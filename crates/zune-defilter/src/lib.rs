/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A streaming png scanline de-filter
//!
//! PNG images are compressed in two stages, each row of the image is first
//! run through one of five prediction filters (`None`, `Sub`, `Up`, `Average`
//! and `Paeth`) and the result, with a one byte filter tag in front of every row,
//! is then deflated.
//!
//! This crate undoes the first stage. It consumes an already inflated stream of
//! `(filter tag, row)` records and hands back reconstructed rows, one at a time,
//! keeping only the previous row around.
//!
//! # Features
//! - Portable prefix-sum `Sub` de-filtering which works on every platform.
//! - Platform specific intrinsics for `Sub`, `Average` and `Paeth` on x86.
//! - Streaming decoding from slices or (with `std`) anything implementing [`Read`](std::io::Read)
//! - Adam7 pass layout support (rows are returned per pass, de-interlacing is left to the caller)
//! - `no_std` with `alloc`
//!
//! # Usage
//! Add the library to `Cargo.toml`
//!
//! ```toml
//! zune_defilter="0.1"
//! ```
//!
//! #### Decode a whole image
//!
//! ```
//! use zune_defilter::{ImageGeometry, ScanlineDecoder};
//!
//! // two rows of a 2x1 grayscale image, first row `None`, second `Up`
//! let stream: &[u8] = &[0, 10, 20, 2, 1, 1];
//! let geometry = ImageGeometry::new(2, 2, 8, 1).unwrap();
//!
//! let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();
//! let pixels = decoder.decode().unwrap();
//!
//! assert_eq!(pixels, [10, 20, 11, 21]);
//! ```
//!
//! #### Decode row by row
//!
//! ```
//! use zune_defilter::{ImageGeometry, ScanlineDecoder};
//!
//! let stream: &[u8] = &[1, 1, 1, 1, 1, 2, 0, 0, 0, 0];
//! let geometry = ImageGeometry::new(4, 2, 8, 1).unwrap();
//! let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();
//!
//! while let Some(scanline) = decoder.next_row().unwrap() {
//!     assert_eq!(scanline.data, &[1, 2, 3, 4]);
//! }
//! ```
//!
//! #### Single rows
//!
//! For callers which manage rows themselves, [`reconstruct_row`] and friends
//! work on one row given the previous one.
//!
//! ```
//! use zune_defilter::reconstruct_row;
//!
//! let row = reconstruct_row(1, &[1, 1, 1, 1, 1], None, 1).unwrap();
//! assert_eq!(row, [1, 2, 3, 4, 5]);
//! ```
//!
//! # Options
//! Decoding respects [`DecoderOptions`](zune_core::options::DecoderOptions),
//! the maximum width and height, strict mode (which rejects trailing data) and whether
//! platform intrinsics may be used.
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::op_ref, clippy::identity_op)]
extern crate alloc;

pub use decoder::{Scanline, ScanlineDecoder};
pub use encoder::{FilterStrategy, ScanlineEncoder};
pub use enums::{FilterMethod, InterlaceMethod, PngColor};
pub use error::{DefilterErrors, RowPosition};
pub use filters::{
    paeth_predictor, reconstruct_row, reconstruct_row_in_place, reconstruct_row_into, Backend,
    Defilterer
};
pub use geometry::{ImageGeometry, PassGeometry};
#[cfg(feature = "std")]
pub use source::ReaderSource;
pub use source::ScanlineSource;
pub use zune_core;

mod decoder;
mod encoder;
mod enums;
pub mod error;
pub mod filters;
mod geometry;
mod source;
