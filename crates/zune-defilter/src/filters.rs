/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A set of optimized filter functions for de-filtering png
//! scanlines.
//!
//! Every routine here works in place, the row handed in holds the
//! filtered bytes and holds the reconstructed bytes on return. The previous
//! row is passed explicitly, `None` meaning the first row of an image or
//! interlace pass (all of whose "above" bytes are zero).
//!
//! # Backends
//! There are three families of routines
//!
//! 1. Scalar, the reference for every filter, used for whatever no other backend covers
//! 2. SWAR, a portable prefix sum for `Sub` working on 64 bit words
//! 3. SSE, a 128 bit prefix sum for `Sub`, per pixel `Average` (SSE2) and `Paeth` (SSE4.1)
//!    for 3,4,6 and 8 bytes per pixel
//!
//! All of them produce byte identical output.
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU8, Ordering};

use zune_core::options::DecoderOptions;

pub use crate::filters::de_filter::paeth_predictor;
pub use crate::filters::en_filter::{choose_filter, filter_row};
use crate::enums::FilterMethod;
use crate::error::DefilterErrors;
use crate::geometry::{ImageGeometry, PassGeometry};

mod de_filter;
mod en_filter;
mod sse4;
mod swar;

/// Result of [`Backend::best`], `UNDETECTED` until the first call
static BEST_BACKEND: AtomicU8 = AtomicU8::new(UNDETECTED);

const UNDETECTED: u8 = u8::MAX;

/// The family of routines used to de-filter rows
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    /// Reference routines, one byte at a time
    Scalar,
    /// Portable 64 bit prefix sum for `Sub`, scalar for the rest
    Swar,
    /// SSE2 `Sub` and `Average`, scalar `Paeth`
    Sse2,
    /// SSE2 `Sub` and `Average`, SSE4.1 `Paeth`
    Sse41
}

impl Backend {
    /// Pick the fastest backend the options and the cpu allow
    ///
    /// Platform intrinsics are only considered if the options allow
    /// unsafe code, otherwise the portable routines are used.
    pub fn detect(options: &DecoderOptions) -> Backend {
        if options.get_use_unsafe() {
            if options.use_sse41() && Backend::Sse41.is_supported() {
                return Backend::Sse41;
            }
            if options.use_sse2() && Backend::Sse2.is_supported() {
                return Backend::Sse2;
            }
        }
        Backend::Swar
    }

    /// Fastest backend for this machine
    ///
    /// Detection runs once, later calls return the cached result.
    pub fn best() -> Backend {
        if let Some(backend) = Backend::from_u8(BEST_BACKEND.load(Ordering::Relaxed)) {
            return backend;
        }
        let backend = Backend::detect(&DecoderOptions::new_fast());
        BEST_BACKEND.store(backend.to_u8(), Ordering::Relaxed);

        backend
    }

    const fn to_u8(self) -> u8 {
        match self {
            Backend::Scalar => 0,
            Backend::Swar => 1,
            Backend::Sse2 => 2,
            Backend::Sse41 => 3
        }
    }

    const fn from_u8(value: u8) -> Option<Backend> {
        match value {
            0 => Some(Backend::Scalar),
            1 => Some(Backend::Swar),
            2 => Some(Backend::Sse2),
            3 => Some(Backend::Sse41),
            _ => None
        }
    }

    /// Whether the backend can run on this machine
    pub fn is_supported(self) -> bool {
        match self {
            Backend::Scalar | Backend::Swar => true,
            Backend::Sse2 => sse4::has_sse2(),
            Backend::Sse41 => sse4::has_sse2() && sse4::has_sse41()
        }
    }

    /// Return `self` if it is supported, otherwise the portable backend
    #[must_use]
    pub fn resolve(self) -> Backend {
        if self.is_supported() {
            self
        } else {
            log::warn!("{self:?} de-filtering is not supported on this machine, using Swar");
            Backend::Swar
        }
    }

    #[allow(dead_code)]
    const fn has_sse2(self) -> bool {
        matches!(self, Backend::Sse2 | Backend::Sse41)
    }

    #[allow(dead_code)]
    const fn has_sse41(self) -> bool {
        matches!(self, Backend::Sse41)
    }
}

/// De-filter a row in place
///
/// `backend` must be resolved, see [`Backend::resolve`].
/// `prev_row`, if present, must be as long as `current`.
pub(crate) fn defilter_scanline(
    filter: FilterMethod, prev_row: Option<&[u8]>, current: &mut [u8], components: usize,
    backend: Backend
) {
    match (filter, prev_row) {
        // an Up row with a zero row above is a None row
        (FilterMethod::None, _) | (FilterMethod::Up, None) => (),
        // paeth(a, 0, 0) is always a, so the first paeth row is a sub row
        (FilterMethod::Sub, _) | (FilterMethod::Paeth, None) => {
            handle_sub(current, components, backend)
        }
        (FilterMethod::Up, Some(prev_row)) => de_filter::handle_up(prev_row, current),
        (FilterMethod::Average, None) => de_filter::handle_avg_first(current, components),
        (FilterMethod::Average, Some(prev_row)) => {
            handle_avg(prev_row, current, components, backend)
        }
        (FilterMethod::Paeth, Some(prev_row)) => {
            handle_paeth(prev_row, current, components, backend)
        }
    }
}

fn handle_sub(current: &mut [u8], components: usize, backend: Backend) {
    #[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        if backend.has_sse2() {
            match components {
                1 => return sse4::de_filter_sub_sse2::<1>(current),
                2 => return sse4::de_filter_sub_sse2::<2>(current),
                3 => return sse4::de_filter_sub_sse2::<3>(current),
                4 => return sse4::de_filter_sub_sse2::<4>(current),
                6 => return sse4::de_filter_sub_sse2::<6>(current),
                8 => return sse4::de_filter_sub_sse2::<8>(current),
                _ => ()
            }
        }
    }
    if backend != Backend::Scalar {
        match components {
            1 => return swar::defilter_sub_swar::<1>(current),
            2 => return swar::defilter_sub_swar::<2>(current),
            3 => return swar::defilter_sub_swar::<3>(current),
            4 => return swar::defilter_sub_swar::<4>(current),
            6 => return swar::defilter_sub_swar::<6>(current),
            8 => return swar::defilter_sub_swar::<8>(current),
            _ => ()
        }
    }
    de_filter::handle_sub(current, components);
}

#[allow(unused_variables)]
fn handle_avg(prev_row: &[u8], current: &mut [u8], components: usize, backend: Backend) {
    #[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        if backend.has_sse2() {
            match components {
                3 => return sse4::defilter_avg_sse2::<3>(prev_row, current),
                4 => return sse4::defilter_avg_sse2::<4>(prev_row, current),
                6 => return sse4::defilter_avg_sse2::<6>(prev_row, current),
                8 => return sse4::defilter_avg_sse2::<8>(prev_row, current),
                _ => ()
            }
        }
    }
    de_filter::handle_avg(prev_row, current, components);
}

#[allow(unused_variables)]
fn handle_paeth(prev_row: &[u8], current: &mut [u8], components: usize, backend: Backend) {
    #[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        if backend.has_sse41() {
            match components {
                3 => return sse4::de_filter_paeth_sse41::<3>(prev_row, current),
                4 => return sse4::de_filter_paeth_sse41::<4>(prev_row, current),
                6 => return sse4::de_filter_paeth_sse41::<6>(prev_row, current),
                8 => return sse4::de_filter_paeth_sse41::<8>(prev_row, current),
                _ => ()
            }
        }
    }
    de_filter::handle_paeth(prev_row, current, components);
}

/// Check the arguments shared by all row operations and map the tag
fn validate_row(
    filter_tag: u8, row_len: usize, previous_row: Option<&[u8]>, bpp: usize
) -> Result<FilterMethod, DefilterErrors> {
    if bpp == 0 {
        return Err(DefilterErrors::InvalidBytesPerPixel(bpp));
    }
    let filter =
        FilterMethod::from_int(filter_tag).ok_or(DefilterErrors::InvalidFilterType(filter_tag))?;

    if let Some(previous_row) = previous_row {
        if previous_row.len() != row_len {
            return Err(DefilterErrors::RowLengthMismatch {
                expected: row_len,
                found:    previous_row.len()
            });
        }
    }
    Ok(filter)
}

fn reconstruct_with_backend(
    filter_tag: u8, row: &mut [u8], previous_row: Option<&[u8]>, bpp: usize, backend: Backend
) -> Result<(), DefilterErrors> {
    let filter = validate_row(filter_tag, row.len(), previous_row, bpp)?;
    defilter_scanline(filter, previous_row, row, bpp, backend);
    Ok(())
}

/// Reconstruct a single row, returning the unfiltered bytes
///
/// # Arguments
/// - `filter_tag`: The tag byte in front of the row in the stream
/// - `filtered_row`: The row bytes as they appear in the stream
/// - `previous_row`: The previously reconstructed row, `None` for the first
///   row of an image or interlace pass
/// - `bpp`: Bytes per pixel, see [`ImageGeometry::bytes_per_pixel`]
///
/// # Errors
/// - [`InvalidFilterType`](DefilterErrors::InvalidFilterType) for tags above 4
/// - [`RowLengthMismatch`](DefilterErrors::RowLengthMismatch) if the previous row has a different length
/// - [`InvalidBytesPerPixel`](DefilterErrors::InvalidBytesPerPixel) if `bpp` is zero
pub fn reconstruct_row(
    filter_tag: u8, filtered_row: &[u8], previous_row: Option<&[u8]>, bpp: usize
) -> Result<Vec<u8>, DefilterErrors> {
    let mut out = filtered_row.to_vec();
    reconstruct_row_in_place(filter_tag, &mut out, previous_row, bpp)?;
    Ok(out)
}

/// Reconstruct a single row into `out`, which must be as long as `filtered_row`
///
/// See [`reconstruct_row`] for arguments and errors.
pub fn reconstruct_row_into(
    filter_tag: u8, filtered_row: &[u8], previous_row: Option<&[u8]>, out: &mut [u8], bpp: usize
) -> Result<(), DefilterErrors> {
    if out.len() != filtered_row.len() {
        return Err(DefilterErrors::RowLengthMismatch {
            expected: filtered_row.len(),
            found:    out.len()
        });
    }
    // validate before touching the output
    validate_row(filter_tag, filtered_row.len(), previous_row, bpp)?;

    out.copy_from_slice(filtered_row);
    reconstruct_row_in_place(filter_tag, out, previous_row, bpp)
}

/// Reconstruct a single row in place, `row` holds the filtered bytes on entry
/// and the reconstructed bytes on success.
///
/// On error the row is left untouched.
///
/// This uses [`Backend::best`]. Callers handling many rows of one image should
/// prefer a [`Defilterer`], which also checks the row stride.
///
/// See [`reconstruct_row`] for arguments and errors.
pub fn reconstruct_row_in_place(
    filter_tag: u8, row: &mut [u8], previous_row: Option<&[u8]>, bpp: usize
) -> Result<(), DefilterErrors> {
    reconstruct_with_backend(filter_tag, row, previous_row, bpp, Backend::best())
}

/// Row de-filtering bound to an image geometry
///
/// This fixes bytes per pixel, the row stride and the backend so that
/// they aren't recomputed for every row, and rejects rows whose length doesn't
/// match the geometry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Defilterer {
    bpp:        usize,
    row_stride: usize,
    backend:    Backend
}

impl Defilterer {
    /// Create a de-filterer for full width rows of `geometry`, using the best
    /// backend the machine supports
    pub fn new(geometry: &ImageGeometry) -> Defilterer {
        Defilterer::new_with_options(geometry, &DecoderOptions::default())
    }

    /// Create a de-filterer whose backend respects `options`
    pub fn new_with_options(geometry: &ImageGeometry, options: &DecoderOptions) -> Defilterer {
        let backend = Backend::detect(options);

        log::trace!("Using {backend:?} de-filtering routines");

        Defilterer {
            bpp: geometry.bytes_per_pixel(),
            row_stride: geometry.row_stride(),
            backend
        }
    }

    /// Force a backend, unsupported backends degrade to [`Backend::Swar`]
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Defilterer {
        self.backend = backend.resolve();
        self
    }

    /// The same de-filterer for rows of an interlace pass
    #[must_use]
    pub const fn for_pass(mut self, pass: &PassGeometry) -> Defilterer {
        self.row_stride = pass.row_stride;
        self
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.bpp
    }

    pub const fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub const fn backend(&self) -> Backend {
        self.backend
    }

    fn check_stride(&self, length: usize) -> Result<(), DefilterErrors> {
        if length != self.row_stride {
            return Err(DefilterErrors::RowLengthMismatch {
                expected: self.row_stride,
                found:    length
            });
        }
        Ok(())
    }

    /// Reconstruct a row, returning the unfiltered bytes
    pub fn reconstruct_row(
        &self, filter_tag: u8, filtered_row: &[u8], previous_row: Option<&[u8]>
    ) -> Result<Vec<u8>, DefilterErrors> {
        self.check_stride(filtered_row.len())?;

        let mut out = filtered_row.to_vec();
        self.reconstruct_row_in_place(filter_tag, &mut out, previous_row)?;
        Ok(out)
    }

    /// Reconstruct a row into `out`
    pub fn reconstruct_row_into(
        &self, filter_tag: u8, filtered_row: &[u8], previous_row: Option<&[u8]>, out: &mut [u8]
    ) -> Result<(), DefilterErrors> {
        self.check_stride(filtered_row.len())?;
        self.check_stride(out.len())?;
        validate_row(filter_tag, filtered_row.len(), previous_row, self.bpp)?;

        out.copy_from_slice(filtered_row);
        self.reconstruct_row_in_place(filter_tag, out, previous_row)
    }

    /// Reconstruct a row in place
    pub fn reconstruct_row_in_place(
        &self, filter_tag: u8, row: &mut [u8], previous_row: Option<&[u8]>
    ) -> Result<(), DefilterErrors> {
        self.check_stride(row.len())?;
        reconstruct_with_backend(filter_tag, row, previous_row, self.bpp, self.backend)
    }
}

/// Reconstruct a row with an explicit backend, used to compare
/// backends against each other
#[doc(hidden)]
pub fn reconstruct_row_with_backend(
    filter_tag: u8, row: &mut [u8], previous_row: Option<&[u8]>, bpp: usize, backend: Backend
) -> Result<(), DefilterErrors> {
    reconstruct_with_backend(filter_tag, row, previous_row, bpp, backend.resolve())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_backend_is_cached() {
        let first = Backend::best();

        assert_eq!(Backend::from_u8(BEST_BACKEND.load(Ordering::Relaxed)), Some(first));
        assert_eq!(Backend::best(), first);
        assert_eq!(first, Backend::detect(&DecoderOptions::new_fast()));
    }

    #[test]
    fn test_backend_numbers() {
        for backend in [Backend::Scalar, Backend::Swar, Backend::Sse2, Backend::Sse41] {
            assert_eq!(Backend::from_u8(backend.to_u8()), Some(backend));
        }
        assert_eq!(Backend::from_u8(UNDETECTED), None);
    }
}
