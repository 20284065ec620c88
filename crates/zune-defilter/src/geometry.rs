/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image and interlace pass geometry
//!
//! Filtering always works on bytes, so everything here boils down to
//! two numbers per pass, the byte distance between a sample and the same
//! sample of the previous pixel (bytes per pixel) and the number of bytes in a row.
use alloc::vec::Vec;

use crate::enums::{InterlaceMethod, PngColor};
use crate::error::DefilterErrors;

/// Adam7 pass origins and steps, `(x start, y start, x step, y step)`
const ADAM7_PASSES: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2)
];

const SUPPORTED_DEPTHS: [u8; 5] = [1, 2, 4, 8, 16];

/// Immutable description of the image whose scanlines are being de-filtered
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImageGeometry {
    width:         usize,
    height:        usize,
    bit_depth:     u8,
    channel_count: u8,
    interlace:     InterlaceMethod
}

/// A reduced image making up one interlace pass
///
/// Non-interlaced images have exactly one pass, the full image.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PassGeometry {
    /// Zero based pass number, for Adam7 images this is in `0..7`
    pub index:      usize,
    pub width:      usize,
    pub height:     usize,
    /// Bytes in one row of this pass, excluding the filter tag
    pub row_stride: usize
}

impl PassGeometry {
    /// Bytes this pass occupies in the filtered stream
    pub const fn filtered_len(&self) -> usize {
        self.height * (self.row_stride + 1)
    }
    /// Bytes this pass occupies once reconstructed
    pub const fn output_len(&self) -> usize {
        self.height * self.row_stride
    }
}

impl ImageGeometry {
    /// Create a new geometry from raw sample information
    ///
    /// # Arguments
    /// - `width`, `height`: Image dimensions in pixels, must be non-zero
    /// - `bit_depth`: Bits per sample, one of 1,2,4,8,16
    /// - `channel_count`: Samples per pixel, 1 to 4.
    ///   Indexed images have one channel
    pub fn new(
        width: usize, height: usize, bit_depth: u8, channel_count: u8
    ) -> Result<ImageGeometry, DefilterErrors> {
        if !SUPPORTED_DEPTHS.contains(&bit_depth) {
            return Err(DefilterErrors::UnsupportedDepth(bit_depth));
        }
        if !(1..=4).contains(&channel_count) {
            return Err(DefilterErrors::UnsupportedChannels(channel_count));
        }
        if width == 0 || height == 0 {
            return Err(DefilterErrors::ZeroDimensions);
        }
        let geometry = ImageGeometry {
            width,
            height,
            bit_depth,
            channel_count,
            interlace: InterlaceMethod::Standard
        };
        // sizes are checked for both layouts, so that neither the accessors
        // below nor `with_interlace` can overflow later
        geometry.checked_filtered_len()?;

        Ok(geometry)
    }

    /// Create a geometry from a PNG colour type, validating the
    /// colour type and bit depth combination
    pub fn from_color(
        width: usize, height: usize, bit_depth: u8, color: PngColor
    ) -> Result<ImageGeometry, DefilterErrors> {
        if !SUPPORTED_DEPTHS.contains(&bit_depth) {
            return Err(DefilterErrors::UnsupportedDepth(bit_depth));
        }
        if !color.allowed_depths().contains(&bit_depth) {
            return Err(DefilterErrors::UnsupportedColorDepth(color, bit_depth));
        }
        ImageGeometry::new(width, height, bit_depth, color.num_components())
    }

    /// Set the interlace method the stream was written with
    #[must_use]
    pub const fn with_interlace(mut self, interlace: InterlaceMethod) -> ImageGeometry {
        self.interlace = interlace;
        self
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub const fn channel_count(&self) -> u8 {
        self.channel_count
    }

    pub const fn interlace(&self) -> InterlaceMethod {
        self.interlace
    }

    pub const fn bits_per_pixel(&self) -> usize {
        self.bit_depth as usize * self.channel_count as usize
    }

    /// Distance in bytes between a byte and the corresponding byte
    /// of the pixel to its left.
    ///
    /// Sub-byte images use a distance of one.
    pub const fn bytes_per_pixel(&self) -> usize {
        let bpp = (self.bits_per_pixel() + 7) / 8;
        if bpp == 0 {
            1
        } else {
            bpp
        }
    }

    /// Number of bytes in a row of the full image, excluding the filter tag
    pub fn row_stride(&self) -> usize {
        self.stride_for_width(self.width)
    }

    /// Bytes needed for a row `width` pixels wide
    pub fn stride_for_width(&self, width: usize) -> usize {
        // checked once in `new`, any smaller width can't overflow
        (width * self.bits_per_pixel() + 7) / 8
    }

    /// Passes making up the image, in stream order
    ///
    /// Empty Adam7 passes (possible for images narrower or shorter than 5 pixels)
    /// have no bytes in the stream, not even filter tags, and are skipped.
    pub fn passes(&self) -> Vec<PassGeometry> {
        match self.interlace {
            InterlaceMethod::Standard => {
                alloc::vec![PassGeometry {
                    index:      0,
                    width:      self.width,
                    height:     self.height,
                    row_stride: self.row_stride()
                }]
            }
            InterlaceMethod::Adam7 => ADAM7_PASSES
                .iter()
                .enumerate()
                .filter_map(|(index, &(x_start, y_start, x_step, y_step))| {
                    let width = reduced_dimension(self.width, x_start, x_step);
                    let height = reduced_dimension(self.height, y_start, y_step);

                    if width == 0 || height == 0 {
                        return None;
                    }
                    Some(PassGeometry {
                        index,
                        width,
                        height,
                        row_stride: self.stride_for_width(width)
                    })
                })
                .collect()
        }
    }

    /// Exact number of bytes the inflated stream holds for this image,
    /// filter tags included
    pub fn filtered_len(&self) -> usize {
        self.passes().iter().map(PassGeometry::filtered_len).sum()
    }

    /// Number of bytes of the reconstructed rows of all passes
    pub fn output_len(&self) -> usize {
        self.passes().iter().map(PassGeometry::output_len).sum()
    }

    /// Widest row stride among all passes
    pub fn max_row_stride(&self) -> usize {
        self.passes()
            .iter()
            .map(|pass| pass.row_stride)
            .max()
            .unwrap_or(0)
    }

    /// Stream bytes of a `width` x `height` pass, `None` on overflow
    fn checked_pass_len(&self, width: usize, height: usize) -> Option<usize> {
        let stride = width.checked_mul(self.bits_per_pixel())?.checked_add(7)? / 8;
        stride.checked_add(1)?.checked_mul(height)
    }

    fn checked_filtered_len(&self) -> Result<usize, DefilterErrors> {
        let standard = self
            .checked_pass_len(self.width, self.height)
            .ok_or(DefilterErrors::Overflow)?;

        // adam7 adds close to one filter tag per row on top of the standard layout
        let adam7 = ADAM7_PASSES
            .iter()
            .try_fold(0_usize, |total, &(x_start, y_start, x_step, y_step)| {
                let width = reduced_dimension(self.width, x_start, x_step);
                let height = reduced_dimension(self.height, y_start, y_step);

                total.checked_add(self.checked_pass_len(width, height)?)
            })
            .ok_or(DefilterErrors::Overflow)?;

        Ok(standard.max(adam7))
    }
}

/// Number of pixels a pass starting at `start` and moving by `step` covers
const fn reduced_dimension(full: usize, start: usize, step: usize) -> usize {
    if full <= start {
        0
    } else {
        (full - start - 1) / step + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        let rgb16 = ImageGeometry::new(3, 1, 16, 3).unwrap();
        assert_eq!(rgb16.bytes_per_pixel(), 6);
        assert_eq!(rgb16.row_stride(), 18);

        let bilevel = ImageGeometry::new(9, 1, 1, 1).unwrap();
        assert_eq!(bilevel.bytes_per_pixel(), 1);
        assert_eq!(bilevel.row_stride(), 2);

        let luma_a4 = ImageGeometry::new(3, 1, 4, 2).unwrap();
        assert_eq!(luma_a4.bits_per_pixel(), 8);
        assert_eq!(luma_a4.bytes_per_pixel(), 1);
        assert_eq!(luma_a4.row_stride(), 3);
    }

    #[test]
    fn test_bad_geometry() {
        assert!(matches!(
            ImageGeometry::new(1, 1, 3, 1),
            Err(DefilterErrors::UnsupportedDepth(3))
        ));
        assert!(matches!(
            ImageGeometry::new(1, 1, 8, 5),
            Err(DefilterErrors::UnsupportedChannels(5))
        ));
        assert!(matches!(
            ImageGeometry::new(0, 1, 8, 1),
            Err(DefilterErrors::ZeroDimensions)
        ));
        assert!(matches!(
            ImageGeometry::from_color(1, 1, 4, PngColor::RGB),
            Err(DefilterErrors::UnsupportedColorDepth(PngColor::RGB, 4))
        ));
        assert!(matches!(
            ImageGeometry::new(usize::MAX / 2, 4, 16, 4),
            Err(DefilterErrors::Overflow)
        ));
    }

    #[test]
    fn test_adam7_overflow_is_rejected() {
        // fits without interlacing, but not with the extra adam7 filter tags
        let height = usize::MAX / 9 - 8;
        assert!(matches!(
            ImageGeometry::new(8, height, 8, 1),
            Err(DefilterErrors::Overflow)
        ));
    }

    #[test]
    fn test_adam7_lengths_near_limit() {
        // the largest height accepted for a 8 pixel wide RGBA16 image
        let mut height = usize::MAX / 65;

        let geometry = loop {
            match ImageGeometry::new(8, height, 16, 4) {
                Ok(geometry) => break geometry,
                Err(_) => height -= height / 64 + 1
            }
        };
        let standard = geometry.filtered_len();
        let interlaced = geometry.with_interlace(InterlaceMethod::Adam7);

        assert!(interlaced.filtered_len() > standard);
        assert_eq!(interlaced.output_len(), geometry.output_len());
    }

    #[test]
    fn test_adam7_passes() {
        let geometry = ImageGeometry::new(8, 8, 8, 1)
            .unwrap()
            .with_interlace(InterlaceMethod::Adam7);
        let dims: Vec<(usize, usize)> = geometry
            .passes()
            .iter()
            .map(|p| (p.width, p.height))
            .collect();

        assert_eq!(
            dims,
            [(1, 1), (1, 1), (2, 1), (2, 2), (4, 2), (4, 4), (8, 4)]
        );
        // every pixel appears exactly once
        assert_eq!(geometry.output_len(), 64);
        assert_eq!(geometry.filtered_len(), 64 + 15);
    }

    #[test]
    fn test_adam7_skips_empty_passes() {
        let geometry = ImageGeometry::new(1, 1, 8, 3)
            .unwrap()
            .with_interlace(InterlaceMethod::Adam7);
        let passes = geometry.passes();

        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].index, 0);
        assert_eq!(geometry.filtered_len(), 4);
    }
}
