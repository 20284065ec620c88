/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;
use core::mem::swap;

use log::{debug, trace, warn};
use zune_core::options::DecoderOptions;

use crate::error::{DefilterErrors, RowPosition};
use crate::filters::{Backend, Defilterer};
use crate::geometry::{ImageGeometry, PassGeometry};
use crate::source::ScanlineSource;

/// A reconstructed row
///
/// The row borrows the decoder and is valid until the next call to
/// [`ScanlineDecoder::next_row`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Scanline<'a> {
    /// Interlace pass the row belongs to, `0` for non-interlaced images
    pub pass: usize,
    /// Row index inside the pass
    pub row:  usize,
    /// Reconstructed bytes, exactly one row stride of the pass
    pub data: &'a [u8]
}

/// A streaming de-filterer
///
/// The decoder pulls `(filter tag, row)` records from a [`ScanlineSource`]
/// and reconstructs them in stream order, pass by pass and top to bottom.
/// Only the previous row of the current pass is kept in memory.
///
/// # Example
/// ```
/// use zune_defilter::{ImageGeometry, ScanlineDecoder};
/// use zune_defilter::zune_core::options::DecoderOptions;
///
/// // a 3 pixel wide RGB row filtered with sub
/// let stream: &[u8] = &[1, 10, 20, 30, 1, 1, 1, 2, 2, 2];
/// let geometry = ImageGeometry::new(3, 1, 8, 3).unwrap();
///
/// let options = DecoderOptions::default().set_max_width(100);
/// let mut decoder = ScanlineDecoder::new_with_options(stream, geometry, options).unwrap();
///
/// assert_eq!(decoder.decode().unwrap(), [10, 20, 30, 11, 21, 31, 13, 23, 33]);
/// ```
pub struct ScanlineDecoder<T: ScanlineSource> {
    source:         T,
    geometry:       ImageGeometry,
    options:        DecoderOptions,
    passes:         Vec<PassGeometry>,
    defilterer:     Defilterer,
    // next row to be read, as an index into `passes` and a row in that pass
    pass_index:     usize,
    row:            usize,
    // both hold the filter tag at index 0 followed by the row, and are
    // swapped after every row so that `previous` always holds the last output
    previous:       Vec<u8>,
    current:        Vec<u8>,
    rows_decoded:   usize,
    bytes_consumed: usize,
    finished:       bool,
    failed:         bool
}

impl<T: ScanlineSource> ScanlineDecoder<T> {
    /// Create a new decoder with default options
    ///
    /// # Errors
    /// If the image dimensions are larger than the default maximums
    pub fn new(source: T, geometry: ImageGeometry) -> Result<ScanlineDecoder<T>, DefilterErrors> {
        ScanlineDecoder::new_with_options(source, geometry, DecoderOptions::default())
    }

    /// Create a new decoder that respects `options`
    ///
    /// The maximum width and height are checked here, strict mode decides
    /// whether trailing bytes are an error and the unsafe/sse flags pick the backend.
    pub fn new_with_options(
        source: T, geometry: ImageGeometry, options: DecoderOptions
    ) -> Result<ScanlineDecoder<T>, DefilterErrors> {
        if geometry.width() > options.get_max_width() {
            return Err(DefilterErrors::TooLargeDimensions(
                "width",
                options.get_max_width(),
                geometry.width()
            ));
        }
        if geometry.height() > options.get_max_height() {
            return Err(DefilterErrors::TooLargeDimensions(
                "height",
                options.get_max_height(),
                geometry.height()
            ));
        }
        trace!("Width: {}", geometry.width());
        trace!("Height: {}", geometry.height());
        trace!("Bit depth: {}", geometry.bit_depth());
        trace!("Channels: {}", geometry.channel_count());
        trace!("Interlace: {:?}", geometry.interlace());

        let passes = geometry.passes();
        let record_size = geometry.max_row_stride() + 1;

        Ok(ScanlineDecoder {
            source,
            geometry,
            options,
            passes,
            defilterer: Defilterer::new_with_options(&geometry, &options),
            pass_index: 0,
            row: 0,
            previous: vec![0; record_size],
            current: vec![0; record_size],
            rows_decoded: 0,
            bytes_consumed: 0,
            finished: false,
            failed: false
        })
    }

    /// Force the routines used for de-filtering
    ///
    /// Backends the machine can't run degrade to [`Backend::Swar`]
    pub fn set_backend(&mut self, backend: Backend) {
        self.defilterer = self.defilterer.with_backend(backend);
    }

    pub const fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub const fn backend(&self) -> Backend {
        self.defilterer.backend()
    }

    /// Number of rows successfully returned so far, over all passes
    pub const fn rows_decoded(&self) -> usize {
        self.rows_decoded
    }

    /// Number of bytes read from the source so far
    pub const fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Reconstruct the next row
    ///
    /// # Returns
    /// - `Ok(Some(row))`: The next row in stream order
    /// - `Ok(None)`: All rows have been returned, or a previous call failed
    /// - `Err(e)`: The row could not be reconstructed. Row errors carry the
    ///   position of the failing row, see [`DefilterErrors::position`]
    pub fn next_row(&mut self) -> Result<Option<Scanline<'_>>, DefilterErrors> {
        if self.failed || self.finished {
            return Ok(None);
        }
        match self.advance() {
            Ok(Some((pass, row, stride))) => Ok(Some(Scanline {
                pass,
                row,
                data: &self.previous[1..=stride]
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Decode all remaining rows into a newly allocated buffer
    ///
    /// Rows are laid out one after the other, for Adam7 images this means
    /// all rows of the first pass, then all rows of the second and so on.
    pub fn decode(&mut self) -> Result<Vec<u8>, DefilterErrors> {
        let mut out = vec![0; self.geometry.output_len()];
        let written = self.decode_into(&mut out)?;
        out.truncate(written);

        Ok(out)
    }

    /// Decode all remaining rows into `out`, returning the number of bytes written
    ///
    /// # Errors
    /// [`TooSmallOutput`](DefilterErrors::TooSmallOutput) if `out` is smaller
    /// than [`ImageGeometry::output_len`], plus any error [`next_row`](Self::next_row) returns
    pub fn decode_into(&mut self, out: &mut [u8]) -> Result<usize, DefilterErrors> {
        let expected = self.geometry.output_len();

        if out.len() < expected {
            return Err(DefilterErrors::TooSmallOutput {
                expected,
                found: out.len()
            });
        }
        let mut position = 0;

        while let Some(scanline) = self.next_row()? {
            let end = position + scanline.data.len();
            out[position..end].copy_from_slice(scanline.data);
            position = end;
        }
        Ok(position)
    }

    /// Read and reconstruct one row, returning where it sits in the image
    /// and its stride
    fn advance(&mut self) -> Result<Option<(usize, usize, usize)>, DefilterErrors> {
        let Some(pass) = self.passes.get(self.pass_index).copied() else {
            self.finish()?;
            return Ok(None);
        };
        if self.row == 0 {
            debug!(
                "Pass {}: {}x{}, {} bytes per row",
                pass.index, pass.width, pass.height, pass.row_stride
            );
        }
        let position = RowPosition {
            pass:   pass.index,
            row:    self.row,
            offset: self.bytes_consumed
        };
        self.read_row(&pass).map_err(|e| e.at(position))?;

        let row = self.row;

        self.rows_decoded += 1;
        self.row += 1;

        if self.row == pass.height {
            self.pass_index += 1;
            self.row = 0;
        }
        Ok(Some((pass.index, row, pass.row_stride)))
    }

    fn read_row(&mut self, pass: &PassGeometry) -> Result<(), DefilterErrors> {
        let stride = pass.row_stride;
        let record = &mut self.current[..=stride];

        let found = self.source.read_bytes(record)?;
        self.bytes_consumed += found;

        if found != record.len() {
            return Err(DefilterErrors::TruncatedStream {
                expected: record.len(),
                found
            });
        }
        let (filter_tag, row) = record.split_at_mut(1);
        // the first row of every pass sees a zero row above it
        let previous_row = if self.row == 0 {
            None
        } else {
            Some(&self.previous[1..=stride])
        };

        self.defilterer
            .for_pass(pass)
            .reconstruct_row_in_place(filter_tag[0], row, previous_row)?;

        swap(&mut self.previous, &mut self.current);
        Ok(())
    }

    /// Check for bytes after the last row
    fn finish(&mut self) -> Result<(), DefilterErrors> {
        self.finished = true;

        if !self.source.has_remaining()? {
            return Ok(());
        }
        let mut extra = [0; 64];
        let count = self.source.read_bytes(&mut extra)?;

        if self.options.get_strict_mode() {
            return Err(DefilterErrors::TrailingData(count));
        }
        warn!("Ignoring at least {count} bytes after the last row");
        Ok(())
    }
}
