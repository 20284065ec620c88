/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use crate::enums::FilterMethod;
use crate::error::DefilterErrors;
use crate::filters::{choose_filter, filter_row};
use crate::geometry::ImageGeometry;

/// How the encoder picks a filter for each row
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FilterStrategy {
    /// Use the same filter for every row
    Fixed(FilterMethod),
    /// Try every filter and keep the one with the smallest
    /// sum of absolute differences
    #[default]
    Adaptive
}

/// Produces a filtered stream, `(filter tag, row)` records in the same
/// layout [`ScanlineDecoder`](crate::ScanlineDecoder) reads
///
/// The output is not compressed.
#[derive(Copy, Clone, Debug)]
pub struct ScanlineEncoder {
    geometry: ImageGeometry,
    strategy: FilterStrategy
}

impl ScanlineEncoder {
    /// Create an encoder using the adaptive filter strategy
    pub fn new(geometry: ImageGeometry) -> ScanlineEncoder {
        ScanlineEncoder {
            geometry,
            strategy: FilterStrategy::Adaptive
        }
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: FilterStrategy) -> ScanlineEncoder {
        self.strategy = strategy;
        self
    }

    pub const fn strategy(&self) -> FilterStrategy {
        self.strategy
    }

    /// Filter `data`, returning the filtered stream
    ///
    /// `data` must hold exactly [`ImageGeometry::output_len`] bytes, laid out
    /// pass by pass for Adam7 images.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, DefilterErrors> {
        let expected = self.geometry.output_len();

        if data.len() != expected {
            return Err(DefilterErrors::InsufficientData {
                expected,
                found: data.len()
            });
        }
        let components = self.geometry.bytes_per_pixel();

        let mut out = vec![0; self.geometry.filtered_len()];
        let mut out_position = 0;
        let mut in_position = 0;

        for pass in self.geometry.passes() {
            let stride = pass.row_stride;
            let pass_data = &data[in_position..in_position + pass.output_len()];
            let pass_out = &mut out[out_position..out_position + pass.filtered_len()];

            let mut previous: Option<&[u8]> = None;

            for (current, record) in pass_data
                .chunks_exact(stride)
                .zip(pass_out.chunks_exact_mut(stride + 1))
            {
                let (tag, filtered) = record.split_at_mut(1);

                let filter = match self.strategy {
                    FilterStrategy::Fixed(filter) => {
                        filter_row(filter, current, previous, filtered, components)?;
                        filter
                    }
                    FilterStrategy::Adaptive => {
                        choose_filter(current, previous, components, filtered)
                    }
                };
                tag[0] = filter.to_int();
                previous = Some(current);
            }
            in_position += pass.output_len();
            out_position += pass.filtered_len();
        }
        Ok(out)
    }
}

#[test]
fn test_simple_write() {
    use crate::ScanlineDecoder;

    let geometry = ImageGeometry::new(40, 10, 8, 1).unwrap();
    let data = vec![100; 40 * 10];

    let stream = ScanlineEncoder::new(geometry).encode(&data).unwrap();
    assert_eq!(stream.len(), 41 * 10);

    let mut decoder = ScanlineDecoder::new(stream.as_slice(), geometry).unwrap();
    assert_eq!(decoder.decode().unwrap(), data);
}
