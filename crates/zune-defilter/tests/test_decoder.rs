/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::{Cursor, Read};

use zune_defilter::zune_core::options::DecoderOptions;
use zune_defilter::{
    DefilterErrors, ImageGeometry, InterlaceMethod, ReaderSource, RowPosition, ScanlineDecoder,
    ScanlineEncoder
};

#[test]
fn test_error_position() {
    // 3x3 grayscale, the third row has a bad tag
    let stream: &[u8] = &[0, 1, 2, 3, 2, 1, 1, 1, 7, 1, 1, 1];
    let geometry = ImageGeometry::new(3, 3, 8, 1).unwrap();
    let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();

    let err = decoder.decode().unwrap_err();

    assert_eq!(
        err.position(),
        Some(RowPosition {
            pass:   0,
            row:    2,
            offset: 8
        })
    );
    assert!(matches!(err.root(), DefilterErrors::InvalidFilterType(7)));
    assert_eq!(decoder.rows_decoded(), 2);
    assert!(decoder.next_row().unwrap().is_none());
}

#[test]
fn test_error_position_adam7() {
    let geometry = ImageGeometry::new(8, 8, 8, 1)
        .unwrap()
        .with_interlace(InterlaceMethod::Adam7);
    let pixels = vec![3; geometry.output_len()];
    let mut stream = ScanlineEncoder::new(geometry).encode(&pixels).unwrap();

    // first row of the fifth pass, after passes of 2+2+3+6 bytes
    assert_eq!(stream[13], 1);
    stream[13] = 9;

    let mut decoder = ScanlineDecoder::new(stream.as_slice(), geometry).unwrap();
    let err = decoder.decode().unwrap_err();

    assert_eq!(
        err.position(),
        Some(RowPosition {
            pass:   4,
            row:    0,
            offset: 13
        })
    );
}

#[test]
fn test_truncated_stream() {
    let stream: &[u8] = &[0, 1, 2, 3, 0, 1];
    let geometry = ImageGeometry::new(3, 2, 8, 1).unwrap();
    let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();

    assert!(decoder.next_row().unwrap().is_some());

    let err = decoder.next_row().unwrap_err();
    assert!(matches!(
        err.root(),
        DefilterErrors::TruncatedStream {
            expected: 4,
            found:    2
        }
    ));
    assert_eq!(err.position().map(|x| x.offset), Some(4));
    assert_eq!(decoder.bytes_consumed(), 6);
}

#[test]
fn test_empty_stream() {
    let geometry = ImageGeometry::new(3, 2, 8, 1).unwrap();
    let mut decoder = ScanlineDecoder::new(&[0_u8; 0][..], geometry).unwrap();

    let err = decoder.next_row().unwrap_err();
    assert!(matches!(
        err.root(),
        DefilterErrors::TruncatedStream {
            expected: 4,
            found:    0
        }
    ));
}

#[test]
fn test_trailing_data_strict() {
    let stream: &[u8] = &[0, 1, 2, 0, 3, 4, 0xff, 0xff];
    let geometry = ImageGeometry::new(2, 2, 8, 1).unwrap();

    let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();

    assert_eq!(decoder.next_row().unwrap().unwrap().data, &[1, 2]);
    assert_eq!(decoder.next_row().unwrap().unwrap().data, &[3, 4]);

    let err = decoder.next_row().unwrap_err();
    assert!(matches!(err, DefilterErrors::TrailingData(2)));
    assert!(decoder.next_row().unwrap().is_none());
}

#[test]
fn test_trailing_data_lenient() {
    let stream: &[u8] = &[0, 1, 2, 0, 3, 4, 0xff, 0xff];
    let geometry = ImageGeometry::new(2, 2, 8, 1).unwrap();
    let options = DecoderOptions::default().set_strict_mode(false);

    let mut decoder = ScanlineDecoder::new_with_options(stream, geometry, options).unwrap();

    assert_eq!(decoder.decode().unwrap(), [1, 2, 3, 4]);
}

#[test]
fn test_decode_into() {
    let stream: &[u8] = &[1, 5, 5, 5, 2, 1, 1, 1];
    let geometry = ImageGeometry::new(3, 2, 8, 1).unwrap();

    let mut small = [0; 5];
    let mut decoder = ScanlineDecoder::new(stream, geometry).unwrap();
    assert!(matches!(
        decoder.decode_into(&mut small),
        Err(DefilterErrors::TooSmallOutput {
            expected: 6,
            found:    5
        })
    ));
    // a rejected buffer doesn't consume anything
    assert_eq!(decoder.bytes_consumed(), 0);

    let mut out = [0; 8];
    assert_eq!(decoder.decode_into(&mut out).unwrap(), 6);
    assert_eq!(out, [5, 10, 15, 6, 11, 16, 0, 0]);
}

#[test]
fn test_dimension_limits() {
    let geometry = ImageGeometry::new(100, 10, 8, 1).unwrap();

    let options = DecoderOptions::default().set_max_width(99);
    assert!(matches!(
        ScanlineDecoder::new_with_options(&[0_u8; 0][..], geometry, options),
        Err(DefilterErrors::TooLargeDimensions("width", 99, 100))
    ));

    let options = DecoderOptions::default().set_max_height(9);
    assert!(matches!(
        ScanlineDecoder::new_with_options(&[0_u8; 0][..], geometry, options),
        Err(DefilterErrors::TooLargeDimensions("height", 9, 10))
    ));
}

/// A reader returning at most `step` bytes per call
struct Trickle<R: Read> {
    inner: R,
    step:  usize
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let end = buf.len().min(self.step);
        self.inner.read(&mut buf[..end])
    }
}

#[test]
fn test_reader_source() {
    let geometry = ImageGeometry::new(17, 11, 8, 3).unwrap();
    let pixels: Vec<u8> = (0..geometry.output_len()).map(|x| (x % 251) as u8).collect();
    let stream = ScanlineEncoder::new(geometry).encode(&pixels).unwrap();

    let reader = Trickle {
        inner: Cursor::new(stream.clone()),
        step:  5
    };
    let mut decoder = ScanlineDecoder::new(ReaderSource::new(reader), geometry).unwrap();

    assert_eq!(decoder.decode().unwrap(), pixels);
    assert_eq!(decoder.bytes_consumed(), stream.len());
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "broken pipe"))
    }
}

#[test]
fn test_reader_errors_surface() {
    let geometry = ImageGeometry::new(4, 4, 8, 1).unwrap();
    let mut decoder = ScanlineDecoder::new(ReaderSource::new(Broken), geometry).unwrap();

    let err = decoder.next_row().unwrap_err();
    assert!(matches!(err.root(), DefilterErrors::IoErrors(_)));
    assert_eq!(err.position().map(|x| x.row), Some(0));
}
