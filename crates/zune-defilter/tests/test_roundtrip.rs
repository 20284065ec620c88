/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use nanorand::{Rng, WyRand};
use zune_defilter::{
    Backend, FilterMethod, FilterStrategy, ImageGeometry, InterlaceMethod, PngColor,
    ScanlineDecoder, ScanlineEncoder
};

fn random_pixels(len: usize, seed: u64) -> Vec<u8> {
    let mut pixels = vec![0; len];
    WyRand::new_seed(seed).fill(&mut pixels);
    pixels
}

/// A smooth gradient, which makes every filter produce distinct output
fn gradient(len: usize) -> Vec<u8> {
    (0..len).map(|x| ((x * 7) / 3) as u8).collect()
}

fn roundtrip(geometry: ImageGeometry, strategy: FilterStrategy, pixels: &[u8]) {
    let stream = ScanlineEncoder::new(geometry)
        .with_strategy(strategy)
        .encode(pixels)
        .unwrap();
    assert_eq!(stream.len(), geometry.filtered_len());

    for backend in [Backend::Scalar, Backend::Swar, Backend::Sse2, Backend::Sse41] {
        let mut decoder = ScanlineDecoder::new(stream.as_slice(), geometry).unwrap();
        decoder.set_backend(backend);

        let decoded = decoder.decode().unwrap();
        assert_eq!(decoded, pixels, "{geometry:?} {strategy:?} {backend:?}");
        assert_eq!(decoder.bytes_consumed(), stream.len());
    }
}

#[test]
fn test_every_filter() {
    for channels in 1..=4 {
        for depth in [8, 16] {
            let geometry = ImageGeometry::new(37, 9, depth, channels).unwrap();
            let pixels = gradient(geometry.output_len());

            for filter in FilterMethod::ALL {
                roundtrip(geometry, FilterStrategy::Fixed(filter), &pixels);
            }
        }
    }
}

#[test]
fn test_adaptive() {
    let geometry = ImageGeometry::from_color(64, 16, 8, PngColor::RGBA).unwrap();
    roundtrip(
        geometry,
        FilterStrategy::Adaptive,
        &random_pixels(geometry.output_len(), 1)
    );
    roundtrip(
        geometry,
        FilterStrategy::Adaptive,
        &gradient(geometry.output_len())
    );
}

#[test]
fn test_adaptive_uses_several_filters() {
    let geometry = ImageGeometry::new(32, 8, 8, 3).unwrap();

    // flat rows, then a gradient, then noise
    let mut pixels = vec![128; 32 * 3 * 3];
    pixels.extend((0..32 * 3 * 2).map(|x| x as u8));
    pixels.extend(random_pixels(32 * 3 * 3, 7));

    let stream = ScanlineEncoder::new(geometry).encode(&pixels).unwrap();
    let tags: Vec<u8> = stream.chunks_exact(32 * 3 + 1).map(|x| x[0]).collect();

    assert!(tags.iter().all(|x| *x <= 4));
    assert!(tags.iter().any(|x| *x != tags[0]));

    let decoded = ScanlineDecoder::new(stream.as_slice(), geometry)
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(decoded, pixels);
}

#[test]
fn test_sub_byte_depths() {
    for depth in [1, 2, 4] {
        // odd widths leave unused bits at the end of every row
        let geometry = ImageGeometry::from_color(13, 5, depth, PngColor::Luma).unwrap();
        assert_eq!(geometry.bytes_per_pixel(), 1);

        let pixels = random_pixels(geometry.output_len(), u64::from(depth));

        for filter in FilterMethod::ALL {
            roundtrip(geometry, FilterStrategy::Fixed(filter), &pixels);
        }
    }
}

#[test]
fn test_sixteen_bit() {
    let geometry = ImageGeometry::from_color(21, 7, 16, PngColor::RGB).unwrap();
    assert_eq!(geometry.bytes_per_pixel(), 6);

    let pixels = random_pixels(geometry.output_len(), 16);
    roundtrip(geometry, FilterStrategy::Fixed(FilterMethod::Paeth), &pixels);
    roundtrip(geometry, FilterStrategy::Fixed(FilterMethod::Average), &pixels);
    roundtrip(geometry, FilterStrategy::Adaptive, &pixels);
}

#[test]
fn test_adam7() {
    for (width, height) in [(1, 1), (3, 2), (8, 8), (33, 17)] {
        let geometry = ImageGeometry::new(width, height, 8, 4)
            .unwrap()
            .with_interlace(InterlaceMethod::Adam7);
        let pixels = random_pixels(geometry.output_len(), (width * height) as u64);

        for filter in FilterMethod::ALL {
            roundtrip(geometry, FilterStrategy::Fixed(filter), &pixels);
        }
        roundtrip(geometry, FilterStrategy::Adaptive, &pixels);
    }
}

#[test]
fn test_adam7_rows_are_pass_major() {
    let geometry = ImageGeometry::new(8, 8, 8, 1)
        .unwrap()
        .with_interlace(InterlaceMethod::Adam7);
    let pixels = gradient(geometry.output_len());
    let stream = ScanlineEncoder::new(geometry).encode(&pixels).unwrap();

    let mut decoder = ScanlineDecoder::new(stream.as_slice(), geometry).unwrap();
    let mut seen = vec![];

    while let Some(scanline) = decoder.next_row().unwrap() {
        seen.push((scanline.pass, scanline.row, scanline.data.len()));
    }
    assert_eq!(
        seen,
        [
            (0, 0, 1),
            (1, 0, 1),
            (2, 0, 2),
            (3, 0, 2),
            (3, 1, 2),
            (4, 0, 4),
            (4, 1, 4),
            (5, 0, 4),
            (5, 1, 4),
            (5, 2, 4),
            (5, 3, 4),
            (6, 0, 8),
            (6, 1, 8),
            (6, 2, 8),
            (6, 3, 8)
        ]
    );
    assert_eq!(decoder.rows_decoded(), 15);
}
